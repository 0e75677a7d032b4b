use std::future::Future;

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::retry::{
    NewFailedEvent, Provider, RetryConfig, backoff::next_retry_at, handler::run_with_timeout,
    store::upsert_failed_event,
};

/// Result of a first-attempt webhook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The handler succeeded; nothing was written.
    Processed,
    /// The handler failed and the event is queued for replay.
    Queued { row_id: Uuid, error: String },
    /// The handler failed and the queue write failed too. The provider's own
    /// redelivery is the only remaining path.
    NotQueued { error: String },
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Processed)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CaptureOutcome::Processed => None,
            CaptureOutcome::Queued { error, .. } | CaptureOutcome::NotQueued { error } => {
                Some(error)
            }
        }
    }
}

/// Runs `handler` once; on failure, persists the event as pending with
/// `retry_count = 0` and the first backoff step of the provider's policy.
///
/// Handler failures are returned as an outcome, never as an error. A failed
/// store write is logged and reported as [`CaptureOutcome::NotQueued`].
pub async fn process_webhook_with_retry<F, Fut, E>(
    pool: &SqlitePool,
    config: &RetryConfig,
    provider: Provider,
    event_id: &str,
    event_type: &str,
    payload: &Value,
    handler: F,
) -> CaptureOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let error = match run_with_timeout(config.handler_timeout(), handler()).await {
        Ok(()) => return CaptureOutcome::Processed,
        Err(error) => error,
    };

    let payload = match serde_json::to_string(payload) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(
                provider = %provider,
                event_id,
                error = %err,
                "failed to serialize webhook payload for retry"
            );
            return CaptureOutcome::NotQueued { error };
        }
    };

    let now = Utc::now();
    let policy = config.policies.get(provider);
    let new = NewFailedEvent {
        provider: provider.as_str(),
        event_id,
        event_type,
        payload: &payload,
        last_error: &error,
        next_retry_at: next_retry_at(now, 0, &policy),
    };

    match upsert_failed_event(pool, &new, now).await {
        Ok(row) => {
            tracing::warn!(
                provider = %provider,
                event_id,
                event_type,
                row_id = %row.id,
                retry_count = row.retry_count,
                next_retry_at = row.next_retry_at.as_deref().unwrap_or(""),
                error = %error,
                "webhook handler failed, queued for retry"
            );
            CaptureOutcome::Queued {
                row_id: row.id,
                error,
            }
        }
        Err(err) => {
            tracing::error!(
                provider = %provider,
                event_id,
                event_type,
                handler_error = %error,
                error = %err,
                "webhook handler failed and could not be queued for retry"
            );
            CaptureOutcome::NotQueued { error }
        }
    }
}
