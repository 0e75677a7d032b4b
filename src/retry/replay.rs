use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::retry::{
    HandlerRegistry, Provider, RetryConfig, StoreError,
    backoff::next_retry_at,
    handler::run_with_timeout,
    store::{
        claim_event, complete_event, fetch_due_events, move_to_dead_letter,
        requeue_stale_processing, reschedule_event,
    },
};
use crate::types::{BatchSummary, FailedWebhookEvent};

enum RowOutcome {
    Succeeded,
    Rescheduled,
    DeadLettered,
    Skipped,
}

/// Replays up to `limit` due rows, one at a time, oldest due first.
///
/// Handler failures become state transitions and show up only in the
/// returned counts. Store errors abort the batch.
pub async fn process_pending_retries(
    pool: &SqlitePool,
    config: &RetryConfig,
    handlers: &HandlerRegistry,
    limit: i64,
) -> Result<BatchSummary, StoreError> {
    let now = Utc::now();
    let stale_ms = i64::try_from(config.stale_processing_ms).unwrap_or(i64::MAX);
    let stale_before = now - Duration::milliseconds(stale_ms);

    let recovered = requeue_stale_processing(pool, stale_before, now).await?;
    if recovered > 0 {
        tracing::warn!(recovered, "requeued rows left in processing by an earlier run");
    }

    let due = fetch_due_events(pool, now, limit.max(0)).await?;
    let mut summary = BatchSummary::default();

    for event in due {
        match replay_one(pool, config, handlers, &event).await? {
            RowOutcome::Succeeded => {
                summary.processed += 1;
                summary.succeeded += 1;
            }
            RowOutcome::Rescheduled => {
                summary.processed += 1;
                summary.failed += 1;
            }
            RowOutcome::DeadLettered => {
                summary.processed += 1;
                summary.failed += 1;
                summary.dead_lettered += 1;
            }
            RowOutcome::Skipped => summary.skipped += 1,
        }
    }

    tracing::info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        dead_lettered = summary.dead_lettered,
        skipped = summary.skipped,
        "retry batch finished"
    );

    Ok(summary)
}

async fn replay_one(
    pool: &SqlitePool,
    config: &RetryConfig,
    handlers: &HandlerRegistry,
    event: &FailedWebhookEvent,
) -> Result<RowOutcome, StoreError> {
    let handler = match event.provider.parse::<Provider>() {
        Ok(provider) => handlers.get(provider),
        Err(_) => None,
    };
    let Some(handler) = handler else {
        tracing::warn!(
            provider = %event.provider,
            row_id = %event.id,
            "no replay handler registered for provider, skipping"
        );
        return Ok(RowOutcome::Skipped);
    };

    let Some(claimed_count) = claim_event(pool, event.id, Utc::now()).await? else {
        tracing::debug!(row_id = %event.id, "row claimed elsewhere, skipping");
        return Ok(RowOutcome::Skipped);
    };

    let result = match serde_json::from_str::<Value>(&event.payload) {
        Ok(payload) => run_with_timeout(config.handler_timeout(), handler.handle(payload)).await,
        Err(err) => Err(format!("stored payload is not valid JSON: {err}")),
    };

    let transition = match result {
        Ok(()) => complete_event(pool, event.id).await.map(|()| {
            tracing::info!(
                provider = %event.provider,
                event_id = %event.event_id,
                row_id = %event.id,
                retry_count = claimed_count,
                "webhook replay succeeded"
            );
            RowOutcome::Succeeded
        }),
        Err(error) => record_failure(pool, config, event, claimed_count, &error).await,
    };

    match transition {
        Err(StoreError::Conflict(reason)) => {
            tracing::warn!(
                row_id = %event.id,
                reason = %reason,
                "lost claim before recording outcome"
            );
            Ok(RowOutcome::Skipped)
        }
        other => other,
    }
}

async fn record_failure(
    pool: &SqlitePool,
    config: &RetryConfig,
    event: &FailedWebhookEvent,
    claimed_count: i64,
    error: &str,
) -> Result<RowOutcome, StoreError> {
    let now = Utc::now();
    let policy = config.policies.for_name(&event.provider);
    // The fetched snapshot may predate another batch's failure on this row.
    let retry_count = claimed_count.saturating_add(1);

    if retry_count >= i64::from(policy.max_retries) {
        move_to_dead_letter(pool, event.id, retry_count, error, now).await?;
        tracing::error!(
            provider = %event.provider,
            event_id = %event.event_id,
            row_id = %event.id,
            retry_count,
            max_retries = policy.max_retries,
            error,
            "webhook retries exhausted, moved to dead letter"
        );
        return Ok(RowOutcome::DeadLettered);
    }

    let step = u32::try_from(retry_count).unwrap_or(u32::MAX);
    let next = next_retry_at(now, step, &policy);
    reschedule_event(pool, event.id, retry_count, next, error, now).await?;
    tracing::warn!(
        provider = %event.provider,
        event_id = %event.event_id,
        row_id = %event.id,
        retry_count,
        error,
        "webhook replay failed, rescheduled"
    );
    Ok(RowOutcome::Rescheduled)
}
