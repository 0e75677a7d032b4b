mod backoff;
mod capture;
mod config;
mod handler;
mod replay;
mod store;

pub use backoff::{format_utc, next_retry_at, retry_delay_ms};
pub use capture::{CaptureOutcome, process_webhook_with_retry};
pub use config::{Provider, RetryConfig, RetryPolicies, RetryPolicy, UnknownProvider};
pub use handler::{HandlerError, HandlerRegistry, ReplayHandler};
pub use replay::process_pending_retries;
pub use store::{
    NewFailedEvent, StoreError, claim_event, complete_event, fetch_due_events, get_event,
    move_to_dead_letter, requeue_stale_processing, reschedule_event, upsert_failed_event,
};

pub(crate) use store::{EVENT_COLUMNS, FailedEventRow, parse_status};
