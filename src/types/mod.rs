pub mod api_error;
pub mod dead_letter;
pub mod failed_webhook_event;
pub mod retry;

#[allow(unused_imports)]
pub use api_error::{ApiErrorCode, ApiErrorResponse};
#[allow(unused_imports)]
pub use dead_letter::{GetEventResponse, ListDeadLetterResponse, ResubmitResponse};
#[allow(unused_imports)]
pub use failed_webhook_event::{FailedEventStatus, FailedWebhookEvent};
#[allow(unused_imports)]
pub use retry::{BatchSummary, RunRetriesRequest};
