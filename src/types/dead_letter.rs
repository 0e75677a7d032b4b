use serde::{Deserialize, Serialize};
use specta::Type;

use crate::types::FailedWebhookEvent;

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ListDeadLetterResponse {
    pub events: Vec<FailedWebhookEvent>,
    pub next_before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct GetEventResponse {
    pub event: FailedWebhookEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, Type)]
pub struct ResubmitResponse {
    pub event: FailedWebhookEvent,
}
