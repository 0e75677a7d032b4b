use serde::{Deserialize, Serialize};
use specta::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Type, PartialEq)]
pub struct FailedWebhookEvent {
    pub id: Uuid,
    pub provider: String,
    pub event_id: String,
    pub event_type: String,
    /// Raw JSON text, exactly as captured.
    pub payload: String,

    pub retry_count: i64,
    pub last_error: Option<String>,
    /// None while the row is quarantined.
    pub next_retry_at: Option<String>,
    pub status: FailedEventStatus,

    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailedEventStatus {
    Pending,
    Processing,
    DeadLetter,
}
