use serde::{Deserialize, Serialize};
use specta::Type;

#[derive(Debug, Clone, Serialize, Deserialize, Type, Default)]
pub struct RunRetriesRequest {
    pub limit: Option<i64>,
}

/// Counts for one batch replay invocation.
///
/// `processed` is `succeeded + failed`; `dead_lettered` is the part of
/// `failed` that was quarantined during this run. Skipped rows were never
/// claimed and are not counted as processed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub dead_lettered: u32,
    pub skipped: u32,
}
