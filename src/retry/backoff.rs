use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::retry::RetryPolicy;

/// Delay before the next replay: `min(initial * 2^retry_count, max)`.
pub fn retry_delay_ms(retry_count: u32, policy: &RetryPolicy) -> u64 {
    let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
    policy
        .initial_delay_ms
        .saturating_mul(factor)
        .min(policy.max_delay_ms)
}

pub fn next_retry_at(now: DateTime<Utc>, retry_count: u32, policy: &RetryPolicy) -> DateTime<Utc> {
    let delay_ms = i64::try_from(retry_delay_ms(retry_count, policy)).unwrap_or(i64::MAX);
    now.checked_add_signed(Duration::milliseconds(delay_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Millisecond RFC 3339 in UTC; every timestamp column uses this so string
/// comparison in SQL follows time order.
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
