use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::retry::backoff::format_utc;
use crate::types::{FailedEventStatus, FailedWebhookEvent};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub(crate) const EVENT_COLUMNS: &str = "id, provider, event_id, event_type, payload, retry_count, \
     last_error, next_retry_at, status, created_at, updated_at";

/// A first-failure capture, keyed by `(provider, event_id)`.
#[derive(Debug, Clone)]
pub struct NewFailedEvent<'a> {
    pub provider: &'a str,
    pub event_id: &'a str,
    pub event_type: &'a str,
    pub payload: &'a str,
    pub last_error: &'a str,
    pub next_retry_at: DateTime<Utc>,
}

/// Inserts a pending row, or refreshes the existing row for the same
/// `(provider, event_id)`.
///
/// On conflict only `event_type`, `payload`, `last_error` and `updated_at`
/// change: `retry_count` never goes down here and a row that is already
/// scheduled, claimed or quarantined keeps its state.
pub async fn upsert_failed_event(
    pool: &SqlitePool,
    new: &NewFailedEvent<'_>,
    now: DateTime<Utc>,
) -> Result<FailedWebhookEvent, StoreError> {
    let now_str = format_utc(now);
    let sql = format!(
        r#"
        INSERT INTO failed_webhook_events (
            id,
            provider,
            event_id,
            event_type,
            payload,
            retry_count,
            last_error,
            next_retry_at,
            status,
            created_at,
            updated_at
        )
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, 'pending', ?, ?)
        ON CONFLICT(provider, event_id) DO UPDATE SET
            event_type = excluded.event_type,
            payload = excluded.payload,
            last_error = excluded.last_error,
            updated_at = excluded.updated_at
        RETURNING {EVENT_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, FailedEventRow>(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(new.provider)
        .bind(new.event_id)
        .bind(new.event_type)
        .bind(new.payload)
        .bind(new.last_error)
        .bind(format_utc(new.next_retry_at))
        .bind(&now_str)
        .bind(&now_str)
        .fetch_one(pool)
        .await?;

    row.try_into()
}

/// Pending rows due at `now`, oldest due time first.
pub async fn fetch_due_events(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<FailedWebhookEvent>, StoreError> {
    let sql = format!(
        r#"
        SELECT {EVENT_COLUMNS}
        FROM failed_webhook_events
        WHERE status = 'pending'
          AND next_retry_at IS NOT NULL
          AND next_retry_at <= ?
        ORDER BY next_retry_at ASC, created_at ASC
        LIMIT ?
        "#
    );

    let rows: Vec<FailedEventRow> = sqlx::query_as(&sql)
        .bind(format_utc(now))
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(FailedEventRow::try_into).collect()
}

/// Moves one due row to `processing` and returns its current `retry_count`.
/// Returns `None` when another invocation got there first or the row is no
/// longer due.
pub async fn claim_event(
    pool: &SqlitePool,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<i64>, StoreError> {
    let now_str = format_utc(now);
    let retry_count: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE failed_webhook_events
        SET status = 'processing',
            updated_at = ?
        WHERE id = ?
          AND status = 'pending'
          AND next_retry_at IS NOT NULL
          AND next_retry_at <= ?
        RETURNING retry_count
        "#,
    )
    .bind(&now_str)
    .bind(id.to_string())
    .bind(&now_str)
    .fetch_optional(pool)
    .await?;

    Ok(retry_count)
}

/// Deletes a claimed row after a successful replay.
pub async fn complete_event(pool: &SqlitePool, id: Uuid) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        DELETE FROM failed_webhook_events
        WHERE id = ?
          AND status = 'processing'
        "#,
    )
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict("claim_lost".to_string()));
    }
    Ok(())
}

pub async fn reschedule_event(
    pool: &SqlitePool,
    id: Uuid,
    retry_count: i64,
    next_retry_at: DateTime<Utc>,
    last_error: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE failed_webhook_events
        SET status = 'pending',
            retry_count = ?,
            next_retry_at = ?,
            last_error = ?,
            updated_at = ?
        WHERE id = ?
          AND status = 'processing'
        "#,
    )
    .bind(retry_count)
    .bind(format_utc(next_retry_at))
    .bind(last_error)
    .bind(format_utc(now))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict("claim_lost".to_string()));
    }
    Ok(())
}

pub async fn move_to_dead_letter(
    pool: &SqlitePool,
    id: Uuid,
    retry_count: i64,
    last_error: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE failed_webhook_events
        SET status = 'dead_letter',
            retry_count = ?,
            next_retry_at = NULL,
            last_error = ?,
            updated_at = ?
        WHERE id = ?
          AND status = 'processing'
        "#,
    )
    .bind(retry_count)
    .bind(last_error)
    .bind(format_utc(now))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict("claim_lost".to_string()));
    }
    Ok(())
}

/// Returns rows left in `processing` since before `stale_before` to the
/// pending cycle, due immediately. A replay that crashed mid-flight leaves
/// such rows behind.
pub async fn requeue_stale_processing(
    pool: &SqlitePool,
    stale_before: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let now_str = format_utc(now);
    let result = sqlx::query(
        r#"
        UPDATE failed_webhook_events
        SET status = 'pending',
            next_retry_at = ?,
            updated_at = ?
        WHERE status = 'processing'
          AND updated_at <= ?
        "#,
    )
    .bind(&now_str)
    .bind(&now_str)
    .bind(format_utc(stale_before))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn get_event(pool: &SqlitePool, id: Uuid) -> Result<FailedWebhookEvent, StoreError> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM failed_webhook_events WHERE id = ?");
    sqlx::query_as::<_, FailedEventRow>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("event not found".to_string()))?
        .try_into()
}

#[derive(sqlx::FromRow)]
pub(crate) struct FailedEventRow {
    id: String,
    provider: String,
    event_id: String,
    event_type: String,
    payload: String,
    retry_count: i64,
    last_error: Option<String>,
    next_retry_at: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FailedEventRow> for FailedWebhookEvent {
    type Error = StoreError;

    fn try_from(row: FailedEventRow) -> Result<Self, Self::Error> {
        Ok(FailedWebhookEvent {
            id: Uuid::parse_str(&row.id)
                .map_err(|err| StoreError::Parse(format!("invalid row id: {err}")))?,
            provider: row.provider,
            event_id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            retry_count: row.retry_count,
            last_error: row.last_error,
            next_retry_at: row.next_retry_at,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn parse_status(status: &str) -> Result<FailedEventStatus, StoreError> {
    match status {
        "pending" => Ok(FailedEventStatus::Pending),
        "processing" => Ok(FailedEventStatus::Processing),
        "dead_letter" => Ok(FailedEventStatus::DeadLetter),
        other => Err(StoreError::Parse(format!("unknown status: {other}"))),
    }
}
