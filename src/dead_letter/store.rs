use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::retry::{
    EVENT_COLUMNS, FailedEventRow, RetryPolicies, StoreError, format_utc, next_retry_at,
    parse_status,
};
use crate::types::{FailedEventStatus, FailedWebhookEvent};

#[derive(Debug, Clone)]
pub struct DeadLetterCursor {
    pub updated_at: String,
    pub id: Uuid,
}

#[derive(Debug, Clone)]
pub struct ListDeadLetterParams {
    pub limit: i64,
    pub before: Option<DeadLetterCursor>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListDeadLetterResult {
    pub events: Vec<FailedWebhookEvent>,
    pub next_before: Option<DeadLetterCursor>,
}

/// Quarantined rows, most recently quarantined first.
pub async fn get_dead_letter_events(
    pool: &SqlitePool,
    provider: Option<&str>,
    limit: i64,
) -> Result<Vec<FailedWebhookEvent>, StoreError> {
    let params = ListDeadLetterParams {
        limit,
        before: None,
        provider: provider.map(str::to_string),
    };
    Ok(list_dead_letter_events(pool, &params).await?.events)
}

pub async fn list_dead_letter_events(
    pool: &SqlitePool,
    params: &ListDeadLetterParams,
) -> Result<ListDeadLetterResult, StoreError> {
    let limit = params.limit.max(0);
    let mut query = QueryBuilder::new(format!(
        "SELECT {EVENT_COLUMNS} FROM failed_webhook_events WHERE status = 'dead_letter'"
    ));

    if let Some(provider) = params.provider.as_deref() {
        query.push(" AND provider = ");
        query.push_bind(provider);
    }

    if let Some(cursor) = &params.before {
        query.push(" AND (updated_at < ");
        query.push_bind(&cursor.updated_at);
        query.push(" OR (updated_at = ");
        query.push_bind(&cursor.updated_at);
        query.push(" AND id < ");
        query.push_bind(cursor.id.to_string());
        query.push("))");
    }

    query.push(" ORDER BY updated_at DESC, id DESC LIMIT ");
    query.push_bind(limit.saturating_add(1));

    let rows: Vec<FailedEventRow> = query.build_query_as().fetch_all(pool).await?;

    let page_size = usize::try_from(limit).unwrap_or(usize::MAX);
    let has_more = rows.len() > page_size;
    let mut events = Vec::with_capacity(rows.len().min(page_size));
    for row in rows.into_iter().take(page_size) {
        events.push(FailedWebhookEvent::try_from(row)?);
    }

    let next_before = if has_more {
        events.last().map(|event| DeadLetterCursor {
            updated_at: event.updated_at.clone(),
            id: event.id,
        })
    } else {
        None
    };

    Ok(ListDeadLetterResult {
        events,
        next_before,
    })
}

/// Puts a quarantined row back into the pending cycle with `retry_count = 0`
/// and the first backoff step of its provider's policy.
///
/// Whether the underlying cause was fixed is the operator's call.
pub async fn retry_dead_letter_event(
    pool: &SqlitePool,
    policies: &RetryPolicies,
    id: Uuid,
) -> Result<FailedWebhookEvent, StoreError> {
    let now = Utc::now();
    let now_str = format_utc(now);

    let mut tx = pool.begin().await?;

    let (provider, status): (String, String) =
        sqlx::query_as("SELECT provider, status FROM failed_webhook_events WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound("event not found".to_string()))?;

    if parse_status(&status)? != FailedEventStatus::DeadLetter {
        return Err(StoreError::Conflict("not_dead_letter".to_string()));
    }

    let policy = policies.for_name(&provider);
    let sql = format!(
        r#"
        UPDATE failed_webhook_events
        SET status = 'pending',
            retry_count = 0,
            next_retry_at = ?,
            updated_at = ?
        WHERE id = ?
          AND status = 'dead_letter'
        RETURNING {EVENT_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, FailedEventRow>(&sql)
        .bind(format_utc(next_retry_at(now, 0, &policy)))
        .bind(&now_str)
        .bind(id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Conflict("not_dead_letter".to_string()))?;

    tx.commit().await?;

    let event = FailedWebhookEvent::try_from(row)?;
    tracing::info!(
        provider = %event.provider,
        event_id = %event.event_id,
        row_id = %event.id,
        next_retry_at = event.next_retry_at.as_deref().unwrap_or(""),
        "dead-letter event resubmitted"
    );
    Ok(event)
}
