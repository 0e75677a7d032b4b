use axum::{
    Json,
    extract::{Path, Query, State},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dead_letter::{
        DeadLetterCursor, ListDeadLetterParams, list_dead_letter_events, retry_dead_letter_event,
    },
    error::ApiError,
    retry::get_event,
    state::AppState,
    types::{GetEventResponse, ListDeadLetterResponse, ResubmitResponse},
};

#[derive(Debug, Deserialize)]
pub struct ListDeadLetterQuery {
    limit: Option<i64>,
    before: Option<String>,
    provider: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    updated_at: String,
    id: String,
}

pub async fn list_dead_letter_handler(
    State(state): State<AppState>,
    Query(query): Query<ListDeadLetterQuery>,
) -> Result<Json<ListDeadLetterResponse>, ApiError> {
    let limit = parse_limit(query.limit)?;
    let before = match query.before {
        Some(raw) => Some(decode_cursor(&raw)?),
        None => None,
    };
    let provider = match query.provider {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ApiError::validation("provider must be non-empty"));
            }
            Some(trimmed.to_ascii_lowercase())
        }
        None => None,
    };

    let params = ListDeadLetterParams {
        limit,
        before,
        provider,
    };

    let result = list_dead_letter_events(&state.pool, &params).await?;
    let next_before = match result.next_before {
        Some(cursor) => Some(encode_cursor(&cursor)?),
        None => None,
    };

    Ok(Json(ListDeadLetterResponse {
        events: result.events,
        next_before,
    }))
}

pub async fn get_event_handler(
    State(state): State<AppState>,
    Path(row_id): Path<String>,
) -> Result<Json<GetEventResponse>, ApiError> {
    let row_id = parse_uuid("id", &row_id)?;
    let event = get_event(&state.pool, row_id).await?;
    Ok(Json(GetEventResponse { event }))
}

pub async fn resubmit_handler(
    State(state): State<AppState>,
    Path(row_id): Path<String>,
) -> Result<Json<ResubmitResponse>, ApiError> {
    let row_id = parse_uuid("id", &row_id)?;
    let event = retry_dead_letter_event(&state.pool, &state.retry.policies, row_id).await?;
    Ok(Json(ResubmitResponse { event }))
}

fn parse_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    let limit = limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(ApiError::validation("limit must be between 1 and 200"));
    }
    Ok(limit)
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| ApiError::validation(format!("{field} must be a UUID")))
}

fn decode_cursor(raw: &str) -> Result<DeadLetterCursor, ApiError> {
    let invalid = || ApiError::validation("before must be a valid cursor");
    let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid())?;
    let payload: CursorPayload = serde_json::from_slice(&decoded).map_err(|_| invalid())?;
    DateTime::parse_from_rfc3339(&payload.updated_at).map_err(|_| invalid())?;
    let id = Uuid::parse_str(&payload.id).map_err(|_| invalid())?;
    Ok(DeadLetterCursor {
        updated_at: payload.updated_at,
        id,
    })
}

fn encode_cursor(cursor: &DeadLetterCursor) -> Result<String, ApiError> {
    let payload = CursorPayload {
        updated_at: cursor.updated_at.clone(),
        id: cursor.id.to_string(),
    };
    let encoded = serde_json::to_vec(&payload)
        .map_err(|_| ApiError::Internal("failed to encode cursor".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(encoded))
}
