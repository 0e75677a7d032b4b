use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    error::ApiError,
    retry::process_pending_retries,
    state::AppState,
    types::{BatchSummary, RunRetriesRequest},
};

const MAX_BATCH_LIMIT: i64 = 1_000;

/// Scheduler entry point: replays one bounded batch of due rows.
///
/// A POST without a JSON body runs with the configured batch limit. Rows
/// whose provider has no handler in `AppState::handlers` are skipped, so a
/// deployment with an empty registry only reports them.
pub async fn run_retries_handler(
    State(state): State<AppState>,
    body: Result<Json<RunRetriesRequest>, JsonRejection>,
) -> Result<Json<BatchSummary>, ApiError> {
    let requested = match body {
        Ok(Json(req)) => req.limit,
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(ApiError::validation(rejection.body_text())),
    };
    let limit = parse_limit(requested, state.retry.batch_limit)?;

    let summary = process_pending_retries(&state.pool, &state.retry, &state.handlers, limit).await?;

    Ok(Json(summary))
}

fn parse_limit(limit: Option<i64>, default: i64) -> Result<i64, ApiError> {
    let limit = limit.unwrap_or(default);
    if !(1..=MAX_BATCH_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "limit must be between 1 and {MAX_BATCH_LIMIT}"
        )));
    }
    Ok(limit)
}
