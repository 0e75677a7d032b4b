use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    auth::admin_auth,
    handlers::{
        dead_letter::{get_event_handler, list_dead_letter_handler, resubmit_handler},
        retries::run_retries_handler,
    },
    state::AppState,
};

/// Operator routes. Services that receive webhooks build `AppState` with
/// their own `HandlerRegistry` so `/internal/retries/run` can replay rows.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/internal/retries/run", post(run_retries_handler))
        .route("/internal/dead-letter", get(list_dead_letter_handler))
        .route("/internal/dead-letter/:id/retry", post(resubmit_handler))
        .route("/internal/events/:id", get(get_event_handler))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}
