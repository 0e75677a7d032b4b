use std::sync::Arc;

use sqlx::SqlitePool;

use crate::retry::{HandlerRegistry, RetryConfig};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub retry: RetryConfig,
    pub handlers: Arc<HandlerRegistry>,
    pub admin_api_token: Option<String>,
}
