use std::{net::SocketAddr, sync::Arc};

use sqlx::sqlite::SqlitePoolOptions;
use webhook_retry::{
    retry::{HandlerRegistry, RetryConfig},
    routes::router,
    state::AppState,
    telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:webhook_retry.db?mode=rwc".to_string());
    let bind_addr = std::env::var("RETRY_ADMIN_BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3002".to_string());
    let admin_api_token = std::env::var("RETRY_ADMIN_API_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let retry = RetryConfig::from_env();
    // Provider handlers live in the services that receive the webhooks; this
    // binary only exposes the operator surface, so replays skip every row.
    let handlers = Arc::new(HandlerRegistry::new());
    if admin_api_token.is_none() {
        tracing::warn!("RETRY_ADMIN_API_TOKEN not set, admin routes are unauthenticated");
    }

    let state = AppState {
        pool,
        retry,
        handlers,
        admin_api_token,
    };
    let app = router(state);

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "webhook retry admin listening");
    axum::serve(listener, app).await?;

    Ok(())
}
