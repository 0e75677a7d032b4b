use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::retry::Provider;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Re-runs the business side effect of a stored webhook payload.
///
/// Replays are at-least-once: the same payload can arrive again after a
/// handler partially succeeded and then failed, so implementations must be
/// idempotent.
#[async_trait]
pub trait ReplayHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> ReplayHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        (self)(payload).await
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Provider, Arc<dyn ReplayHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(mut self, provider: Provider, handler: H) -> Self
    where
        H: ReplayHandler + 'static,
    {
        self.handlers.insert(provider, Arc::new(handler));
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ReplayHandler>> {
        self.handlers.get(&provider).cloned()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("providers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Awaits a handler future under a deadline, flattening the outcome to the
/// message that ends up in `last_error`.
pub(crate) async fn run_with_timeout<Fut, E>(timeout: Duration, fut: Fut) -> Result<(), String>
where
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("handler timed out after {}ms", timeout.as_millis())),
    }
}
