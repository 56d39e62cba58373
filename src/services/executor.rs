use crate::services::auth::CredentialGate;
use crate::services::gemini::{ApiError, GeminiClient};
use anyhow::Result;
use log::warn;
use std::future::Future;
use std::sync::Arc;

/// Runs every remote operation with a client bound to the gate's current
/// credential. A 404 "entity not found" failure triggers one credential
/// reselection and one retry when an interactive flow is available; any
/// other failure, and any failure of the retried call, propagates as-is.
pub struct RequestExecutor {
    gate: Arc<dyn CredentialGate>,
}

impl RequestExecutor {
    pub fn new(gate: Arc<dyn CredentialGate>) -> Self {
        Self { gate }
    }

    fn client(&self) -> GeminiClient {
        GeminiClient::new(&self.gate.credential())
    }

    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(GeminiClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match operation(self.client()).await {
            Ok(value) => Ok(value),
            Err(err) if is_entity_not_found(&err) && self.gate.can_reselect() => {
                warn!("Entity not found (404), prompting for API key re-selection");
                self.gate.request_selection().await?;
                operation(self.client()).await
            }
            Err(err) => Err(err),
        }
    }
}

fn is_entity_not_found(err: &anyhow::Error) -> bool {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        if api.status == 404 {
            return true;
        }
    }
    let rendered = format!("{:#}", err);
    rendered.contains("Requested entity was not found") || rendered.contains("404")
}
