use anyhow::Result;
use std::sync::Arc;
use storystream::core::config::Config;
use storystream::services::auth::{CredentialGate, EnvGate, PromptGate};
use storystream::services::executor::RequestExecutor;
use storystream::services::media::MediaService;
use storystream::services::workflow::PipelineManager;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load_or_init()?;
    config.ensure_directories()?;

    let api_key = if config.gemini.api_key.is_empty() {
        std::env::var("GEMINI_API_KEY").unwrap_or_default()
    } else {
        config.gemini.api_key.clone()
    };

    let gate: Arc<dyn CredentialGate> = if config.unattended {
        Arc::new(EnvGate::new(api_key))
    } else {
        let initial = if api_key.is_empty() {
            None
        } else {
            Some(api_key)
        };
        Arc::new(PromptGate::new(initial))
    };

    if !gate.is_ready() {
        if gate.can_reselect() {
            gate.request_selection().await?;
        } else {
            anyhow::bail!(
                "No API key configured. Set gemini.api_key in config.yml or GEMINI_API_KEY."
            );
        }
    }

    let executor = RequestExecutor::new(gate.clone());
    let media = MediaService::new(executor, config.gemini.clone(), config.video.clone());

    let mut pipeline = PipelineManager::new(config, media, gate);
    pipeline.run().await
}
