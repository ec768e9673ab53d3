use std::sync::Arc;

use moments_llm::{ArkProvider, VisionProvider};

use crate::config::GatewayConfig;

pub struct AppState {
    pub config: GatewayConfig,
    /// Present only when a credential is configured.
    pub provider: Option<Arc<dyn VisionProvider>>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        let provider = config.api_key.as_ref().map(|api_key| {
            log::info!(
                "Creating upstream provider with base URL: {} and model: {}",
                config.base_url,
                config.model
            );
            Arc::new(
                ArkProvider::new(api_key.clone())
                    .with_base_url(config.base_url.clone())
                    .with_model(config.model.clone())
                    .with_reasoning_effort(config.reasoning_effort.clone()),
            ) as Arc<dyn VisionProvider>
        });

        if provider.is_none() {
            log::warn!("ARK_API_KEY is not configured; analysis requests will be rejected");
        }

        Self { config, provider }
    }

    /// State with an explicit provider, bypassing credential lookup.
    pub fn with_provider(config: GatewayConfig, provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            config,
            provider: Some(provider),
        }
    }
}
