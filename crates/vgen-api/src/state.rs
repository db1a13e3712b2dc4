//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use vgen_providers::ProviderCredentials;

use crate::config::ApiConfig;
use crate::services::GenerationService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub generation: Arc<GenerationService>,
}

impl AppState {
    /// Create application state from environment configuration.
    ///
    /// Credentials are read exactly once here; adapters receive them by
    /// injection. Missing keys are fine, the service degrades to demo mode.
    pub fn new(config: ApiConfig) -> Self {
        let credentials = ProviderCredentials::from_env();
        info!(
            kie = credentials.kie().is_some(),
            replicate = credentials.replicate().is_some(),
            huggingface = credentials.hugging_face().is_some(),
            imgbb = credentials.imgbb().is_some(),
            "Provider credentials loaded"
        );
        if !credentials.has_any() {
            warn!("No provider credentials configured; all requests will get demo responses");
        }

        let generation = GenerationService::from_credentials(
            &credentials,
            config.generation_timeout,
            config.max_concurrent_generations,
        );

        Self {
            config,
            generation: Arc::new(generation),
        }
    }

    /// Build state around an existing service (tests).
    pub fn with_service(config: ApiConfig, generation: Arc<GenerationService>) -> Self {
        Self { config, generation }
    }
}
