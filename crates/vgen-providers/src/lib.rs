//! Provider adapters for third-party video generation services.
//!
//! Each adapter translates a normalized [`GenerationRequest`] into one
//! provider's API calls: a creation request (retried with backoff on
//! transient failures) and, for async providers, a bounded fixed-interval
//! poll loop. Adapters share the error taxonomy in [`error`] so the API
//! layer can decide what degrades to a demo response.

use std::time::Duration;

use async_trait::async_trait;
use vgen_models::GenerationRequest;

pub mod credentials;
pub mod error;
pub mod huggingface;
pub mod imgbb;
pub mod kie;
pub mod replicate;
pub mod retry;

pub use credentials::{is_valid_key, ProviderCredentials, ProviderKind};
pub use error::{ProviderError, ProviderResult};
pub use huggingface::HuggingFaceClient;
pub use imgbb::ImageHostClient;
pub use kie::{KieClient, KieImagePayload};
pub use replicate::ReplicateClient;
pub use retry::retry_with_backoff;

/// Fixed interval between poll attempts.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum poll attempts before a task is declared timed out (~2 minutes
/// at the default interval).
pub const MAX_POLL_ATTEMPTS: u32 = 60;

/// Per-request timeout for outbound provider calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A completed render handed back by an adapter.
#[derive(Debug, Clone)]
pub struct ProviderVideo {
    /// Either a hosted URL or a `data:video/mp4` payload.
    pub url: String,
    /// Human-readable model label echoed in the response envelope.
    pub model_label: String,
}

/// One upstream generation service.
///
/// Implementations are stateless per request; the orchestrator walks them
/// in priority order and treats any error as grounds to try the next.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<ProviderVideo>;
}

/// Build the shared outbound HTTP client with the standard timeout.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}
