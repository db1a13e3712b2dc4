//! Generation orchestrator.
//!
//! One request, one flow: pick the usable providers in priority order,
//! attempt each in turn, and mask any failure as a canned demo success.
//! The external contract is always a 200; `demoReason` and the structured
//! logs keep "unconfigured" and "upstream failed" distinguishable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use vgen_models::{DemoReason, GenerationRequest, GenerationResponse};
use vgen_providers::{
    build_http_client, HuggingFaceClient, ImageHostClient, KieClient, KieImagePayload,
    ProviderCredentials, ProviderError, ProviderVideo, VideoProvider,
};

const NO_PROVIDER_MESSAGE: &str = "Demo mode: Please configure at least one API key \
    (KIE_API_KEY, REPLICATE_API_TOKEN, or HF_API_TOKEN) to use real AI video generation services";

/// Simulated latency for the unconfigured demo path, so the demo site
/// still feels like it did work.
const DEMO_DELAY: Duration = Duration::from_secs(2);

/// Orchestrates provider selection, adapter calls, and demo fallback.
pub struct GenerationService {
    providers: Vec<Arc<dyn VideoProvider>>,
    /// Caps concurrent in-flight generations; each one can hold a poll
    /// loop open for up to two minutes.
    semaphore: Semaphore,
    generation_timeout: Duration,
    demo_delay: Duration,
}

impl GenerationService {
    /// Build adapters for every valid credential, in priority order
    /// Kie > Replicate > Hugging Face.
    pub fn from_credentials(
        credentials: &ProviderCredentials,
        generation_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        let http = build_http_client();
        let mut providers: Vec<Arc<dyn VideoProvider>> = Vec::new();

        if let Some(key) = credentials.kie() {
            let image_host = credentials
                .imgbb()
                .map(|k| ImageHostClient::new(http.clone(), k));
            let mut kie = KieClient::new(
                http.clone(),
                key,
                KieImagePayload::from_env(),
                image_host,
            );
            if let Some(base_url) = credentials.kie_base_url() {
                kie = kie.with_base_url(base_url);
            }
            providers.push(Arc::new(kie));
        }
        if let Some(token) = credentials.replicate() {
            providers.push(Arc::new(vgen_providers::ReplicateClient::new(
                http.clone(),
                token,
            )));
        }
        if let Some(token) = credentials.hugging_face() {
            providers.push(Arc::new(HuggingFaceClient::new(http, token)));
        }

        Self::from_providers(providers, generation_timeout, max_concurrent)
    }

    /// Assemble from pre-built providers. Tests inject mock adapters here.
    pub fn from_providers(
        providers: Vec<Arc<dyn VideoProvider>>,
        generation_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            providers,
            semaphore: Semaphore::new(max_concurrent.max(1)),
            generation_timeout,
            demo_delay: DEMO_DELAY,
        }
    }

    /// Shorten the simulated demo latency (tests).
    pub fn with_demo_delay(mut self, delay: Duration) -> Self {
        self.demo_delay = delay;
        self
    }

    /// Whether any real provider is configured.
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Run one generation request. Never fails: every provider-side
    /// problem degrades to a demo response.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
        let candidates: Vec<&Arc<dyn VideoProvider>> = self
            .providers
            .iter()
            .filter(|p| p.kind().supports(request.mode))
            .collect();

        if candidates.is_empty() {
            warn!(mode = %request.mode, "No provider configured, serving demo response");
            tokio::time::sleep(self.demo_delay).await;
            return GenerationResponse::demo(
                request,
                DemoReason::NoProviderConfigured,
                NO_PROVIDER_MESSAGE.to_string(),
            );
        }

        // The wait for a slot counts against the same budget as the
        // generation itself, so a saturated service degrades to demo
        // instead of queueing forever. Dropping the timed-out future
        // releases the queue position and cancels the in-flight poll loop.
        let outcome = tokio::time::timeout(self.generation_timeout, async {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| ProviderError::Upstream("Service is shutting down".to_string()))?;
            self.try_each(&candidates, request).await
        })
        .await;

        match outcome {
            Ok(Ok(video)) => {
                info!(model = video.model_label, "Generation succeeded");
                GenerationResponse::real(request, video.url, video.model_label)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "All providers failed, serving demo response");
                GenerationResponse::demo(
                    request,
                    DemoReason::UpstreamFailed,
                    format!("API call failed, returning demo video. Error: {err}"),
                )
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.generation_timeout.as_secs(),
                    "Generation timed out, serving demo response"
                );
                GenerationResponse::demo(
                    request,
                    DemoReason::UpstreamFailed,
                    format!(
                        "API call failed, returning demo video. Error: Request timeout after {}s",
                        self.generation_timeout.as_secs()
                    ),
                )
            }
        }
    }

    /// Walk the candidate list in priority order, returning the first
    /// success or the last failure.
    async fn try_each(
        &self,
        candidates: &[&Arc<dyn VideoProvider>],
        request: &GenerationRequest,
    ) -> Result<ProviderVideo, ProviderError> {
        let mut last_err = None;

        for provider in candidates {
            info!(provider = %provider.kind(), "Attempting provider");
            match provider.generate(request).await {
                Ok(video) => return Ok(video),
                Err(err) => {
                    warn!(provider = %provider.kind(), error = %err, "Provider failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or(ProviderError::NotConfigured("provider")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vgen_models::{GenerationMode, Resolution, VideoRatio};
    use vgen_providers::{ProviderKind, ProviderResult};

    struct FakeProvider {
        kind: ProviderKind,
        calls: AtomicU32,
        outcome: Result<&'static str, &'static str>,
        delay: Duration,
    }

    impl FakeProvider {
        fn ok(kind: ProviderKind, url: &'static str) -> Self {
            Self {
                kind,
                calls: AtomicU32::new(0),
                outcome: Ok(url),
                delay: Duration::ZERO,
            }
        }

        fn failing(kind: ProviderKind) -> Self {
            Self {
                kind,
                calls: AtomicU32::new(0),
                outcome: Err("upstream exploded"),
                delay: Duration::ZERO,
            }
        }

        fn hanging(kind: ProviderKind) -> Self {
            Self {
                kind,
                calls: AtomicU32::new(0),
                outcome: Ok("never"),
                delay: Duration::from_secs(3600),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VideoProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> ProviderResult<ProviderVideo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.outcome {
                Ok(url) => Ok(ProviderVideo {
                    url: url.to_string(),
                    model_label: format!("{} model", self.kind),
                }),
                Err(msg) => Err(ProviderError::Upstream(msg.to_string())),
            }
        }
    }

    fn text_request() -> GenerationRequest {
        GenerationRequest {
            mode: GenerationMode::Text,
            text_prompt: Some("A cat playing piano".to_string()),
            motion_prompt: None,
            image: None,
            resolution: Resolution::R720p,
            video_ratio: VideoRatio::Landscape,
            duration_secs: 5,
            has_audio: false,
        }
    }

    fn image_request() -> GenerationRequest {
        GenerationRequest {
            mode: GenerationMode::Image,
            motion_prompt: Some("pan left".to_string()),
            image: Some(vgen_models::UploadedImage {
                bytes: vec![1, 2, 3],
                content_type: "image/png".to_string(),
                file_name: None,
            }),
            text_prompt: None,
            resolution: Resolution::R720p,
            video_ratio: VideoRatio::Portrait,
            duration_secs: 5,
            has_audio: false,
        }
    }

    fn service(providers: Vec<Arc<dyn VideoProvider>>) -> GenerationService {
        GenerationService::from_providers(providers, Duration::from_secs(5), 4)
            .with_demo_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_no_providers_serves_unconfigured_demo() {
        let svc = service(vec![]);
        let resp = svc.generate(&text_request()).await;
        assert!(resp.success);
        assert!(resp.is_demo);
        assert_eq!(resp.credits_used, 0);
        assert_eq!(resp.video_url.as_deref(), Some("/demo-video.mp4"));
        assert_eq!(resp.demo_reason, Some(DemoReason::NoProviderConfigured));
        assert_eq!(resp.model, "demo");
    }

    #[tokio::test]
    async fn test_first_provider_success_stops_the_walk() {
        let kie = Arc::new(FakeProvider::ok(ProviderKind::Kie, "https://kie/out.mp4"));
        let replicate = Arc::new(FakeProvider::ok(
            ProviderKind::Replicate,
            "https://replicate/out.mp4",
        ));
        let svc = service(vec![kie.clone(), replicate.clone()]);

        let resp = svc.generate(&text_request()).await;
        assert!(!resp.is_demo);
        assert_eq!(resp.credits_used, 1);
        assert_eq!(resp.video_url.as_deref(), Some("https://kie/out.mp4"));
        assert_eq!(kie.call_count(), 1);
        assert_eq!(replicate.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failover_to_next_provider() {
        let kie = Arc::new(FakeProvider::failing(ProviderKind::Kie));
        let replicate = Arc::new(FakeProvider::ok(
            ProviderKind::Replicate,
            "https://replicate/out.mp4",
        ));
        let svc = service(vec![kie.clone(), replicate.clone()]);

        let resp = svc.generate(&text_request()).await;
        assert!(!resp.is_demo);
        assert_eq!(resp.video_url.as_deref(), Some("https://replicate/out.mp4"));
        assert_eq!(kie.call_count(), 1);
        assert_eq!(replicate.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing_degrades_to_demo() {
        let kie = Arc::new(FakeProvider::failing(ProviderKind::Kie));
        let replicate = Arc::new(FakeProvider::failing(ProviderKind::Replicate));
        let svc = service(vec![kie.clone(), replicate.clone()]);

        let resp = svc.generate(&text_request()).await;
        assert!(resp.success);
        assert!(resp.is_demo);
        assert_eq!(resp.credits_used, 0);
        assert_eq!(resp.demo_reason, Some(DemoReason::UpstreamFailed));
        assert_eq!(resp.model, "demo (fallback)");
        assert!(resp.message.contains("upstream exploded"));
        assert_eq!(kie.call_count(), 1);
        assert_eq!(replicate.call_count(), 1);
    }

    #[tokio::test]
    async fn test_huggingface_skipped_for_text_mode() {
        let hf = Arc::new(FakeProvider::ok(
            ProviderKind::HuggingFace,
            "https://hf/out.mp4",
        ));
        let svc = service(vec![hf.clone()]);

        let resp = svc.generate(&text_request()).await;
        assert!(resp.is_demo);
        assert_eq!(resp.demo_reason, Some(DemoReason::NoProviderConfigured));
        assert_eq!(hf.call_count(), 0);

        let resp = svc.generate(&image_request()).await;
        assert!(!resp.is_demo);
        assert_eq!(hf.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_provider_times_out_to_demo() {
        let kie = Arc::new(FakeProvider::hanging(ProviderKind::Kie));
        let svc = service(vec![kie]);

        let resp = svc.generate(&text_request()).await;
        assert!(resp.is_demo);
        assert_eq!(resp.demo_reason, Some(DemoReason::UpstreamFailed));
        assert!(resp.message.contains("timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturated_service_times_out_instead_of_queueing() {
        let kie = Arc::new(FakeProvider::hanging(ProviderKind::Kie));
        let svc = Arc::new(
            GenerationService::from_providers(vec![kie], Duration::from_secs(5), 1)
                .with_demo_delay(Duration::from_millis(1)),
        );

        // First request takes the only slot and hangs in its provider.
        let first = tokio::spawn({
            let svc = Arc::clone(&svc);
            async move { svc.generate(&text_request()).await }
        });
        tokio::task::yield_now().await;

        // Second request never gets a permit; its own budget still expires.
        let resp = svc.generate(&text_request()).await;
        assert!(resp.is_demo);
        assert_eq!(resp.demo_reason, Some(DemoReason::UpstreamFailed));
        assert!(resp.message.contains("timeout"));

        let resp = first.await.unwrap();
        assert!(resp.is_demo);
        assert!(resp.message.contains("timeout"));
    }

    #[tokio::test]
    async fn test_requests_are_independent() {
        let kie = Arc::new(FakeProvider::ok(ProviderKind::Kie, "https://kie/out.mp4"));
        let svc = service(vec![kie.clone()]);

        let first = svc.generate(&text_request()).await;
        let second = svc.generate(&text_request()).await;
        assert_eq!(first.video_url, second.video_url);
        assert_eq!(kie.call_count(), 2);
    }
}
