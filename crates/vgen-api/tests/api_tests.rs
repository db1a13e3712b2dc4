//! End-to-end handler tests over the real router.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use vgen_api::{create_router, ApiConfig, AppState, GenerationService};
use vgen_models::GenerationRequest;
use vgen_providers::{ProviderError, ProviderKind, ProviderResult, ProviderVideo, VideoProvider};

const BOUNDARY: &str = "vgen-test-boundary";

struct StubProvider {
    kind: ProviderKind,
    outcome: Result<&'static str, &'static str>,
}

#[async_trait]
impl VideoProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, _request: &GenerationRequest) -> ProviderResult<ProviderVideo> {
        match self.outcome {
            Ok(url) => Ok(ProviderVideo {
                url: url.to_string(),
                model_label: "Sora 2 (Kie.ai) - Text-to-Video".to_string(),
            }),
            Err(msg) => Err(ProviderError::Upstream(msg.to_string())),
        }
    }
}

fn app(providers: Vec<Arc<dyn VideoProvider>>) -> axum::Router {
    let service = GenerationService::from_providers(providers, Duration::from_secs(5), 4)
        .with_demo_delay(Duration::from_millis(1));
    let state = AppState::with_service(ApiConfig::default(), Arc::new(service));
    create_router(state, None)
}

/// Build a multipart body from text fields plus an optional image part.
fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
                 filename=\"photo\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn generate_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate-video")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn text_fields<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("mode", "text"),
        ("textPrompt", "A cat playing piano"),
        ("resolution", "720p"),
        ("videoRatio", "16:9"),
        ("duration", "5"),
    ]
}

#[tokio::test]
async fn unconfigured_request_gets_demo_response() {
    let response = app(vec![])
        .oneshot(generate_request(multipart_body(&text_fields(), None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["isDemo"], true);
    assert_eq!(json["creditsUsed"], 0);
    assert_eq!(json["videoUrl"], "/demo-video.mp4");
    assert_eq!(json["demoReason"], "noProviderConfigured");
    assert_eq!(json["prompt"], "A cat playing piano");
}

#[tokio::test]
async fn blank_text_prompt_is_a_400() {
    let fields = vec![
        ("mode", "text"),
        ("textPrompt", "   "),
        ("duration", "5"),
    ];
    let response = app(vec![])
        .oneshot(generate_request(multipart_body(&fields, None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Please enter a video description");
}

#[tokio::test]
async fn disallowed_image_type_is_a_400() {
    let fields = vec![
        ("mode", "image"),
        ("motionPrompt", "zoom in"),
        ("duration", "5"),
    ];
    let response = app(vec![])
        .oneshot(generate_request(multipart_body(
            &fields,
            Some(("image/gif", &[0x47, 0x49, 0x46])),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid image type"));
}

#[tokio::test]
async fn multi_megabyte_image_is_accepted() {
    let provider = Arc::new(StubProvider {
        kind: ProviderKind::Kie,
        outcome: Ok("https://cdn.kie.ai/animated.mp4"),
    });
    let fields = vec![
        ("mode", "image"),
        ("motionPrompt", "zoom in"),
        ("duration", "5"),
    ];
    let image = vec![0u8; 5 * 1024 * 1024];
    let response = app(vec![provider])
        .oneshot(generate_request(multipart_body(
            &fields,
            Some(("image/png", &image)),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["isDemo"], false);
    assert_eq!(json["videoUrl"], "https://cdn.kie.ai/animated.mp4");
}

#[tokio::test]
async fn oversized_image_is_a_400() {
    let fields = vec![
        ("mode", "image"),
        ("motionPrompt", "zoom in"),
        ("duration", "5"),
    ];
    let image = vec![0u8; 10 * 1024 * 1024 + 1];
    let response = app(vec![])
        .oneshot(generate_request(multipart_body(
            &fields,
            Some(("image/png", &image)),
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Image size exceeds"));
}

#[tokio::test]
async fn out_of_range_duration_is_a_400() {
    let fields = vec![
        ("mode", "text"),
        ("textPrompt", "A cat playing piano"),
        ("duration", "30"),
    ];
    let response = app(vec![])
        .oneshot(generate_request(multipart_body(&fields, None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn successful_provider_yields_real_response() {
    let provider = Arc::new(StubProvider {
        kind: ProviderKind::Kie,
        outcome: Ok("https://cdn.kie.ai/out.mp4"),
    });
    let response = app(vec![provider])
        .oneshot(generate_request(multipart_body(&text_fields(), None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["isDemo"], false);
    assert_eq!(json["creditsUsed"], 1);
    assert_eq!(json["videoUrl"], "https://cdn.kie.ai/out.mp4");
    assert_eq!(json["model"], "Sora 2 (Kie.ai) - Text-to-Video");
    assert!(json.get("demoReason").is_none());
}

#[tokio::test]
async fn provider_failure_masks_as_demo_success() {
    let provider = Arc::new(StubProvider {
        kind: ProviderKind::Kie,
        outcome: Err("quota exceeded"),
    });
    let response = app(vec![provider])
        .oneshot(generate_request(multipart_body(&text_fields(), None)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["isDemo"], true);
    assert_eq!(json["creditsUsed"], 0);
    assert_eq!(json["demoReason"], "upstreamFailed");
    assert_eq!(json["model"], "demo (fallback)");
    assert!(json["message"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn health_endpoints_respond() {
    let response = app(vec![])
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(vec![])
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["providers_configured"], false);
}
