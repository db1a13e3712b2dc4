//! Response envelope returned to clients.

use serde::{Deserialize, Serialize};

use crate::request::GenerationRequest;

/// Why a request was answered with demo assets instead of a real render.
///
/// The external contract is still a 200 success either way; this field
/// (and the structured log next to it) keeps the two cases distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DemoReason {
    /// No valid provider credential was configured.
    NoProviderConfigured,
    /// At least one provider was tried and every attempt failed.
    UpstreamFailed,
}

/// The only externally visible artifact of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub credits_used: u32,
    pub message: String,
    pub mode: String,
    pub prompt: String,
    pub model: String,
    pub resolution: String,
    pub duration: String,
    pub is_demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_reason: Option<DemoReason>,
}

/// Static assets served when generation is unavailable.
pub const DEMO_VIDEO_URL: &str = "/demo-video.mp4";
pub const DEMO_IMAGE_URL: &str = "/demo-image.jpg";

impl GenerationResponse {
    /// A real render from a named provider model. One credit per render.
    pub fn real(request: &GenerationRequest, video_url: String, model: String) -> Self {
        Self {
            success: true,
            video_url: Some(video_url),
            image_url: None,
            credits_used: 1,
            message: "Video generated successfully!".to_string(),
            mode: request.mode.to_string(),
            prompt: request.prompt().to_string(),
            model,
            resolution: request.resolution.to_string(),
            duration: request.duration_secs.to_string(),
            is_demo: false,
            demo_reason: None,
        }
    }

    /// A canned demo response. `creditsUsed` is always zero.
    pub fn demo(request: &GenerationRequest, reason: DemoReason, message: String) -> Self {
        let model = match reason {
            DemoReason::NoProviderConfigured => "demo",
            DemoReason::UpstreamFailed => "demo (fallback)",
        };
        Self {
            success: true,
            video_url: Some(DEMO_VIDEO_URL.to_string()),
            image_url: Some(DEMO_IMAGE_URL.to_string()),
            credits_used: 0,
            message,
            mode: request.mode.to_string(),
            prompt: request.prompt().to_string(),
            model: model.to_string(),
            resolution: request.resolution.to_string(),
            duration: request.duration_secs.to_string(),
            is_demo: true,
            demo_reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{GenerationMode, Resolution, VideoRatio};

    fn request() -> GenerationRequest {
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

    #[test]
    fn test_demo_response_shape() {
        let resp = GenerationResponse::demo(
            &request(),
            DemoReason::NoProviderConfigured,
            "Demo mode".to_string(),
        );
        assert!(resp.success);
        assert!(resp.is_demo);
        assert_eq!(resp.credits_used, 0);
        assert_eq!(resp.video_url.as_deref(), Some(DEMO_VIDEO_URL));
        assert_eq!(resp.model, "demo");

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["isDemo"], true);
        assert_eq!(json["creditsUsed"], 0);
        assert_eq!(json["demoReason"], "noProviderConfigured");
    }

    #[test]
    fn test_real_response_shape() {
        let resp = GenerationResponse::real(
            &request(),
            "https://cdn.example.com/out.mp4".to_string(),
            "Sora 2 (Kie.ai) - Text-to-Video".to_string(),
        );
        assert!(resp.success);
        assert!(!resp.is_demo);
        assert_eq!(resp.credits_used, 1);
        assert!(resp.demo_reason.is_none());
        assert_eq!(resp.prompt, "A cat playing piano");
    }
}
