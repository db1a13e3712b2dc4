//! Hugging Face inference API adapter (image-to-video only).
//!
//! Unlike Kie and Replicate this endpoint is synchronous: one POST, one
//! binary video body. A 503 means the model is cold and needs to load,
//! which callers surface distinctly from generic failures.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use vgen_models::{GenerationMode, GenerationRequest};

use crate::credentials::ProviderKind;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{retry_with_backoff, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::{ProviderVideo, VideoProvider};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

const MODEL: &str = "stabilityai/stable-video-diffusion-img2vid-xt";
const NUM_FRAMES: u32 = 14;
const NUM_INFERENCE_STEPS: u32 = 25;

/// Hugging Face inference client.
pub struct HuggingFaceClient {
    http: reqwest::Client,
    api_token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl HuggingFaceClient {
    pub fn new(http: reqwest::Client, api_token: impl Into<String>) -> Self {
        Self {
            http,
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn infer(&self, inputs: &str) -> ProviderResult<Vec<u8>> {
        let url = format!("{}/models/{}", self.base_url, MODEL);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "inputs": inputs,
                "parameters": {
                    "num_frames": NUM_FRAMES,
                    "num_inference_steps": NUM_INFERENCE_STEPS,
                },
            }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(ProviderError::ModelLoading);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or(text);
            return Err(ProviderError::from_status(status, message));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl VideoProvider for HuggingFaceClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<ProviderVideo> {
        if request.mode != GenerationMode::Image {
            return Err(ProviderError::Upstream(
                "Hugging Face adapter only supports image-to-video".to_string(),
            ));
        }
        let image = request
            .image
            .as_ref()
            .ok_or_else(|| ProviderError::Upstream("image payload missing".into()))?;

        // The inference API wants raw base64, not a data URL.
        let inputs = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

        info!("Running Hugging Face image-to-video inference");
        let video_bytes = retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, || {
            self.infer(&inputs)
        })
        .await?;

        if video_bytes.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "inference returned an empty video body".to_string(),
            ));
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&video_bytes);
        Ok(ProviderVideo {
            url: format!("data:video/mp4;base64,{encoded}"),
            model_label: "Stable Video Diffusion (HuggingFace) - Image-to-Video".to_string(),
        })
    }
}
