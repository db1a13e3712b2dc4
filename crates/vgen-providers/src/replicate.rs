//! Replicate Stable Video Diffusion adapter.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use vgen_models::{GenerationMode, GenerationRequest};

use crate::credentials::ProviderKind;
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{retry_with_backoff, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::{ProviderVideo, VideoProvider, MAX_POLL_ATTEMPTS, POLL_INTERVAL};

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

const MODEL_VERSION: &str =
    "stability-ai/stable-video-diffusion:3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438";

// Fixed model parameters.
const FPS: u32 = 7;
const MOTION_BUCKET_ID: u32 = 127;
const COND_AUG: f64 = 0.02;
const DECODING_T: u32 = 14;

/// Replicate prediction API client.
pub struct ReplicateClient {
    http: reqwest::Client,
    api_token: String,
    base_url: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<PredictionOutput>,
    #[serde(default)]
    error: Option<String>,
}

/// Replicate returns either a single URL or a list, depending on model.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionOutput {
    One(String),
    Many(Vec<String>),
}

impl PredictionOutput {
    fn first_url(&self) -> Option<&str> {
        match self {
            PredictionOutput::One(url) if !url.is_empty() => Some(url),
            PredictionOutput::Many(urls) => {
                urls.first().filter(|u| !u.is_empty()).map(String::as_str)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

impl ReplicateClient {
    pub fn new(http: reqwest::Client, api_token: impl Into<String>) -> Self {
        Self {
            http,
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
        }
    }

    /// Point the client at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the polling cadence (test servers).
    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    fn build_input(request: &GenerationRequest) -> ProviderResult<serde_json::Value> {
        let seed: u32 = rand::rng().random_range(0..1_000_000);

        match request.mode {
            GenerationMode::Text => Ok(json!({
                "prompt": request.text_prompt.as_deref().unwrap_or(""),
                "num_frames": request.duration_secs * FPS,
                "fps": FPS,
                "seed": seed,
            })),
            GenerationMode::Image => {
                let image = request
                    .image
                    .as_ref()
                    .ok_or_else(|| ProviderError::Upstream("image payload missing".into()))?;
                Ok(json!({
                    "input_image": image.to_data_url(),
                    "motion_bucket_id": MOTION_BUCKET_ID,
                    "fps": FPS,
                    "cond_aug": COND_AUG,
                    "decoding_t": DECODING_T,
                    "seed": seed,
                }))
            }
        }
    }

    async fn create_prediction(&self, input: &serde_json::Value) -> ProviderResult<Prediction> {
        let url = format!("{}/v1/predictions", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&json!({
                "version": MODEL_VERSION,
                "input": input,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.detail)
                .unwrap_or(text);
            return Err(ProviderError::from_status(status, message));
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    async fn poll_prediction(&self, id: &str) -> ProviderResult<String> {
        let url = format!("{}/v1/predictions/{}", self.base_url, id);

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .http
                .get(&url)
                .header("Authorization", format!("Token {}", self.api_token))
                .send()
                .await?;

            let prediction: Prediction = response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

            debug!(
                prediction_id = id,
                attempt,
                max = self.max_poll_attempts,
                status = %prediction.status,
                "Replicate prediction poll"
            );

            match prediction.status.as_str() {
                "starting" | "processing" => continue,
                "succeeded" => {
                    return prediction
                        .output
                        .as_ref()
                        .and_then(PredictionOutput::first_url)
                        .map(String::from)
                        .ok_or_else(|| {
                            ProviderError::MalformedResponse(
                                "prediction succeeded without output".to_string(),
                            )
                        });
                }
                _ => {
                    return Err(ProviderError::Upstream(format!(
                        "Video generation failed: {}",
                        prediction.error.as_deref().unwrap_or("unknown")
                    )));
                }
            }
        }

        Err(ProviderError::PollTimeout)
    }

    fn model_label(mode: GenerationMode) -> String {
        match mode {
            GenerationMode::Text => {
                "Stable Video Diffusion (Replicate) - Text-to-Video".to_string()
            }
            GenerationMode::Image => {
                "Stable Video Diffusion (Replicate) - Image-to-Video".to_string()
            }
        }
    }
}

#[async_trait]
impl VideoProvider for ReplicateClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<ProviderVideo> {
        let input = Self::build_input(request)?;
        info!(mode = %request.mode, "Creating Replicate prediction");

        let prediction = retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, || {
            self.create_prediction(&input)
        })
        .await?;

        // A prediction can land terminal on creation; check before polling.
        let url = match prediction.status.as_str() {
            "succeeded" => prediction
                .output
                .as_ref()
                .and_then(PredictionOutput::first_url)
                .map(String::from)
                .ok_or_else(|| {
                    ProviderError::MalformedResponse(
                        "prediction succeeded without output".to_string(),
                    )
                })?,
            "failed" | "canceled" => {
                return Err(ProviderError::Upstream(format!(
                    "Video generation failed: {}",
                    prediction.error.as_deref().unwrap_or("unknown")
                )))
            }
            _ => {
                info!(prediction_id = %prediction.id, "Polling Replicate prediction");
                self.poll_prediction(&prediction.id).await?
            }
        };

        Ok(ProviderVideo {
            url,
            model_label: Self::model_label(request.mode),
        })
    }
}
