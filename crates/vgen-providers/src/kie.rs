//! Kie.ai Sora-2 adapter.
//!
//! Creates a generation task and polls it to completion. The image payload
//! format (inline base64 vs hosted URL) has differed across provider API
//! revisions, so it is a configuration parameter rather than a constant.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vgen_models::{GenerationMode, GenerationRequest, TaskState};

use crate::credentials::ProviderKind;
use crate::error::{ProviderError, ProviderResult};
use crate::imgbb::ImageHostClient;
use crate::retry::{retry_with_backoff, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::{ProviderVideo, VideoProvider, MAX_POLL_ATTEMPTS, POLL_INTERVAL};

pub const DEFAULT_BASE_URL: &str = "https://api.kie.ai";

const CREATE_TASK_PATH: &str = "/createTask";
const GET_TASK_PATH: &str = "/getTaskResult";

const TEXT_MODEL: &str = "sora-2-text-to-video";
const IMAGE_MODEL: &str = "sora-2-image-to-video";

/// How the image reaches Kie for image-to-video requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KieImagePayload {
    /// Base64 data URL embedded in the request body.
    #[default]
    Inline,
    /// Public HTTPS URL obtained through the image relay.
    Hosted,
}

impl KieImagePayload {
    /// Parse `KIE_IMAGE_PAYLOAD`; unknown values fall back to inline.
    pub fn from_env() -> Self {
        match std::env::var("KIE_IMAGE_PAYLOAD").as_deref() {
            Ok("url") | Ok("hosted") => KieImagePayload::Hosted,
            _ => KieImagePayload::Inline,
        }
    }
}

/// Kie.ai Sora-2 API client.
pub struct KieClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    image_payload: KieImagePayload,
    image_host: Option<ImageHostClient>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
struct CreateTaskBody {
    model: &'static str,
    prompt: String,
    aspect_ratio: &'static str,
    n_frames: &'static str,
    remove_watermark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_urls: Option<Vec<String>>,
}

/// Kie response shapes vary across revisions; accept every spelling we
/// have observed and normalize in the accessors.
#[derive(Debug, Default, Deserialize)]
struct TaskEnvelope {
    #[serde(rename = "taskId")]
    task_id_camel: Option<String>,
    task_id: Option<String>,
    id: Option<String>,
    #[serde(rename = "videoUrl")]
    video_url_camel: Option<String>,
    video_url: Option<String>,
    url: Option<String>,
    output: Option<String>,
    status: Option<String>,
    state: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl TaskEnvelope {
    fn task_id(&self) -> Option<&str> {
        self.task_id_camel
            .as_deref()
            .or(self.task_id.as_deref())
            .or(self.id.as_deref())
    }

    fn video_url(&self) -> Option<&str> {
        self.video_url_camel
            .as_deref()
            .or(self.video_url.as_deref())
            .or(self.url.as_deref())
            .or(self.output.as_deref())
            .filter(|u| !u.is_empty())
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref().or(self.state.as_deref())
    }

    fn error_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

impl KieClient {
    pub fn new(
        http: reqwest::Client,
        api_key: impl Into<String>,
        image_payload: KieImagePayload,
        image_host: Option<ImageHostClient>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            image_payload,
            image_host,
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

    async fn build_body(&self, request: &GenerationRequest) -> ProviderResult<CreateTaskBody> {
        let (model, prompt) = match request.mode {
            GenerationMode::Text => (
                TEXT_MODEL,
                request.text_prompt.clone().unwrap_or_default(),
            ),
            GenerationMode::Image => (
                IMAGE_MODEL,
                request.motion_prompt.clone().unwrap_or_default(),
            ),
        };

        let aspect_ratio = match request.video_ratio {
            vgen_models::VideoRatio::Portrait => "portrait",
            vgen_models::VideoRatio::Landscape => "landscape",
        };

        // Kie quantizes duration to discrete frame windows.
        let n_frames = if request.duration_secs >= 10 { "10s" } else { "5s" };

        let image_urls = match (request.mode, request.image.as_ref()) {
            (GenerationMode::Image, Some(image)) => match self.image_payload {
                KieImagePayload::Inline => Some(vec![image.to_data_url()]),
                KieImagePayload::Hosted => {
                    let host = self.image_host.as_ref().ok_or_else(|| {
                        ProviderError::ImageHost(
                            "hosted image payload requires IMGBB_API_KEY".to_string(),
                        )
                    })?;
                    Some(vec![host.upload(image).await?])
                }
            },
            _ => None,
        };

        Ok(CreateTaskBody {
            model,
            prompt,
            aspect_ratio,
            n_frames,
            remove_watermark: true,
            image_urls,
        })
    }

    async fn create_task(&self, body: &CreateTaskBody) -> ProviderResult<TaskEnvelope> {
        let url = format!("{}{}", self.base_url, CREATE_TASK_PATH);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TaskEnvelope>(&text)
                .map(|e| e.error_text())
                .unwrap_or(text);
            return Err(ProviderError::from_status(status, message));
        }

        response
            .json::<TaskEnvelope>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    async fn poll_task(&self, task_id: &str) -> ProviderResult<String> {
        let url = format!("{}{}", self.base_url, GET_TASK_PATH);

        for attempt in 1..=self.max_poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .http
                .get(&url)
                .query(&[("taskId", task_id)])
                .bearer_auth(&self.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Upstream(format!(
                    "Task polling failed: HTTP {}",
                    status.as_u16()
                )));
            }

            let envelope: TaskEnvelope = response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

            let raw_status = envelope.status().unwrap_or("unknown");
            let state = TaskState::from_provider(raw_status);

            debug!(
                task_id,
                attempt,
                max = self.max_poll_attempts,
                status = raw_status,
                "Kie task poll"
            );

            match state {
                TaskState::Succeeded => {
                    return envelope.video_url().map(String::from).ok_or_else(|| {
                        ProviderError::MalformedResponse(
                            "task completed but no video URL returned".to_string(),
                        )
                    });
                }
                TaskState::Failed => {
                    return Err(ProviderError::Upstream(format!(
                        "Task failed: {}",
                        envelope.error_text()
                    )));
                }
                TaskState::Pending | TaskState::Processing => continue,
            }
        }

        Err(ProviderError::PollTimeout)
    }

    fn model_label(mode: GenerationMode) -> String {
        match mode {
            GenerationMode::Text => "Sora 2 (Kie.ai) - Text-to-Video".to_string(),
            GenerationMode::Image => "Sora 2 (Kie.ai) - Image-to-Video".to_string(),
        }
    }
}

#[async_trait]
impl VideoProvider for KieClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Kie
    }

    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<ProviderVideo> {
        let body = self.build_body(request).await?;
        info!(model = body.model, "Creating Kie generation task");

        let envelope = retry_with_backoff(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, || {
            self.create_task(&body)
        })
        .await?;

        let url = if let Some(task_id) = envelope.task_id() {
            let task_id = task_id.to_string();
            info!(task_id = %task_id, "Polling Kie task");
            self.poll_task(&task_id).await?
        } else if let Some(url) = envelope.video_url() {
            // Some revisions answer synchronously.
            url.to_string()
        } else {
            return Err(ProviderError::MalformedResponse(
                "create task response carried neither a task id nor a video URL".to_string(),
            ));
        };

        Ok(ProviderVideo {
            url,
            model_label: Self::model_label(request.mode),
        })
    }
}
