//! imgbb image relay.
//!
//! Some provider revisions refuse inline base64 and want a dereferenceable
//! URL. This client uploads the user's image to imgbb and hands back the
//! public HTTPS URL. Any failure here is a hard failure for the calling
//! adapter.

use base64::Engine;
use serde::Deserialize;
use tracing::info;

use vgen_models::UploadedImage;

use crate::error::{ProviderError, ProviderResult};

pub const DEFAULT_BASE_URL: &str = "https://api.imgbb.com";

/// imgbb upload client.
#[derive(Clone)]
pub struct ImageHostClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(default)]
    url: Option<String>,
}

impl ImageHostClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Upload an image and return its public URL.
    pub async fn upload(&self, image: &UploadedImage) -> ProviderResult<String> {
        let url = format!("{}/1/upload", self.base_url);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

        let form = reqwest::multipart::Form::new().text("image", encoded);

        info!(size = image.size(), "Uploading image to relay host");
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::ImageHost(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ImageHost(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ImageHost(e.to_string()))?;

        body.data
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ProviderError::ImageHost("upload response missing data.url".to_string())
            })
    }
}
