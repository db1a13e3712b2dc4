//! Normalized generation request and its validation.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limits::*;

/// Generation mode: prompt-only or animate-an-image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Text,
    Image,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Text => "text",
            GenerationMode::Image => "image",
        }
    }
}

impl FromStr for GenerationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(GenerationMode::Text),
            "image" => Ok(GenerationMode::Image),
            other => Err(ValidationError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    R720p,
    #[serde(rename = "1080p")]
    R1080p,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::R720p => "720p",
            Resolution::R1080p => "1080p",
        }
    }
}

impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" => Ok(Resolution::R720p),
            "1080p" => Ok(Resolution::R1080p),
            other => Err(ValidationError::InvalidResolution(other.to_string())),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VideoRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl VideoRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoRatio::Landscape => "16:9",
            VideoRatio::Portrait => "9:16",
        }
    }
}

impl FromStr for VideoRatio {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16:9" => Ok(VideoRatio::Landscape),
            "9:16" => Ok(VideoRatio::Portrait),
            other => Err(ValidationError::InvalidRatio(other.to_string())),
        }
    }
}

impl fmt::Display for VideoRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image uploaded through the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl UploadedImage {
    /// Encode the image as a `data:` URL for providers that accept inline
    /// payloads.
    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.content_type, encoded)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A validated video generation request.
///
/// Build one from raw form fields, then call [`GenerationRequest::validate`]
/// before handing it to any provider adapter.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    pub text_prompt: Option<String>,
    pub motion_prompt: Option<String>,
    pub image: Option<UploadedImage>,
    pub resolution: Resolution,
    pub video_ratio: VideoRatio,
    pub duration_secs: u32,
    /// Audio track was attached by the client. Accepted but not forwarded;
    /// no current provider consumes it.
    pub has_audio: bool,
}

impl GenerationRequest {
    /// The prompt the active mode cares about.
    pub fn prompt(&self) -> &str {
        match self.mode {
            GenerationMode::Text => self.text_prompt.as_deref().unwrap_or(""),
            GenerationMode::Image => self.motion_prompt.as_deref().unwrap_or(""),
        }
    }

    /// Check every constraint in order, returning the first violation.
    ///
    /// Pure: no I/O, no mutation. The API layer maps the error to a 400
    /// before any provider is contacted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_content()?;

        if self.duration_secs < MIN_DURATION_SECS || self.duration_secs > MAX_DURATION_SECS {
            return Err(ValidationError::InvalidDuration {
                min: MIN_DURATION_SECS,
                max: MAX_DURATION_SECS,
            });
        }

        Ok(())
    }

    /// The mode-specific half of [`validate`](Self::validate): prompt and
    /// image constraints only. The API layer runs this before it parses
    /// the remaining option fields so violations are reported in form
    /// order.
    pub fn validate_content(&self) -> Result<(), ValidationError> {
        match self.mode {
            GenerationMode::Text => {
                let prompt = self.text_prompt.as_deref().unwrap_or("");
                if prompt.trim().is_empty() {
                    return Err(ValidationError::MissingTextPrompt);
                }
                if prompt.chars().count() > MAX_TEXT_PROMPT_LEN {
                    return Err(ValidationError::TextPromptTooLong(MAX_TEXT_PROMPT_LEN));
                }
            }
            GenerationMode::Image => {
                let image = self.image.as_ref().ok_or(ValidationError::MissingImage)?;
                if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
                    return Err(ValidationError::InvalidImageType(
                        image.content_type.clone(),
                    ));
                }
                if image.size() > MAX_IMAGE_SIZE {
                    return Err(ValidationError::ImageTooLarge(MAX_IMAGE_SIZE / 1024 / 1024));
                }
                let prompt = self.motion_prompt.as_deref().unwrap_or("");
                if prompt.trim().is_empty() {
                    return Err(ValidationError::MissingMotionPrompt);
                }
                if prompt.chars().count() > MAX_MOTION_PROMPT_LEN {
                    return Err(ValidationError::MotionPromptTooLong(MAX_MOTION_PROMPT_LEN));
                }
            }
        }

        Ok(())
    }
}

/// A user-facing constraint violation. The message names the first failed
/// check; nothing after it is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid generation mode: {0}")]
    InvalidMode(String),

    #[error("Please enter a video description")]
    MissingTextPrompt,

    #[error("Text prompt exceeds maximum length of {0} characters")]
    TextPromptTooLong(usize),

    #[error("Please upload an image file")]
    MissingImage,

    #[error("Invalid image type: {0}. Allowed types: image/jpeg, image/png, image/webp, image/bmp")]
    InvalidImageType(String),

    #[error("Image size exceeds maximum of {0}MB")]
    ImageTooLarge(usize),

    #[error("Please enter a motion description")]
    MissingMotionPrompt,

    #[error("Motion prompt exceeds maximum length of {0} characters")]
    MotionPromptTooLong(usize),

    #[error("Invalid resolution: {0}. Allowed: 720p, 1080p")]
    InvalidResolution(String),

    #[error("Invalid video ratio: {0}. Allowed: 16:9, 9:16")]
    InvalidRatio(String),

    #[error("Invalid duration. Must be between {min}-{max} seconds")]
    InvalidDuration { min: u32, max: u32 },
}
