//! Video generation endpoint.
//!
//! Parses the multipart form, validates it in field order, and hands the
//! normalized request to the orchestrator. Validation failures are 400s;
//! provider failures never surface here, they come back as demo responses.

use std::time::Instant;

use axum::extract::multipart::Multipart;
use axum::extract::State;
use axum::Json;
use tracing::info;

use vgen_models::{
    GenerationMode, GenerationRequest, GenerationResponse, Resolution, UploadedImage,
    ValidationError, VideoRatio,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Raw multipart fields before validation.
#[derive(Default)]
struct RawForm {
    mode: Option<String>,
    text_prompt: Option<String>,
    motion_prompt: Option<String>,
    image: Option<UploadedImage>,
    resolution: Option<String>,
    video_ratio: Option<String>,
    duration: Option<String>,
    has_audio: bool,
}

/// `POST /api/generate-video`
pub async fn generate_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<GenerationResponse>> {
    let raw = read_form(multipart).await?;
    let request = validate_form(raw)?;

    info!(
        mode = %request.mode,
        resolution = %request.resolution,
        ratio = %request.video_ratio,
        duration = request.duration_secs,
        "Generation request accepted"
    );

    let start = Instant::now();
    let response = state.generation.generate(&request).await;

    let outcome = match (response.is_demo, response.demo_reason) {
        (false, _) => "real",
        (true, Some(vgen_models::DemoReason::UpstreamFailed)) => "demo_fallback",
        (true, _) => "demo_unconfigured",
    };
    metrics::record_generation(
        &response.mode,
        &response.model,
        outcome,
        start.elapsed().as_secs_f64(),
    );

    Ok(Json(response))
}

/// Drain the multipart stream into raw fields.
///
/// Decode failures here are not user validation errors; they surface as a
/// generic 500.
async fn read_form(mut multipart: Multipart) -> ApiResult<RawForm> {
    let mut raw = RawForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal(format!("multipart decode failed: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let file_name = field.file_name().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::internal(format!("image read failed: {e}")))?;
                raw.image = Some(UploadedImage {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            "audio" => {
                // Accepted and dropped; no provider consumes it.
                let _ = field.bytes().await;
                raw.has_audio = true;
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::internal(format!("field read failed: {e}")))?;
                match name.as_str() {
                    "mode" => raw.mode = Some(value),
                    "textPrompt" => raw.text_prompt = Some(value),
                    "motionPrompt" => raw.motion_prompt = Some(value),
                    "resolution" => raw.resolution = Some(value),
                    "videoRatio" => raw.video_ratio = Some(value),
                    "duration" => raw.duration = Some(value),
                    // `model` and `isPublic` are accepted for form
                    // compatibility and ignored.
                    _ => {}
                }
            }
        }
    }

    Ok(raw)
}

/// Check constraints in form order and produce a normalized request.
///
/// Order matters for the reported error: mode, mode-specific prompt/image
/// constraints, resolution, ratio, duration.
fn validate_form(raw: RawForm) -> Result<GenerationRequest, ApiError> {
    let mode: GenerationMode = raw
        .mode
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::Validation)?;

    let mut request = GenerationRequest {
        mode,
        text_prompt: raw.text_prompt,
        motion_prompt: raw.motion_prompt,
        image: raw.image,
        resolution: Resolution::default(),
        video_ratio: VideoRatio::default(),
        duration_secs: 0,
        has_audio: raw.has_audio,
    };

    request.validate_content().map_err(ApiError::Validation)?;

    if let Some(resolution) = raw.resolution.as_deref().filter(|s| !s.is_empty()) {
        request.resolution = resolution.parse().map_err(ApiError::Validation)?;
    }
    if let Some(ratio) = raw.video_ratio.as_deref().filter(|s| !s.is_empty()) {
        request.video_ratio = ratio.parse().map_err(ApiError::Validation)?;
    }

    request.duration_secs = raw
        .duration
        .as_deref()
        .unwrap_or_default()
        .trim()
        .parse()
        .map_err(|_| {
            ApiError::Validation(ValidationError::InvalidDuration {
                min: vgen_models::MIN_DURATION_SECS,
                max: vgen_models::MAX_DURATION_SECS,
            })
        })?;

    request.validate().map_err(ApiError::Validation)?;

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(mode: &str) -> RawForm {
        RawForm {
            mode: Some(mode.to_string()),
            text_prompt: Some("A cat playing piano".to_string()),
            motion_prompt: Some("zoom in".to_string()),
            image: Some(UploadedImage {
                bytes: vec![1, 2, 3],
                content_type: "image/png".to_string(),
                file_name: None,
            }),
            resolution: Some("720p".to_string()),
            video_ratio: Some("16:9".to_string()),
            duration: Some("5".to_string()),
            has_audio: false,
        }
    }

    #[test]
    fn test_valid_text_form() {
        let request = validate_form(raw("text")).unwrap();
        assert_eq!(request.mode, GenerationMode::Text);
        assert_eq!(request.duration_secs, 5);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let mut form = raw("gif");
        form.mode = Some("gif".to_string());
        let err = validate_form(form).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_missing_mode_rejected() {
        let mut form = raw("text");
        form.mode = None;
        assert!(validate_form(form).is_err());
    }

    #[test]
    fn test_prompt_error_reported_before_resolution_error() {
        let mut form = raw("text");
        form.text_prompt = Some("  ".to_string());
        form.resolution = Some("480p".to_string());
        let err = validate_form(form).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::MissingTextPrompt)
        ));
    }

    #[test]
    fn test_bad_resolution_rejected() {
        let mut form = raw("text");
        form.resolution = Some("480p".to_string());
        let err = validate_form(form).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_bad_ratio_rejected() {
        let mut form = raw("text");
        form.video_ratio = Some("4:3".to_string());
        assert!(validate_form(form).is_err());
    }

    #[test]
    fn test_non_numeric_duration_rejected() {
        let mut form = raw("text");
        form.duration = Some("soon".to_string());
        let err = validate_form(form).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_omitted_options_get_defaults() {
        let mut form = raw("text");
        form.resolution = None;
        form.video_ratio = None;
        let request = validate_form(form).unwrap();
        assert_eq!(request.resolution, Resolution::R720p);
        assert_eq!(request.video_ratio, VideoRatio::Landscape);
    }

    #[test]
    fn test_image_mode_requires_image() {
        let mut form = raw("image");
        form.image = None;
        let err = validate_form(form).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::MissingImage)
        ));
    }

    #[test]
    fn test_image_mode_rejects_gif() {
        let mut form = raw("image");
        if let Some(image) = form.image.as_mut() {
            image.content_type = "image/gif".to_string();
        }
        let err = validate_form(form).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::InvalidImageType(_))
        ));
    }
}
