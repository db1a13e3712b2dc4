//! Validation limits for generation requests.

/// Maximum length of a text-to-video prompt, in characters.
pub const MAX_TEXT_PROMPT_LEN: usize = 1000;

/// Maximum length of an image-to-video motion prompt, in characters.
pub const MAX_MOTION_PROMPT_LEN: usize = 500;

/// Maximum uploaded image size in bytes (10 MiB).
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Image MIME types accepted for image-to-video.
pub const ALLOWED_IMAGE_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/bmp"];

/// Minimum requested clip duration, in seconds.
pub const MIN_DURATION_SECS: u32 = 5;

/// Maximum requested clip duration, in seconds.
pub const MAX_DURATION_SECS: u32 = 10;
