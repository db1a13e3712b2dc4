//! Shared data models for the VidGen broker.
//!
//! This crate defines the normalized generation request, the provider task
//! lifecycle, and the response envelope returned to clients. It carries no
//! I/O; validation here is pure so the API layer can reject bad input
//! before any network call.

pub mod limits;
pub mod request;
pub mod response;
pub mod task;

pub use limits::*;
pub use request::{
    GenerationMode, GenerationRequest, Resolution, UploadedImage, ValidationError, VideoRatio,
};
pub use response::{DemoReason, GenerationResponse};
pub use task::TaskState;
