//! Provider error taxonomy.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure modes of a provider call.
///
/// Every variant here is swallowed by the demo fallback at the API layer;
/// the taxonomy exists so retry decisions and logs stay precise.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The credential for this provider is absent or malformed.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The provider rejected our credentials (401/403). Never retried.
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Network failure, timeout, or 5xx. Retryable at creation time.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// The provider reported the generation itself failed.
    #[error("Generation failed: {0}")]
    Upstream(String),

    /// 2xx response whose body is missing expected fields.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Hugging Face cold start (503). The model needs time to load.
    #[error("Model is loading, please try again in ~20 seconds")]
    ModelLoading,

    /// The poll loop exhausted its attempt budget.
    #[error("Task timeout: video generation took too long")]
    PollTimeout,

    /// The image hosting relay failed.
    #[error("Image upload failed: {0}")]
    ImageHost(String),
}

impl ProviderError {
    /// Whether the backoff helper may retry this failure.
    ///
    /// Auth failures are terminal; retrying them only burns quota and
    /// delays the fallback.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Classify a non-2xx creation response by status code.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            ProviderError::Auth(format!("HTTP {}: {}", status.as_u16(), body))
        } else if status.is_server_error() {
            ProviderError::Transient(format!("HTTP {}: {}", status.as_u16(), body))
        } else {
            ProviderError::Upstream(format!("HTTP {}: {}", status.as_u16(), body))
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_auth_errors_are_not_retryable() {
        let err = ProviderError::from_status(StatusCode::UNAUTHORIZED, "nope".into());
        assert!(matches!(err, ProviderError::Auth(_)));
        assert!(!err.is_retryable());

        let err = ProviderError::from_status(StatusCode::FORBIDDEN, "nope".into());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = ProviderError::from_status(StatusCode::BAD_GATEWAY, "oops".into());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_client_errors_are_upstream() {
        let err = ProviderError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad".into());
        assert!(matches!(err, ProviderError::Upstream(_)));
        assert!(!err.is_retryable());
    }
}
