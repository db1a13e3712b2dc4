//! Bounded exponential backoff for provider creation calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ProviderError, ProviderResult};

/// Default attempt budget for creation calls.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay before the first retry; doubles each attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Run `op` up to `max_attempts` times with exponential backoff.
///
/// Only [`ProviderError::is_retryable`] failures are retried; auth
/// rejections and provider-reported failures surface immediately. Polling
/// loops must not go through here, they have their own fixed-interval
/// discipline.
pub async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut last_err = None;

    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                if attempt + 1 < max_attempts {
                    let delay = base_delay * 2u32.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or(ProviderError::Transient("all retry attempts failed".into())))
}
