// Retry logic with Retry-After hint support
// Author: storecache contributors

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::time::Duration;
use tracing::debug;

/// A failed attempt. `status` is the HTTP status, or 0 when the request
/// never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// Parse a `Retry-After` header given in seconds (e.g. "40").
/// HTTP-date values are ignored. Capped at 60 seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(seconds.min(60)))
}

/// Create exponential backoff configuration for retries
pub fn create_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(500),     // Start at 500ms
        initial_interval: Duration::from_millis(500),
        randomization_factor: 0.3,                         // Add jitter
        multiplier: 2.0,                                  // Double each time
        max_interval: Duration::from_secs(10),
        max_elapsed_time: Some(Duration::from_secs(60)),
        ..Default::default()
    }
}

/// Determine if an HTTP status code is retryable
pub fn is_retryable(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Execute operation with retry on transient upstream statuses
/// - Uses the Retry-After hint if available
/// - Falls back to exponential backoff
/// - Never retries failures without a status (connection errors)
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, AttemptFailure>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AttemptFailure>>,
{
    let mut backoff = create_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(failure) => {
                if !is_retryable(failure.status) || attempt >= max_attempts {
                    return Err(failure);
                }

                let delay = match failure.retry_after {
                    Some(hint) => hint,
                    None => backoff.next_backoff().unwrap_or(Duration::from_secs(10)),
                };
                debug!(
                    "{} failed with {} (attempt {}), retrying after {}ms",
                    operation_name,
                    failure.status,
                    attempt,
                    delay.as_millis()
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
