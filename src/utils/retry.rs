use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::warn;

use crate::config::RetryConfig;

/// Retry policy for vendor calls whose request body can be replayed
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Send `request`, replaying it on transient failures.
///
/// Streaming bodies (multipart uploads) cannot be cloned and are sent exactly once.
/// The last response is returned even when its status is still retryable, so callers
/// keep status-specific error handling.
pub async fn send_with_retry(
    request: RequestBuilder,
    policy: &RetryPolicy,
    label: &str,
) -> reqwest::Result<Response> {
    let mut attempt = 0;
    loop {
        let Some(current) = request.try_clone() else {
            return request.send().await;
        };

        let can_retry = attempt < policy.max_retries;
        match current.send().await {
            Ok(response) if can_retry && is_retryable_status(response.status()) => {
                warn!(
                    "{} returned {}, retrying (attempt {})",
                    label,
                    response.status(),
                    attempt + 1
                );
            }
            Err(err) if can_retry && is_retryable_error(&err) => {
                warn!("{} failed: {}, retrying (attempt {})", label, err, attempt + 1);
            }
            other => return other,
        }

        tokio::time::sleep(policy.backoff(attempt)).await;
        attempt += 1;
    }
}
