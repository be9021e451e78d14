use crate::error::{AppError, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("marketscan/", env!("CARGO_PKG_VERSION"));

/// Build the shared reqwest client used by every service
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Retry schedule for outbound requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff before `attempt` (1-based retries), `jitter` in [0, 1)
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2f64.powi(attempt as i32 - 1) + jitter;
        self.base_delay.mul_f64(factor).min(self.max_delay)
    }
}

/// Error for a non-success response. 429 maps to `RateLimit`.
fn status_error(response: &reqwest::Response) -> AppError {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return AppError::RateLimit;
    }
    AppError::Http {
        status: status.as_u16(),
        url: response.url().to_string(),
    }
}

/// Send `request` exactly once. For calls that must not be repeated.
pub async fn send_once(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(&response))
    }
}

/// Send a request built by `build`, retrying on network errors, 429 and 5xx.
/// Other client errors are returned immediately.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    label: &str,
    mut build: F,
) -> Result<reqwest::Response>
where
    F: FnMut() -> reqwest::RequestBuilder,
{
    let mut last_error = AppError::Network(format!("{}: no attempt made", label));

    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt, rand::random::<f64>());
            debug!("{}: retry {} in {:?}", label, attempt, delay);
            sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                if response.status().is_success() {
                    return Ok(response);
                }

                let error = status_error(&response);
                if !error.is_retryable() {
                    return Err(error);
                }
                warn!("{}: attempt {} failed: {}", label, attempt + 1, error);
                last_error = error;
            }
            Err(e) => {
                let error = AppError::from(e);
                warn!("{}: attempt {} failed: {}", label, attempt + 1, error);
                if !error.is_retryable() {
                    return Err(error);
                }
                last_error = error;
            }
        }
    }

    Err(last_error)
}

/// Sliding one-minute window limiter
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: usize,
    request_times: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute: per_minute.max(1) as usize,
            request_times: VecDeque::new(),
        }
    }

    /// How long the next request has to wait, given the current time
    fn wait_time(&mut self, now: Instant) -> Duration {
        let window = Duration::from_secs(60);
        while let Some(oldest) = self.request_times.front() {
            if now.duration_since(*oldest) >= window {
                self.request_times.pop_front();
            } else {
                break;
            }
        }

        if self.request_times.len() < self.per_minute {
            return Duration::ZERO;
        }

        self.request_times
            .front()
            .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO)
    }

    pub async fn acquire(&mut self) {
        let wait = self.wait_time(Instant::now());
        if !wait.is_zero() {
            debug!("Rate limit reached, waiting {:?}", wait);
            sleep(wait + Duration::from_millis(100)).await;
        }
        self.request_times.push_back(Instant::now());
    }
}
