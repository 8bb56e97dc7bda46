//! Outbound JSON fetches with per-attempt timeout and exponential backoff.
//!
//! Every upstream call goes through [`FetchClient::fetch_json`] (or the typed
//! [`FetchClient::fetch`]), which delegates the retry loop to
//! [`retry_with_backoff`]. Only HTTP 429, HTTP 5xx, timeouts, and transport
//! failures are retried; any other status or an unparsable body fails at once.
//! No retry budget is shared between calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use dex_core::config::UpstreamConfig;

/// Errors produced by a single fetch, labelled with the resource that failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{label}: upstream returned HTTP {status}")]
    Status { label: String, status: u16 },

    #[error("{label}: timed out after {timeout_ms}ms")]
    Timeout { label: String, timeout_ms: u64 },

    #[error("{label}: transport error: {source}")]
    Transport {
        label: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be built, e.g. an invalid URL.
    #[error("{label}: invalid request: {source}")]
    Request {
        label: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{label}: malformed response: {message}")]
    Decode { label: String, message: String },

    #[error("{label}: unknown error")]
    Exhausted { label: String },
}

impl FetchError {
    /// 429, 5xx, timeouts, and transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            FetchError::Timeout { .. } | FetchError::Transport { .. } => true,
            FetchError::Request { .. } | FetchError::Decode { .. } | FetchError::Exhausted { .. } => {
                false
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FetchError::Status { label, .. }
            | FetchError::Timeout { label, .. }
            | FetchError::Transport { label, .. }
            | FetchError::Request { label, .. }
            | FetchError::Decode { label, .. }
            | FetchError::Exhausted { label } => label,
        }
    }
}

/// Attempt budget and timing for one logical fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub attempts: u32,
    pub base_delay: Duration,
    /// Hard limit on each attempt (send + body read).
    pub timeout: Duration,
    /// Upper bound of random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(250),
            timeout: Duration::from_millis(15_000),
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            attempts: config.attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            timeout: Duration::from_millis(config.timeout_ms),
            jitter: Duration::from_millis(config.jitter_ms),
        }
    }

    /// Delay slept before attempt `attempt` (0-indexed, only used for `attempt >= 1`):
    /// `base_delay * 2^attempt`, plus jitter when configured.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        if self.jitter.is_zero() {
            return delay;
        }
        let max_jitter = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter);
        delay.saturating_add(Duration::from_millis(jitter_ms))
    }
}

/// Run `operation` until it succeeds, fails terminally, or the attempt budget
/// runs out. Exhaustion returns the last error seen, or
/// [`FetchError::Exhausted`] when no attempt ran.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut last_error: Option<FetchError> = None;

    for attempt in 0..policy.attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            warn!(
                label,
                attempt = attempt + 1,
                attempts = policy.attempts,
                delay_ms = delay.as_millis() as u64,
                "retrying upstream fetch"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                debug!(label, error = %e, "transient upstream failure");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| FetchError::Exhausted {
        label: label.to_string(),
    }))
}

/// HTTP client for JSON resources, sharing one connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            policy,
        }
    }

    /// GET `url` and parse the body as JSON, retrying transient failures.
    pub async fn fetch_json(&self, url: &str, label: &str) -> Result<Value, FetchError> {
        retry_with_backoff(&self.policy, label, || self.attempt(url, label)).await
    }

    /// Like [`fetch_json`](Self::fetch_json), decoded into `T`. A shape
    /// mismatch is a terminal [`FetchError::Decode`].
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str, label: &str) -> Result<T, FetchError> {
        let value = self.fetch_json(url, label).await?;
        serde_json::from_value(value).map_err(|e| FetchError::Decode {
            label: label.to_string(),
            message: e.to_string(),
        })
    }

    async fn attempt(&self, url: &str, label: &str) -> Result<Value, FetchError> {
        let transport = |source: reqwest::Error| {
            let label = label.to_string();
            if source.is_builder() {
                FetchError::Request { label, source }
            } else {
                FetchError::Transport { label, source }
            }
        };

        let request = async {
            let response = self.http.get(url).send().await.map_err(transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    label: label.to_string(),
                    status: status.as_u16(),
                });
            }
            let text = response.text().await.map_err(transport)?;
            serde_json::from_str(&text).map_err(|e| FetchError::Decode {
                label: label.to_string(),
                message: e.to_string(),
            })
        };

        match tokio::time::timeout(self.policy.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                label: label.to_string(),
                timeout_ms: self.policy.timeout.as_millis() as u64,
            }),
        }
    }
}
