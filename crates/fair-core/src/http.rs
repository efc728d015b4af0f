//! Outbound HTTP for registries, repositories and link checks.
//!
//! [`HttpFetcher`] is the seam every resolver, connector and indicator uses
//! for network access. [`ReqwestFetcher`] is the production implementation:
//! transient failures (transport errors, HTTP 429, 5xx) are retried with
//! exponential backoff up to a bounded number of attempts.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::FetchError;

/// Network access used by the engine.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;

    /// GET `url` and return the body as text.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Whether `url` answers with a success status after redirects.
    ///
    /// Non-transient error statuses (e.g. 404) yield `Ok(false)`.
    async fn resolves(&self, url: &str) -> Result<bool, FetchError>;
}

/// Bounded retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        // attempt is 1-based; no delay before the first one
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.backoff_base * 2u32.saturating_pow(attempt - 2)
        }
    }
}

/// Run `op` until it succeeds, fails non-transiently, or attempts run out.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                debug!(url = %url, attempt, error = %e, "transient request failure");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(FetchError::Exhausted {
        url: url.to_string(),
        attempts: max_attempts,
        last: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Settings for [`ReqwestFetcher`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// `reqwest`-backed fetcher with bounded retries.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestFetcher {
    pub fn new(config: HttpClientConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                detail: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    async fn send(&self, url: &str, accept: &str) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        retry_with_backoff(&self.retry, url, || async {
            let response = self.send(url, "application/json").await?;
            response
                .json::<Value>()
                .await
                .map_err(|e| FetchError::Decode {
                    url: url.to_string(),
                    detail: e.to_string(),
                })
        })
        .await
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        retry_with_backoff(&self.retry, url, || async {
            let response = self.send(url, "*/*").await?;
            response.text().await.map_err(|e| FetchError::Decode {
                url: url.to_string(),
                detail: e.to_string(),
            })
        })
        .await
    }

    async fn resolves(&self, url: &str) -> Result<bool, FetchError> {
        let outcome = retry_with_backoff(&self.retry, url, || async {
            self.send(url, "*/*").await.map(|_| ())
        })
        .await;

        match outcome {
            Ok(()) => Ok(true),
            Err(FetchError::Status { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_base: Duration::from_millis(100),
        }
    }

    fn server_error() -> FetchError {
        FetchError::Status {
            url: "https://registry.test".to_string(),
            status: 503,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> =
            retry_with_backoff(&policy(5), "https://registry.test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(server_error()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match result.unwrap_err() {
            FetchError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 5);
                assert!(last.contains("503"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&policy(5), "https://registry.test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> =
            retry_with_backoff(&policy(5), "https://registry.test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(FetchError::Status {
                        url: "https://registry.test".to_string(),
                        status: 404,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().status(), Some(404));
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(5);
        assert_eq!(p.delay_before(1), Duration::ZERO);
        assert_eq!(p.delay_before(2), Duration::from_millis(100));
        assert_eq!(p.delay_before(3), Duration::from_millis(200));
        assert_eq!(p.delay_before(4), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = retry_with_backoff(&policy(0), "https://registry.test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FetchError>(()) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
