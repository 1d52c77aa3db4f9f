//! Outbound HTTP with a bounded timeout and retry on transient transport failures.

use crate::error::{OidcError, OidcResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration for outbound requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = never retry)
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,

    /// Upper bound of any single delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 50,
            backoff_multiplier: 2.0,
            max_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate the delay before retry number `attempt` (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay_ms as f64;
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms = (initial * self.backoff_multiplier.powi(exponent)).min(self.max_delay_ms as f64);

        Duration::from_millis(delay_ms.max(0.0) as u64)
    }

    /// Check if another attempt should follow `attempt` failed retries
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Timeout and retry settings shared by every outbound call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-attempt timeout in seconds
    pub timeout_seconds: u64,

    /// Optional sub-second override of the timeout, in milliseconds
    pub timeout_ms: Option<u64>,

    pub retry: RetryPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 5,
            timeout_ms: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_secs(self.timeout_seconds))
    }
}

/// HTTP client wrapper applying [`HttpSettings`] to every request
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> OidcResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| OidcError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: settings.retry.clone(),
        })
    }

    /// GET `url`; the response is returned whatever its status
    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.send_with_retry(|| {
            self.client
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
        })
        .await
    }

    /// POST `form` to `url` as `application/x-www-form-urlencoded`
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> Result<Response, reqwest::Error> {
        self.send_with_retry(|| {
            self.client
                .post(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .form(form)
        })
        .await
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<Response, reqwest::Error>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(err) if is_transient(&err) && self.retry.should_retry(attempt) => {
                    attempt += 1;
                    let delay = self.retry.calculate_delay(attempt);
                    warn!(
                        url = ?err.url().map(|u| u.as_str()),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient HTTP failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "HTTP request failed");
                    return Err(err);
                }
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Describe a transport error for operator-facing messages
pub(crate) fn describe_transport_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection"
    } else if err.is_decode() {
        "decode"
    } else {
        "request"
    };

    format!("HTTP client encountered a {kind} error. The message returned was \"{err}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_retry_delay_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 300,
        };

        assert_eq!(policy.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(300));
        assert_eq!(policy.calculate_delay(4), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry_respects_max_retries() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert!(!RetryPolicy::none().should_retry(0));
    }

    #[test]
    fn test_default_timeout_is_five_seconds() {
        let settings = HttpSettings::default();
        assert_eq!(settings.timeout(), Duration::from_secs(5));

        let settings = HttpSettings {
            timeout_ms: Some(250),
            ..HttpSettings::default()
        };
        assert_eq!(settings.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(3)
            .mount(&mock_server)
            .await;

        let settings = HttpSettings {
            timeout_ms: Some(100),
            retry: RetryPolicy {
                initial_delay_ms: 1,
                ..RetryPolicy::default()
            },
            ..HttpSettings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();

        let err = fetcher
            .get(&format!("{}/slow", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(describe_transport_error(&err).contains("timeout"));
    }

    #[tokio::test]
    async fn test_timeout_then_success_returns_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&mock_server)
            .await;

        let settings = HttpSettings {
            timeout_ms: Some(100),
            retry: RetryPolicy {
                initial_delay_ms: 1,
                ..RetryPolicy::default()
            },
            ..HttpSettings::default()
        };
        let fetcher = HttpFetcher::new(&settings).unwrap();

        let response = fetcher
            .get(&format!("{}/flaky", mock_server.uri()))
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(&HttpSettings::default()).unwrap();
        let response = fetcher
            .get(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }
}
