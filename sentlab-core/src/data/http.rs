//! Blocking HTTP transport shared by the concrete sources.
//!
//! Handles the circuit breaker, bounded retries with exponential backoff for
//! transient failures (connect/timeout, 429, 5xx), and the mapping of HTTP
//! failures onto [`DataError`]. Anything else (2xx and the remaining 4xx) is
//! handed back to the source, which knows how its upstream reports "nothing
//! here" versus "broken".

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;

/// Transport settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// A response that got past the transport-level checks.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx reply, or `SourceUnavailable`.
    pub fn into_success(self, what: &str) -> Result<String, DataError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(DataError::SourceUnavailable(format!(
                "HTTP {} for {what}",
                self.status
            )))
        }
    }

    pub fn json<T: DeserializeOwned>(&self, what: &str) -> Result<T, DataError> {
        serde_json::from_str(&self.body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {what}: {e}"))
        })
    }
}

/// Shared blocking client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DataError::SourceUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: config.max_retries,
            base_delay: config.base_delay,
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// GET `url` with query parameters and an optional bearer token.
    pub fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
        what: &str,
    ) -> Result<HttpReply, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(what, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let mut request = self.client.get(url).query(query);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let resp = match request.send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(what, error = %e, "transient network failure");
                    last_error = Some(DataError::SourceUnavailable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::SourceUnavailable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(format!(
                    "{what} rejected the credentials"
                )));
            }

            if status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::SourceUnavailable(format!("HTTP {status} for {what}")));
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| DataError::SourceUnavailable(format!("failed to read body for {what}: {e}")))?;
            self.circuit_breaker.record_success();
            return Ok(HttpReply {
                status: status.as_u16(),
                body,
            });
        }

        Err(last_error.unwrap_or_else(|| DataError::SourceUnavailable("max retries exceeded".into())))
    }
}
