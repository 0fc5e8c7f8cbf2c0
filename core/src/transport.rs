//! Request pipeline shared by every repository.
//!
//! # Design
//! `Transport` owns the only `Exchange` (and therefore the only connection
//! pool) of a client. It resolves paths against the base URL, injects the
//! JSON and bearer-token headers, replays idempotent reads on transient
//! failures with exponential backoff, maps error statuses through
//! `check_status`, and decodes the body as JSON. Writes are sent exactly once.

use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{check_status, ApiError, Result};
use crate::http::{Exchange, HttpMethod, HttpRequest, HttpResponse, UreqExchange};

/// Upper bound for a single backoff or `Retry-After` delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Retry settings for idempotent reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
}

impl RetryPolicy {
    /// 429 and every 5xx are worth replaying.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.backoff_factor
            .saturating_mul(1u32 << shift)
            .min(MAX_BACKOFF)
    }
}

pub struct Transport {
    base_url: String,
    headers: Vec<(String, String)>,
    retry: RetryPolicy,
    exchange: RwLock<Option<Arc<dyn Exchange>>>,
}

impl Transport {
    /// Build a transport with a pooled `UreqExchange`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_exchange(config, Arc::new(UreqExchange::new(config.timeout, config.max_body_size))))
    }

    /// Build a transport around a caller-provided exchange.
    pub fn with_exchange(config: &ClientConfig, exchange: Arc<dyn Exchange>) -> Self {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", config.api_key)),
            ("User-Agent".to_string(), config.user_agent.clone()),
        ];
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_factor: config.backoff_factor,
            },
            exchange: RwLock::new(Some(exchange)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send one logical request and return the decoded JSON body.
    ///
    /// An empty body decodes to an empty object. `headers` override the
    /// defaults with the same name.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Value> {
        let exchange = self.exchange()?;
        let request = self.build_request(method, path, query, body, headers)?;
        let response = self.execute_with_retry(exchange.as_ref(), &request)?;
        check_status(&response)?;
        decode_body(&response)
    }

    pub fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.request(HttpMethod::Get, path, query, None, &[])
    }

    pub fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(HttpMethod::Post, path, &[], body, &[])
    }

    pub fn put(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(HttpMethod::Put, path, &[], body, &[])
    }

    pub fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(HttpMethod::Patch, path, &[], body, &[])
    }

    pub fn delete(&self, path: &str) -> Result<Value> {
        self.request(HttpMethod::Delete, path, &[], None, &[])
    }

    /// Release the exchange and its connection pool. Safe to call repeatedly.
    pub fn close(&self) {
        let previous = self
            .exchange
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!(base_url = %self.base_url, "transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.exchange
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn exchange(&self) -> Result<Arc<dyn Exchange>> {
        self.exchange
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ApiError::Transport("client is closed".to_string()))
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        extra_headers: &[(String, String)],
    ) -> Result<HttpRequest> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(name, _)| !extra_headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        headers.extend(extra_headers.iter().cloned());

        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Transport(format!("failed to encode request body: {e}")))?;

        Ok(HttpRequest {
            method,
            url: format!("{}/{}", self.base_url, path.trim_start_matches('/')),
            query: query.to_vec(),
            headers,
            body,
        })
    }

    fn execute_with_retry(&self, exchange: &dyn Exchange, request: &HttpRequest) -> Result<HttpResponse> {
        let retries = if request.method.is_idempotent_read() {
            self.retry.max_retries
        } else {
            0
        };
        let method = request.method;
        let url = request.url.as_str();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            debug!(attempt, %method, %url, "sending HTTP request");

            match exchange.execute(request) {
                Ok(response) => {
                    let status = response.status;
                    debug!(attempt, %method, %url, status, "received HTTP response");

                    if attempt <= retries && RetryPolicy::is_retryable_status(status) {
                        let delay = retry_after(&response).unwrap_or_else(|| self.retry.backoff_delay(attempt));
                        warn!(attempt, %method, %url, status, delay_ms = delay.as_millis() as u64, "retrying after error status");
                        pause(delay);
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if attempt <= retries && err.is_transient() {
                        let delay = self.retry.backoff_delay(attempt);
                        warn!(attempt, %method, %url, error = %err, delay_ms = delay.as_millis() as u64, "retrying after network failure");
                        pause(delay);
                        continue;
                    }
                    debug!(attempt, %method, %url, error = %err, "HTTP request failed");
                    return Err(err.into());
                }
            }
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn retry_after(response: &HttpResponse) -> Option<Duration> {
    response
        .header("Retry-After")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn decode_body(response: &HttpResponse) -> Result<Value> {
    if response.body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&response.body)
        .map_err(|e| ApiError::Transport(format!("Request failed: response is not valid JSON: {e}")))
}
