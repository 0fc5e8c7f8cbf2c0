//! HTTP transport types and the raw I/O seam.
//!
//! # Design
//! Requests and responses are plain data. The policy layer in
//! `transport` builds `HttpRequest` values and interprets `HttpResponse`
//! values without knowing how bytes move; an `Exchange` performs exactly one
//! round trip and nothing else (no retries, no status interpretation). This
//! keeps retry and error-mapping logic deterministic and testable with a
//! scripted exchange, while `UreqExchange` does the real network work.

use std::fmt;
use std::io;
use std::time::Duration;

use ureq::Agent;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Head,
    Get,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods that are safe to replay without changing server state.
    pub fn is_idempotent_read(self) -> bool {
        matches!(self, HttpMethod::Head | HttpMethod::Get | HttpMethod::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and carries no query string; query parameters live in
/// `query` unencoded and are encoded by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Network-level failure of a single round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The request did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established or was dropped.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Other(String),
}

impl ExchangeError {
    /// Timeouts and broken connections are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Timeout(_) | ExchangeError::Connection(_))
    }
}

/// Performs exactly one HTTP round trip.
///
/// Implementations must return non-2xx responses as `Ok`; status
/// interpretation belongs to the caller. Implementations are shared across
/// threads, so any connection pool behind them must be thread-safe.
pub trait Exchange: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeError>;
}

/// `Exchange` backed by a pooled `ureq::Agent`.
pub struct UreqExchange {
    agent: Agent,
    max_body_size: u64,
}

impl UreqExchange {
    /// Responses larger than `max_body_size` bytes fail with
    /// `ExchangeError::Other`.
    pub fn new(timeout: Duration, max_body_size: u64) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, max_body_size }
    }
}

impl fmt::Debug for UreqExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqExchange").finish_non_exhaustive()
    }
}

impl Exchange for UreqExchange {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeError> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Head => prepare(self.agent.head(url), request).call(),
            HttpMethod::Get => prepare(self.agent.get(url), request).call(),
            HttpMethod::Options => prepare(self.agent.options(url), request).call(),
            HttpMethod::Delete => prepare(self.agent.delete(url), request).call(),
            HttpMethod::Post => send(prepare(self.agent.post(url), request), body),
            HttpMethod::Put => send(prepare(self.agent.put(url), request), body),
            HttpMethod::Patch => send(prepare(self.agent.patch(url), request), body),
        };
        let mut response = result.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_size)
            .read_to_string()
            .map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (name, value) in &request.query {
        builder = builder.query(name, value);
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn classify(err: ureq::Error) -> ExchangeError {
    match err {
        ureq::Error::Timeout(_) => ExchangeError::Timeout(err.to_string()),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
            ExchangeError::Connection(err.to_string())
        }
        ureq::Error::Io(ref io_err) => match io_err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                ExchangeError::Timeout(err.to_string())
            }
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ExchangeError::Connection(err.to_string()),
            _ => ExchangeError::Other(err.to_string()),
        },
        other => ExchangeError::Other(other.to_string()),
    }
}
