//! Error types for the bookkeeping API client.
//!
//! # Design
//! Responses with status >= 400 become `ApiError::Status`, which keeps the
//! raw response for diagnostics and classifies the status into a
//! `StatusKind`. Network-level, decoding and construction failures get their
//! own variants and carry no status. Every variant renders as
//! `[<status>] <message>` when a status is known, else as `<message>`.

use serde_json::Value;

use crate::http::{ExchangeError, HttpResponse};

pub type Result<T> = std::result::Result<T, ApiError>;

/// Classification of an error status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    /// 400
    BadRequest,
    /// 401, the API key was rejected.
    Authentication,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 422, with field errors from the response body.
    Validation { errors: Vec<String> },
    /// 429, with the raw `Retry-After` header value if the server sent one.
    RateLimited { retry_after: Option<String> },
    /// 500-599
    Server,
    /// Any other status >= 400.
    Api,
}

/// A response with an error status, decoded into a typed failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[{status}] {message}")]
pub struct StatusError {
    pub kind: StatusKind,
    pub status: u16,
    pub message: String,
    pub response: HttpResponse,
}

/// Errors returned by the transport, repositories and client facade.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Status(Box<StatusError>),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Connection(String),

    /// Any other failure to complete the round trip or decode its body.
    #[error("{0}")]
    Transport(String),

    /// The wire object does not fit the entity's declared fields.
    #[error("failed to parse {kind}: {reason} (received keys: {received:?}; expected fields: {expected:?})")]
    ModelParsing {
        kind: &'static str,
        received: Vec<String>,
        expected: Vec<&'static str>,
        reason: String,
    },

    /// The endpoint answered without the data the call needs.
    #[error("{0}")]
    EmptyResponse(String),

    #[error("{0}")]
    Config(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(err) => Some(err.status),
            _ => None,
        }
    }

    pub fn status_kind(&self) -> Option<&StatusKind> {
        match self {
            ApiError::Status(err) => Some(&err.kind),
            _ => None,
        }
    }

    /// Human-readable message without the status prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status(err) => err.message.clone(),
            other => other.to_string(),
        }
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::Status(err) => Some(&err.response),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.status_kind(), Some(StatusKind::NotFound))
    }

    /// Stable identifier for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::Status(err) => match err.kind {
                StatusKind::BadRequest => "bad_request",
                StatusKind::Authentication => "authentication",
                StatusKind::Forbidden => "forbidden",
                StatusKind::NotFound => "not_found",
                StatusKind::Validation { .. } => "validation",
                StatusKind::RateLimited { .. } => "rate_limited",
                StatusKind::Server => "server",
                StatusKind::Api => "api",
            },
            ApiError::Timeout(_) => "timeout",
            ApiError::Connection(_) => "connection",
            ApiError::Transport(_) => "transport",
            ApiError::ModelParsing { .. } => "model_parsing",
            ApiError::EmptyResponse(_) => "empty_response",
            ApiError::Config(_) => "config",
        }
    }
}

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        let message = err.to_string();
        match err {
            ExchangeError::Timeout(_) => ApiError::Timeout(message),
            ExchangeError::Connection(_) => ApiError::Connection(message),
            ExchangeError::Other(_) => ApiError::Transport(message),
        }
    }
}

/// Map an error status to the matching `ApiError`. Statuses below 400 pass.
pub fn check_status(response: &HttpResponse) -> Result<()> {
    if response.status < 400 {
        return Ok(());
    }

    let payload: Option<Value> = serde_json::from_str(&response.body).ok();
    let message = payload
        .as_ref()
        .and_then(|body| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if response.body.trim().is_empty() {
                format!("HTTP {}", response.status)
            } else {
                response.body.clone()
            }
        });

    let kind = match response.status {
        400 => StatusKind::BadRequest,
        401 => StatusKind::Authentication,
        403 => StatusKind::Forbidden,
        404 => StatusKind::NotFound,
        422 => StatusKind::Validation {
            errors: payload.as_ref().map(field_errors).unwrap_or_default(),
        },
        429 => StatusKind::RateLimited {
            retry_after: response.header("Retry-After").map(str::to_string),
        },
        500..=599 => StatusKind::Server,
        _ => StatusKind::Api,
    };

    Err(ApiError::Status(Box::new(StatusError {
        kind,
        status: response.status,
        message,
        response: response.clone(),
    })))
}

fn field_errors(body: &Value) -> Vec<String> {
    match body.get("errors") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}
