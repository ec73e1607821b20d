//! Error types for the client data layer
//!
//! Every failure that leaves the request layer is classified into a coarse
//! kind so the presentation layer can handle it uniformly. The cache layer
//! itself never produces errors: misses, expired entries, and absent keys
//! are ordinary return values.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// == Error Kind ==
/// Coarse classification of a request-layer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connectivity problems, timeouts, and 5xx responses
    Network,
    /// Authentication failure (401)
    Auth,
    /// Rate limit exceeded (429)
    RateLimit,
    /// Input rejected by a collaborator (e.g. an edge function)
    Validation,
    /// Anything that fits none of the above
    Unknown,
}

impl ErrorKind {
    /// Short human-readable message suitable for a transient notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Network error, check your connection",
            ErrorKind::Auth => "Please log in again",
            ErrorKind::RateLimit => "Rate limit exceeded, wait a moment",
            ErrorKind::Validation => "The request was rejected, check your input",
            ErrorKind::Unknown => "Something went wrong, please try again",
        }
    }

    /// Whether the failure should be presented as blocking.
    ///
    /// Rate limiting is transient by nature and gets a shorter,
    /// non-alarming display.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ErrorKind::RateLimit)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Validation => "validation",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// == Api Error ==
/// A classified request-layer error.
///
/// Carries the kind, a descriptive message, and free-form diagnostic
/// context attached at the failure site (endpoint, method, parameters).
/// The context is for logging only and is never persisted.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct ApiError {
    /// Coarse classification driving uniform handling
    pub kind: ErrorKind,
    /// Human-readable description of what failed
    pub message: String,
    /// Diagnostic key/value pairs attached at the throw site
    pub context: BTreeMap<String, String>,
}

impl ApiError {
    /// Creates a new error with empty context.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attaches a diagnostic key/value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// A request that exceeded its deadline.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Network, "timeout")
    }

    /// Maps an HTTP status code to an error.
    ///
    /// 401 is an authentication failure, 429 a rate limit, anything in the
    /// 5xx range a backend-side network problem. Every other non-success
    /// status is left unclassified with its status text.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 => Self::new(ErrorKind::Auth, body),
            429 => Self::new(ErrorKind::RateLimit, body),
            s if s >= 500 => Self::new(ErrorKind::Network, body),
            s => Self::new(
                ErrorKind::Unknown,
                format!(
                    "HTTP {} {}: {}",
                    s,
                    status.canonical_reason().unwrap_or("error"),
                    body
                ),
            ),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout();
        }
        Self::new(ErrorKind::Network, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Unknown, format!("malformed response: {}", err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the request layer.
pub type Result<T> = std::result::Result<T, ApiError>;
