//! Error types for the WB client.
//!
//! Every failure of a public operation is a [`WbError`] classified by exactly
//! one [`WbErrorKind`]. Failures of collaborators that never reach a caller
//! as call results (the shared cache, configuration, registry lookups) have
//! their own small error enums.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for WB operations.
pub type WbResult<T> = Result<T, WbError>;

/// Classification of a failed WB operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WbErrorKind {
    /// The token was rejected (401) or is malformed.
    Unauthorized,
    /// Upstream kept answering 429 after local retries.
    RateLimited,
    /// Upstream kept answering 5xx after local retries.
    ServerError,
    /// Any other 4xx response.
    ClientError,
    /// The response could not be decoded or lacks required fields.
    MalformedResponse,
    /// Connection, DNS or timeout failure after local retries.
    NetworkFailure,
    /// A report job did not finish within its polling ceiling.
    JobTimeout,
    /// A downloaded report is in a format the client cannot read.
    UnsupportedFormat,
}

impl fmt::Display for WbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ServerError => write!(f, "server_error"),
            Self::ClientError => write!(f, "client_error"),
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::NetworkFailure => write!(f, "network_failure"),
            Self::JobTimeout => write!(f, "job_timeout"),
            Self::UnsupportedFormat => write!(f, "unsupported_format"),
        }
    }
}

/// WB API error with its classification and diagnostic context.
#[derive(Error, Debug)]
pub struct WbError {
    /// Error kind.
    kind: WbErrorKind,
    /// Human-readable cause.
    message: String,
    /// HTTP status code.
    status_code: Option<u16>,
    /// Delay requested by upstream via `Retry-After`.
    retry_after: Option<Duration>,
    /// Underlying cause.
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for WbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        Ok(())
    }
}

impl WbError {
    /// Creates a new WB error.
    pub fn new(kind: WbErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            retry_after: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the upstream `Retry-After` delay.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> WbErrorKind {
        self.kind
    }

    /// Gets the message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the `Retry-After` delay sent with a 429.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Returns true for the transient kinds that are retried locally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            WbErrorKind::RateLimited | WbErrorKind::ServerError | WbErrorKind::NetworkFailure
        )
    }

    /// Maps a failed HTTP status and its body to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => WbErrorKind::Unauthorized,
            429 => WbErrorKind::RateLimited,
            500..=599 => WbErrorKind::ServerError,
            _ => WbErrorKind::ClientError,
        };
        let message = match kind {
            WbErrorKind::Unauthorized => {
                "401 Unauthorized (check the API token and its scopes)".to_string()
            }
            WbErrorKind::RateLimited => {
                "429 Too Many Requests (WB limit reached, try again later)".to_string()
            }
            _ => format!("{} {}", status, shorten(body, 800)),
        };
        Self::new(kind, message).with_status(status)
    }

    // Convenience constructors

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::Unauthorized, message)
    }

    /// Creates a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::MalformedResponse, message)
    }

    /// Creates a malformed-response error carrying a payload excerpt.
    pub fn malformed_payload(message: impl fmt::Display, payload: &str) -> Self {
        Self::malformed(format!(
            "invalid JSON from WB: {}; payload: {}",
            message,
            shorten(payload, 500)
        ))
    }

    /// Creates a network failure error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::NetworkFailure, message)
    }

    /// Creates a job timeout error.
    pub fn job_timeout(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::JobTimeout, message)
    }

    /// Creates an unsupported-format error.
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::UnsupportedFormat, message)
    }

    /// Creates a client error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::ClientError, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(WbErrorKind::ServerError, message)
    }
}

/// Truncates `text` to at most `limit` characters, marking the cut with `...`.
pub fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Shared cache failures. Never surfaced to callers of public operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be encoded or decoded.
    #[error("cache value codec error: {0}")]
    Codec(String),
}

/// Configuration validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A base URL is empty or not http(s).
    #[error("invalid base URL for {name}: {value:?}")]
    InvalidBaseUrl {
        /// Which API family the URL belongs to.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
    /// Any other invalid setting.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
