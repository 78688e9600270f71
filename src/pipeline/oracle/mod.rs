//! Oracle: the remote text-generation service behind extraction and correction.
//!
//! The annotation stages only see the [`Oracle`] trait. Concrete backends
//! classify their failures into [`OracleError`] so the [`RetryPolicy`] can pick
//! a backoff without knowing anything about HTTP.

pub mod gemini;
pub mod ollama;
pub mod retry;

#[cfg(test)]
pub mod mock;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use retry::{call_with_retry, RetryExhausted, RetryPolicy, Sleeper, ThreadSleeper};

use thiserror::Error;

/// Classified failure of a single oracle exchange.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Oracle rate limit hit: {0}")]
    RateLimited(String),

    #[error("Oracle returned server error (status {status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Oracle transport error: {0}")]
    Transport(String),

    #[error("Oracle error: {0}")]
    Other(String),
}

/// Coarse failure class used to choose a backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleErrorKind {
    RateLimited,
    ServerError,
    TransportError,
    Other,
}

impl OracleError {
    pub fn kind(&self) -> OracleErrorKind {
        match self {
            Self::RateLimited(_) => OracleErrorKind::RateLimited,
            Self::ServerError { .. } => OracleErrorKind::ServerError,
            Self::Transport(_) => OracleErrorKind::TransportError,
            Self::Other(_) => OracleErrorKind::Other,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => Self::RateLimited(body),
            500..=599 => Self::ServerError { status, body },
            _ => Self::Other(format!("status {status}: {body}")),
        }
    }
}

impl OracleErrorKind {
    /// Rate limits, server errors and transport failures get the long linear backoff.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// A single request/response exchange with a text-generation service.
///
/// Implementations make exactly one attempt; retrying is the caller's job.
pub trait Oracle {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        require_json: bool,
    ) -> Result<String, OracleError>;

    /// Human-readable backend/model name for logs.
    fn describe(&self) -> String;
}

impl<T: Oracle + ?Sized> Oracle for &T {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        require_json: bool,
    ) -> Result<String, OracleError> {
        (**self).generate(prompt, temperature, require_json)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: Oracle + ?Sized> Oracle for Box<T> {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        require_json: bool,
    ) -> Result<String, OracleError> {
        (**self).generate(prompt, temperature, require_json)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Map a reqwest failure that happened before any status was received.
pub(crate) fn classify_send_error(e: &reqwest::Error, timeout_secs: u64) -> OracleError {
    if e.is_timeout() {
        OracleError::Transport(format!("Request timed out after {timeout_secs}s"))
    } else if e.is_connect() || e.is_request() {
        OracleError::Transport(e.to_string())
    } else {
        OracleError::Other(e.to_string())
    }
}
