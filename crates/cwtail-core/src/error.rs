//! Error types for cwtail-core.

use thiserror::Error;

/// Errors returned by a [`LogApi`](crate::api::LogApi) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The remote API rejected the request because the rate limit was hit.
    #[error("rate exceeded: {0}")]
    Throttled(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("remote error {status} ({code}): {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether this error is a rate-limit rejection eligible for a retry.
    pub fn is_throttling(&self) -> bool {
        matches!(self, ApiError::Throttled(_))
    }
}

/// A `group[:prefix]` argument that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("missing log group name in {0:?}")]
    EmptyGroup(String),
}

/// A start/end time expression that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("can't parse {input:?} as a valid date/time")]
pub struct TimeParseError {
    pub input: String,
}
