//! Error types for cwtail-engine.

use cwtail_core::ApiError;
use thiserror::Error;

/// A terminal failure of one tailed source, or of the session as a whole.
///
/// Every per-source variant names the log group so the CLI can print a
/// diagnostic that points at the offending source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TailError {
    /// A remote call failed with a non-throttling error, or the single retry
    /// after a throttling error failed too.
    #[error("log group {group}: {source}")]
    Api {
        group: String,
        #[source]
        source: ApiError,
    },

    /// No stream in the group matches the prefix.
    #[error("log group {group}: no such log stream(s) with prefix {prefix:?}")]
    NoStreams { group: String, prefix: String },

    /// The tailer task for a group panicked or was aborted.
    #[error("log group {group}: tailer task ended abnormally: {reason}")]
    Aborted { group: String, reason: String },

    /// More than one source failed under the continue-others policy.
    #[error("{} sources failed: {}", .0.len(), join(.0))]
    Many(Vec<TailError>),

    /// The session supervisor itself panicked or was aborted.
    #[error("tail session ended abnormally: {0}")]
    Supervisor(String),
}

impl TailError {
    pub fn api(group: impl Into<String>, source: ApiError) -> Self {
        TailError::Api {
            group: group.into(),
            source,
        }
    }

    /// The group this failure belongs to, if it is a per-source failure.
    pub fn group(&self) -> Option<&str> {
        match self {
            TailError::Api { group, .. }
            | TailError::NoStreams { group, .. }
            | TailError::Aborted { group, .. } => Some(group),
            TailError::Many(_) | TailError::Supervisor(_) => None,
        }
    }
}

fn join(errors: &[TailError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
