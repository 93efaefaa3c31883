//! Error types for cwtail-remote.

use thiserror::Error;

/// The client could not be built from its configuration.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}
