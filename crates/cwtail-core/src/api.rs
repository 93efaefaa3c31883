//! The remote log-query contract.
//!
//! The engine only ever talks to the remote service through [`LogApi`]. The
//! HTTP binding lives in `cwtail-remote`; tests use the scripted mock in
//! `cwtail-engine`.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{Event, StreamInfo};

/// The remote API will not accept more stream names than this in one query.
pub const MAX_QUERY_STREAMS: usize = 100;

/// Parameters of one paged filter query.
///
/// A query is re-issued unchanged when a throttled request is retried, so it
/// is a plain value that can be cloned and compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub group: String,
    /// Stream names to restrict the query to. `None` queries every stream.
    pub streams: Option<Vec<String>>,
    /// Inclusive lower bound, milliseconds since the epoch.
    pub start_ms: i64,
    /// Upper bound, omitted while following.
    pub end_ms: Option<i64>,
    /// Server-side inclusion pattern.
    pub pattern: Option<String>,
    /// Ask the server to interleave streams by time.
    pub interleaved: bool,
}

/// One page of a filter query result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPage {
    pub events: Vec<Event>,
    /// Token for the next page. `None` marks the last page.
    pub next_token: Option<String>,
}

impl FilterPage {
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

/// Operations the tailing engine and the CLI need from the remote service.
#[async_trait]
pub trait LogApi: Send + Sync {
    /// Fetch one page of events matching `query`, starting at `next_token`
    /// (`None` for the first page).
    async fn filter_events(
        &self,
        query: &FilterQuery,
        next_token: Option<String>,
    ) -> Result<FilterPage, ApiError>;

    /// List streams in `group` whose name starts with `prefix`.
    async fn list_streams(
        &self,
        group: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<StreamInfo>, ApiError>;

    /// List every log group visible to the caller.
    async fn list_groups(&self) -> Result<Vec<String>, ApiError>;
}
