//! Core types for cwtail-core.
//!
//! This module defines the fundamental data structures shared across the
//! engine, the remote client and the CLI: the immutable [`Event`] produced by
//! the remote API, and the parsed [`SourceSpec`] naming what to tail.

use std::fmt;
use std::str::FromStr;

use crate::error::SpecError;

/// A single log event returned by the remote log API.
///
/// Events are never mutated after creation. Ownership moves from the tailer
/// that fetched it, through the output merger, to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Identifier assigned by the remote API, unique within a group.
    pub event_id: String,
    /// Event time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Raw message text.
    pub message: String,
    /// Log group the event was read from.
    pub group: String,
    /// Stream (sub-source) within the group.
    pub stream: String,
}

impl Event {
    /// Event time as a UTC datetime. Out-of-range timestamps map to the epoch.
    pub fn datetime(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }
}

/// A `group[:prefix]` source argument.
///
/// A missing prefix, an empty prefix or `*` all mean "every stream in the
/// group"; in that case no stream resolution happens and queries omit the
/// stream list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpec {
    pub group: String,
    pub prefix: Option<String>,
}

impl SourceSpec {
    pub fn new(group: impl Into<String>, prefix: Option<&str>) -> Self {
        Self {
            group: group.into(),
            prefix: prefix
                .filter(|p| !p.is_empty() && *p != "*")
                .map(str::to_string),
        }
    }
}

impl FromStr for SourceSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, prefix) = match s.split_once(':') {
            Some((g, p)) => (g, Some(p)),
            None => (s, None),
        };
        if group.is_empty() {
            return Err(SpecError::EmptyGroup(s.to_string()));
        }
        Ok(SourceSpec::new(group, prefix))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", self.group, prefix),
            None => write!(f, "{}", self.group),
        }
    }
}

/// A stream as reported by the stream-listing primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub name: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_ms: i64,
}
