//! Test builders: ergonomic constructors for events, sources and sessions.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use cwtail_core::{Event, SourceSpec, StreamInfo};
use cwtail_engine::{SessionConfig, TailHandle};

use super::fixtures::TEN_AM;

// ---------------------------------------------------------------------------
// EventBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Event`] test fixtures.
///
/// # Example
///
/// ```rust
/// let event = EventBuilder::new("a")
///     .group("payments")
///     .stream("web-1")
///     .at(TEN_AM + MINUTE)
///     .message("charge accepted")
///     .build();
/// ```
pub struct EventBuilder {
    event_id: String,
    timestamp: i64,
    message: Option<String>,
    group: String,
    stream: String,
}

impl EventBuilder {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp: TEN_AM,
            message: None,
            group: "app".to_string(),
            stream: "web-1".to_string(),
        }
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    /// The message defaults to `event <id>`.
    pub fn build(self) -> Event {
        Event {
            message: self
                .message
                .unwrap_or_else(|| format!("event {}", self.event_id)),
            event_id: self.event_id,
            timestamp: self.timestamp,
            group: self.group,
            stream: self.stream,
        }
    }
}

// ---------------------------------------------------------------------------
// Small constructors
// ---------------------------------------------------------------------------

pub fn stream(name: &str, created_ms: i64) -> StreamInfo {
    StreamInfo {
        name: name.to_string(),
        created_ms,
    }
}

/// Parse `group[:prefix]` arguments.
pub fn sources(args: &[&str]) -> Vec<SourceSpec> {
    args.iter()
        .map(|a| a.parse().expect("valid source spec"))
        .collect()
}

/// The 10:00–10:05 window used by most bounded scenarios.
pub fn five_minute_window() -> SessionConfig {
    SessionConfig::bounded(TEN_AM, TEN_AM + 5 * super::fixtures::MINUTE)
}

/// Receive until the merged channel closes.
pub async fn collect_all(handle: &mut TailHandle) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = handle.recv().await {
        events.push(event);
    }
    events
}

/// Receive exactly `n` events.
pub async fn collect_n(handle: &mut TailHandle, n: usize) -> Vec<Event> {
    let mut events = Vec::with_capacity(n);
    while events.len() < n {
        match handle.recv().await {
            Some(event) => events.push(event),
            None => panic!("merged channel closed after {} of {n} events", events.len()),
        }
    }
    events
}
