//! Scripted in-memory [`LogApi`] for tests and demos.
//!
//! `MockLogApi` serves two kinds of answers to `filter_events`:
//!
//! - **Scripted** pages queued per group with [`MockLogApi::queue_page`] /
//!   [`MockLogApi::queue_error`]. Each call consumes one, in order.
//! - **Stored** events pushed with [`MockLogApi::push_event`]. When a group's
//!   script is empty, a query is answered from the store: every event in the
//!   group whose stream, start and end bounds match, sorted by timestamp, as a
//!   single last page.
//!
//! Every call is recorded, and concurrent calls per group are counted so tests
//! can assert that no source ever had two queries in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cwtail_core::{ApiError, Event, FilterPage, FilterQuery, LogApi, StreamInfo};

#[derive(Default)]
struct MockState {
    groups: Vec<String>,
    streams: HashMap<String, Vec<StreamInfo>>,
    events: HashMap<String, Vec<Event>>,
    script: HashMap<String, VecDeque<Result<FilterPage, ApiError>>>,
    calls: Vec<(FilterQuery, Option<String>)>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// In-memory stand-in for the remote log API.
#[derive(Default)]
pub struct MockLogApi {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockLogApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `filter_events` call take `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn add_group(&self, group: &str) {
        let mut state = self.lock();
        if !state.groups.iter().any(|g| g == group) {
            state.groups.push(group.to_string());
        }
    }

    /// Replace the streams listed for `group`.
    pub fn set_streams(&self, group: &str, streams: Vec<StreamInfo>) {
        self.add_group(group);
        self.lock().streams.insert(group.to_string(), streams);
    }

    /// Store an event to be served by matching queries.
    pub fn push_event(&self, event: Event) {
        self.add_group(&event.group);
        self.lock()
            .events
            .entry(event.group.clone())
            .or_default()
            .push(event);
    }

    /// Queue a scripted page for the next query against `group`.
    pub fn queue_page(&self, group: &str, events: Vec<Event>, next_token: Option<&str>) {
        self.add_group(group);
        self.lock()
            .script
            .entry(group.to_string())
            .or_default()
            .push_back(Ok(FilterPage {
                events,
                next_token: next_token.map(str::to_string),
            }));
    }

    /// Queue a scripted failure for the next query against `group`.
    pub fn queue_error(&self, group: &str, error: ApiError) {
        self.add_group(group);
        self.lock()
            .script
            .entry(group.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Every `filter_events` call so far, with the page token it asked for.
    pub fn calls(&self) -> Vec<(FilterQuery, Option<String>)> {
        self.lock().calls.clone()
    }

    /// Number of `filter_events` calls against `group`.
    pub fn call_count(&self, group: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(q, _)| q.group == group)
            .count()
    }

    /// Highest number of concurrent `filter_events` calls seen for `group`.
    pub fn max_in_flight(&self, group: &str) -> usize {
        self.lock().max_in_flight.get(group).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn answer(&self, query: &FilterQuery) -> Result<FilterPage, ApiError> {
        let mut state = self.lock();
        if let Some(scripted) = state.script.get_mut(&query.group).and_then(VecDeque::pop_front) {
            return scripted;
        }
        let mut events: Vec<Event> = state
            .events
            .get(&query.group)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp >= query.start_ms)
                    .filter(|e| query.end_ms.is_none_or(|end| e.timestamp <= end))
                    .filter(|e| {
                        query
                            .streams
                            .as_ref()
                            .is_none_or(|streams| streams.contains(&e.stream))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by_key(|e| e.timestamp);
        Ok(FilterPage {
            events,
            next_token: None,
        })
    }
}

#[async_trait]
impl LogApi for MockLogApi {
    async fn filter_events(
        &self,
        query: &FilterQuery,
        next_token: Option<String>,
    ) -> Result<FilterPage, ApiError> {
        {
            let mut state = self.lock();
            state.calls.push((query.clone(), next_token));
            let n = {
                let n = state.in_flight.entry(query.group.clone()).or_default();
                *n += 1;
                *n
            };
            let max = state.max_in_flight.entry(query.group.clone()).or_default();
            *max = (*max).max(n);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let answer = self.answer(query);

        if let Some(n) = self.lock().in_flight.get_mut(&query.group) {
            *n = n.saturating_sub(1);
        }
        answer
    }

    async fn list_streams(
        &self,
        group: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<StreamInfo>, ApiError> {
        let state = self.lock();
        Ok(state
            .streams
            .get(group)
            .map(|streams| {
                streams
                    .iter()
                    .filter(|s| prefix.is_none_or(|p| s.name.starts_with(p)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_groups(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.lock().groups.clone())
    }
}
