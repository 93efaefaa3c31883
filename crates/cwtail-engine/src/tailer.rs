//! Per-source polling state machine.
//!
//! ```text
//!            tick                throttled
//!   Idle ─────────────► Polling ───────────► Retrying
//!    ▲                   │  │  ◄──────────────  │ after retry delay
//!    │ last page,        │  │                   │ retry failed
//!    │ following         │  │ last page,        ▼
//!    └───────────────────┘  │ bounded          Done (error)
//!                           ▼
//!                        Draining ──► Done (output closed)
//! ```
//!
//! A [`SourceTailer`] waits on its [`Trigger`] for permission to poll. A tick
//! that was issued while the tailer was busy is stale and dropped, so there
//! is never more than one query per source in flight. Each poll walks every
//! page of one filter query, drops events matching the exclusion filter or
//! already in the [`EventCache`], and hands the rest to the output channel.
//! The send waits for capacity, so a slow consumer slows the poll loop down.

use std::sync::Arc;

use cwtail_core::{ApiError, Event, EventCache, FilterPage, FilterQuery, LogApi, SourceSpec};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::coordinator::Trigger;
use crate::error::TailError;
use crate::resolver::SourceSetResolver;
use crate::session::SessionConfig;

/// Observable state of a [`SourceTailer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailerState {
    Idle,
    Polling,
    Retrying,
    Draining,
    Done,
}

/// How a completed query left the tailer.
enum Flow {
    /// Every page was handed off.
    Complete,
    /// The output channel has no receiver any more.
    Closed,
}

pub struct SourceTailer {
    spec: SourceSpec,
    api: Arc<dyn LogApi>,
    config: Arc<SessionConfig>,
    cache: Arc<EventCache>,
    sources: Option<Arc<SourceSetResolver>>,
    trigger: Trigger,
    output: mpsc::Sender<Event>,
    state: watch::Sender<TailerState>,
    /// Furthest event timestamp seen; the start boundary of the next query.
    last_seen: i64,
    /// Ticks issued before this instant arrived while a poll was running.
    idle_since: Instant,
}

impl SourceTailer {
    pub fn new(
        spec: SourceSpec,
        api: Arc<dyn LogApi>,
        config: Arc<SessionConfig>,
        cache: Arc<EventCache>,
        trigger: Trigger,
        output: mpsc::Sender<Event>,
    ) -> Self {
        let sources = spec.prefix.as_ref().map(|prefix| {
            Arc::new(SourceSetResolver::new(
                Arc::clone(&api),
                spec.group.clone(),
                prefix.clone(),
                config.max_streams,
            ))
        });
        let (state, _) = watch::channel(TailerState::Idle);
        Self {
            last_seen: config.start_ms,
            spec,
            api,
            config,
            cache,
            sources,
            trigger,
            output,
            state,
            idle_since: Instant::now(),
        }
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// Subscribe to state transitions.
    pub fn state(&self) -> watch::Receiver<TailerState> {
        self.state.subscribe()
    }

    /// Drive the tailer until it finishes, fails or is cancelled.
    ///
    /// Returning drops the output sender, which closes this source's channel.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), TailError> {
        let result = self.run_inner(&cancel).await;
        self.set_state(TailerState::Done);
        match &result {
            Ok(()) => tracing::debug!(source = %self.spec, "tailer finished"),
            Err(e) => tracing::debug!(source = %self.spec, error = %e, "tailer failed"),
        }
        result
    }

    async fn run_inner(&mut self, cancel: &CancellationToken) -> Result<(), TailError> {
        let _refresh = match self.sources.clone() {
            Some(resolver) => Some(self.resolve_streams(&resolver, cancel).await?),
            None => None,
        };

        loop {
            let tick = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                tick = self.trigger.recv() => match tick {
                    Some(tick) => tick,
                    None => return Ok(()),
                },
            };
            if tick < self.idle_since {
                tracing::debug!(source = %self.spec, "still tailing, skip polling");
                continue;
            }

            let streams = match &self.sources {
                Some(resolver) => {
                    let streams = resolver.current();
                    if streams.is_empty() {
                        tracing::debug!(source = %self.spec, "no streams yet, skip polling");
                        continue;
                    }
                    Some(streams)
                }
                None => None,
            };

            let query = self.query(streams);
            self.set_state(TailerState::Polling);
            let flow = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                flow = self.poll(&query) => flow?,
            };

            match flow {
                Flow::Closed => return Ok(()),
                Flow::Complete if self.config.follow => {
                    tracing::debug!(source = %self.spec, "last page");
                    self.set_state(TailerState::Idle);
                    self.idle_since = Instant::now();
                }
                Flow::Complete => return Ok(()),
            }
        }
    }

    /// Resolve the stream set once and, when following, keep it fresh.
    ///
    /// Bounded queries fail closed on an empty set. Following sessions wait
    /// for matching streams to appear instead.
    async fn resolve_streams(
        &self,
        resolver: &Arc<SourceSetResolver>,
        cancel: &CancellationToken,
    ) -> Result<tokio_util::sync::DropGuard, TailError> {
        match resolver.refresh().await {
            Ok(n) => tracing::debug!(source = %self.spec, streams = n, "stream set resolved"),
            Err(e @ TailError::NoStreams { .. }) if self.config.follow => {
                tracing::debug!(source = %self.spec, error = %e, "waiting for streams");
            }
            Err(e) => return Err(e),
        }
        let refresh = cancel.child_token();
        if self.config.follow {
            resolver.spawn_refresh(self.config.refresh_interval, refresh.clone());
        }
        Ok(refresh.drop_guard())
    }

    fn query(&self, streams: Option<Vec<String>>) -> FilterQuery {
        FilterQuery {
            group: self.spec.group.clone(),
            streams,
            start_ms: self.last_seen,
            end_ms: if self.config.follow {
                None
            } else {
                self.config.end_ms
            },
            pattern: self.config.include.clone(),
            interleaved: true,
        }
    }

    /// Run `query`, retrying it once after a throttling rejection.
    async fn poll(&mut self, query: &FilterQuery) -> Result<Flow, TailError> {
        match self.fetch_all(query).await {
            Err(e) if e.is_throttling() => {
                tracing::warn!(
                    group = %self.spec.group,
                    delay_ms = self.config.retry_delay.as_millis() as u64,
                    "rate exceeded, retrying once"
                );
                self.set_state(TailerState::Retrying);
                tokio::time::sleep(self.config.retry_delay).await;
                self.set_state(TailerState::Polling);
                self.fetch_all(query)
                    .await
                    .map_err(|e| TailError::api(&self.spec.group, e))
            }
            result => result.map_err(|e| TailError::api(&self.spec.group, e)),
        }
    }

    /// Walk every page of `query`, emitting the events that pass.
    async fn fetch_all(&mut self, query: &FilterQuery) -> Result<Flow, ApiError> {
        let mut token = None;
        loop {
            let FilterPage { events, next_token } = self.api.filter_events(query, token).await?;
            let last = next_token.is_none();
            if last && !self.config.follow {
                self.set_state(TailerState::Draining);
            }
            for event in events {
                if !self.accept(&event) {
                    continue;
                }
                if self.output.send(event).await.is_err() {
                    return Ok(Flow::Closed);
                }
            }
            if last {
                return Ok(Flow::Complete);
            }
            token = next_token;
        }
    }

    /// Apply the exclusion filter and the cache; record accepted events.
    fn accept(&mut self, event: &Event) -> bool {
        if let Some(exclude) = &self.config.exclude {
            if exclude.is_match(&event.message) {
                return false;
            }
        }
        if self.cache.has(&event.event_id) {
            tracing::debug!(event_id = %event.event_id, "already seen");
            return false;
        }
        if event.timestamp < self.last_seen {
            tracing::debug!(
                event_id = %event.event_id,
                event_ts = event.timestamp,
                last_seen = self.last_seen,
                cache_size = self.cache.size(),
                "old event"
            );
        }
        self.last_seen = self.last_seen.max(event.timestamp);
        self.cache.add(event.event_id.clone());
        true
    }

    fn set_state(&self, state: TailerState) {
        self.state.send_replace(state);
    }
}
