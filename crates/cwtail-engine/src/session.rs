//! Session wiring and supervision.
//!
//! [`TailSession::start`] builds one [`RateCoordinator`] clock and one
//! [`OutputMerger`], then spawns a [`SourceTailer`] per source. Event ids are
//! only unique within a group, so every source gets its own [`EventCache`]
//! and size check. A supervisor task joins the tailers and
//! applies the session's [`FailurePolicy`]:
//!
//! - `Abort`: the first failure cancels every sibling and fails the session.
//! - `Continue`: a failed source ends on its own, the rest keep running, and
//!   every failure is reported when the session finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cwtail_core::config::{FailurePolicy, TailConfig};
use cwtail_core::{Event, EventCache, LogApi, SourceSpec};
use regex::Regex;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::coordinator::RateCoordinator;
use crate::error::TailError;
use crate::merger::OutputMerger;
use crate::tailer::{SourceTailer, TailerState};

/// Everything a session needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Keep polling after the last page instead of finishing.
    pub follow: bool,
    /// Start of the window, milliseconds since the epoch.
    pub start_ms: i64,
    /// End of the window. Ignored while following.
    pub end_ms: Option<i64>,
    /// Server-side inclusion pattern.
    pub include: Option<String>,
    /// Messages matching this are dropped client-side.
    pub exclude: Option<Regex>,
    pub tick_interval: Duration,
    pub refresh_interval: Duration,
    pub cache_threshold: usize,
    pub cache_check_interval: Duration,
    pub retry_delay: Duration,
    pub max_streams: usize,
    pub channel_capacity: usize,
    pub failure_policy: FailurePolicy,
}

impl SessionConfig {
    /// Build a session config from the `[tail]` config section.
    pub fn from_tail_config(
        tail: &TailConfig,
        follow: bool,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Self {
        Self {
            follow,
            start_ms,
            end_ms,
            include: None,
            exclude: None,
            tick_interval: tail.tick_interval(),
            refresh_interval: tail.refresh_interval(),
            cache_threshold: tail.cache_threshold,
            cache_check_interval: tail.cache_check_interval(),
            retry_delay: tail.retry_delay(),
            max_streams: tail.max_streams.min(cwtail_core::api::MAX_QUERY_STREAMS),
            channel_capacity: tail.channel_capacity,
            failure_policy: tail.on_error,
        }
    }

    /// A window `[start_ms, end_ms]` with default tuning.
    pub fn bounded(start_ms: i64, end_ms: i64) -> Self {
        Self::from_tail_config(&TailConfig::default(), false, start_ms, Some(end_ms))
    }

    /// Follow from `start_ms` with default tuning.
    pub fn follow(start_ms: i64) -> Self {
        Self::from_tail_config(&TailConfig::default(), true, start_ms, None)
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    pub fn with_exclude(mut self, exclude: Regex) -> Self {
        self.exclude = Some(exclude);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Summary of a session that ended without source failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Number of sources the session tailed.
    pub sources: usize,
    /// Whether the session was cancelled rather than running to completion.
    pub cancelled: bool,
}

pub struct TailSession;

impl TailSession {
    /// Spawn a session tailing `specs`. Must be called inside a Tokio runtime.
    pub fn start(api: Arc<dyn LogApi>, config: SessionConfig, specs: Vec<SourceSpec>) -> TailHandle {
        let config = Arc::new(config);
        let cancel = CancellationToken::new();

        let coordinator = RateCoordinator::new();
        let (mut merger, events) = OutputMerger::new(config.channel_capacity);

        let mut tailers = JoinSet::new();
        let mut names = HashMap::new();
        let mut states = Vec::with_capacity(specs.len());
        let mut background = Vec::with_capacity(specs.len() + 2);
        for spec in specs {
            let label = spec.to_string();
            let cache = Arc::new(EventCache::new(config.cache_threshold));
            background.push(cache.spawn_size_check(config.cache_check_interval, cancel.clone()));
            let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
            let tailer = SourceTailer::new(
                spec.clone(),
                Arc::clone(&api),
                Arc::clone(&config),
                cache,
                coordinator.register(label.clone()),
                tx,
            );
            states.push((spec.clone(), tailer.state()));
            merger.add(label, rx);
            let handle = tailers.spawn(tailer.run(cancel.child_token()));
            names.insert(handle.id(), spec);
        }
        tracing::debug!(
            sources = names.len(),
            follow = config.follow,
            policy = ?config.failure_policy,
            "tail session started"
        );

        // Started after registration so the first tick reaches every tailer.
        background.push(coordinator.start(config.tick_interval, cancel.clone()));
        background.push(merger.seal());

        let supervisor = tokio::spawn(supervise(Supervisor {
            tailers,
            names,
            policy: config.failure_policy,
            cancel: cancel.clone(),
            background,
        }));

        TailHandle {
            events,
            cancel,
            supervisor,
            states,
        }
    }
}

struct Supervisor {
    tailers: JoinSet<Result<(), TailError>>,
    names: HashMap<task::Id, SourceSpec>,
    policy: FailurePolicy,
    cancel: CancellationToken,
    background: Vec<JoinHandle<()>>,
}

async fn supervise(mut sv: Supervisor) -> Result<SessionReport, TailError> {
    let sources = sv.names.len();
    let mut failures = Vec::new();

    while let Some(joined) = sv.tailers.join_next_with_id().await {
        let result = match joined {
            Ok((id, result)) => {
                sv.names.remove(&id);
                result
            }
            Err(e) => {
                let group = sv
                    .names
                    .remove(&e.id())
                    .map(|spec| spec.group)
                    .unwrap_or_default();
                Err(TailError::Aborted {
                    group,
                    reason: e.to_string(),
                })
            }
        };

        let Err(e) = result else { continue };
        match sv.policy {
            FailurePolicy::Abort => {
                if !sv.cancel.is_cancelled() {
                    tracing::debug!(error = %e, "source failed, aborting session");
                    sv.cancel.cancel();
                }
            }
            FailurePolicy::Continue => {
                tracing::warn!(error = %e, remaining = sv.tailers.len(), "source failed");
            }
        }
        failures.push(e);
    }

    let cancelled = sv.cancel.is_cancelled() && failures.is_empty();
    sv.cancel.cancel();
    for handle in sv.background {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "session task ended abnormally");
        }
    }
    tracing::debug!(sources, failed = failures.len(), cancelled, "tail session finished");

    match sv.policy {
        FailurePolicy::Abort if !failures.is_empty() => Err(failures.swap_remove(0)),
        _ if failures.len() == 1 => Err(failures.swap_remove(0)),
        _ if !failures.is_empty() => Err(TailError::Many(failures)),
        _ => Ok(SessionReport { sources, cancelled }),
    }
}

/// Caller's side of a running session.
pub struct TailHandle {
    events: mpsc::Receiver<Event>,
    cancel: CancellationToken,
    supervisor: JoinHandle<Result<SessionReport, TailError>>,
    states: Vec<(SourceSpec, watch::Receiver<TailerState>)>,
}

impl TailHandle {
    /// Next merged event. `None` once every source has finished.
    pub async fn recv(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// Stop every source. The merged channel closes once they have wound down.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Per-source state watchers, in the order the sources were given.
    pub fn states(&self) -> &[(SourceSpec, watch::Receiver<TailerState>)] {
        &self.states
    }

    /// Stop consuming and wait for the session outcome.
    ///
    /// A following session only finishes after [`TailHandle::cancel`] or once
    /// every source has failed.
    pub async fn finish(self) -> Result<SessionReport, TailError> {
        let TailHandle {
            events, supervisor, ..
        } = self;
        drop(events);
        match supervisor.await {
            Ok(outcome) => outcome,
            Err(e) => Err(TailError::Supervisor(e.to_string())),
        }
    }
}
