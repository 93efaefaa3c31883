//! Stream-set resolution for `group:prefix` sources.
//!
//! The query primitive takes at most [`MAX_QUERY_STREAMS`] stream names, so a
//! prefix is resolved into a capped list of concrete streams before polling.
//! When more streams match than the cap allows, the most recently created
//! ones win. Following sessions refresh the list on a timer so streams
//! created or rotated after startup are picked up.
//!
//! [`MAX_QUERY_STREAMS`]: cwtail_core::api::MAX_QUERY_STREAMS

use std::sync::{Arc, RwLock};
use std::time::Duration;

use cwtail_core::{LogApi, StreamInfo};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TailError;

/// Resolves and holds the current stream set of one source.
pub struct SourceSetResolver {
    api: Arc<dyn LogApi>,
    group: String,
    prefix: String,
    max_streams: usize,
    current: RwLock<Vec<String>>,
}

impl SourceSetResolver {
    pub fn new(
        api: Arc<dyn LogApi>,
        group: impl Into<String>,
        prefix: impl Into<String>,
        max_streams: usize,
    ) -> Self {
        Self {
            api,
            group: group.into(),
            prefix: prefix.into(),
            max_streams: max_streams.max(1),
            current: RwLock::new(Vec::new()),
        }
    }

    /// Ask the remote API for the streams matching this source.
    ///
    /// Fails closed with [`TailError::NoStreams`] when nothing matches.
    pub async fn resolve(&self) -> Result<Vec<String>, TailError> {
        let streams = self
            .api
            .list_streams(&self.group, Some(&self.prefix))
            .await
            .map_err(|e| TailError::api(&self.group, e))?;

        if streams.is_empty() {
            return Err(TailError::NoStreams {
                group: self.group.clone(),
                prefix: self.prefix.clone(),
            });
        }
        Ok(newest(streams, self.max_streams))
    }

    /// Resolve and replace the current set. Returns the new set's size.
    ///
    /// On failure the current set is left untouched, except that a
    /// [`TailError::NoStreams`] empties it so no stale names get queried.
    pub async fn refresh(&self) -> Result<usize, TailError> {
        let resolved = self.resolve().await;
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        match resolved {
            Ok(streams) => {
                let n = streams.len();
                *current = streams;
                Ok(n)
            }
            Err(e) => {
                if matches!(e, TailError::NoStreams { .. }) {
                    current.clear();
                }
                Err(e)
            }
        }
    }

    /// Snapshot of the current stream set.
    pub fn current(&self) -> Vec<String> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Spawn the periodic refresh. The first refresh happens one interval
    /// from now; callers resolve once up front.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + every;
            let mut ticker = tokio::time::interval_at(start, every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match resolver.refresh().await {
                        Ok(n) => tracing::debug!(
                            group = %resolver.group,
                            prefix = %resolver.prefix,
                            streams = n,
                            "stream set refreshed"
                        ),
                        Err(e) => tracing::debug!(error = %e, "stream set refresh failed"),
                    },
                }
            }
        })
    }
}

/// Keep the `cap` most recently created streams, ordered oldest first.
pub fn newest(mut streams: Vec<StreamInfo>, cap: usize) -> Vec<String> {
    streams.sort_by_key(|s| s.created_ms);
    let skip = streams.len().saturating_sub(cap);
    streams.into_iter().skip(skip).map(|s| s.name).collect()
}
