//! Bounded set of already-emitted event ids.
//!
//! Repeated polls overlap: the start boundary of each query is the newest
//! timestamp already seen, so events at that instant come back again, and
//! the API may repeat an event across pages. [`EventCache`] remembers every id
//! emitted in the current epoch. Once it holds `threshold` ids it is cleared
//! wholesale instead of evicting entries one by one, which keeps memory bounded
//! at the cost of a short window where a recent event could be emitted again.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default number of ids kept before the cache is reset.
pub const DEFAULT_CACHE_THRESHOLD: usize = 5_000;

/// Thread-safe set of seen event ids with size-triggered reset.
#[derive(Debug)]
pub struct EventCache {
    seen: RwLock<HashSet<String>>,
    threshold: usize,
}

impl Default for EventCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_THRESHOLD)
    }
}

impl EventCache {
    pub fn new(threshold: usize) -> Self {
        Self {
            seen: RwLock::new(HashSet::new()),
            threshold: threshold.max(1),
        }
    }

    pub fn has(&self, event_id: &str) -> bool {
        self.seen
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(event_id)
    }

    pub fn add(&self, event_id: impl Into<String>) {
        self.seen
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(event_id.into());
    }

    pub fn size(&self) -> usize {
        self.seen.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop every tracked id.
    pub fn reset(&self) {
        self.seen.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Reset the cache if it has reached its threshold. Returns the size that
    /// triggered the reset.
    ///
    /// The check and the clear happen under one write lock so concurrent adds
    /// cannot slip in between.
    pub fn reset_if_full(&self) -> Option<usize> {
        let mut seen = self.seen.write().unwrap_or_else(|e| e.into_inner());
        let size = seen.len();
        if size >= self.threshold {
            seen.clear();
            Some(size)
        } else {
            None
        }
    }

    /// Spawn the periodic size check. Runs until `cancel` fires.
    pub fn spawn_size_check(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(size) = cache.reset_if_full() {
                            tracing::debug!(size, "event cache reset");
                        }
                    }
                }
            }
        })
    }
}
