//! The shared rate-limit clock.
//!
//! One [`RateCoordinator`] per session owns a single periodic clock and a
//! registry of per-tailer trigger channels. Every tick is offered to every
//! registered tailer with a non-blocking send into a single-slot channel, so a
//! tailer can never be handed more than one pending permission to poll and
//! the aggregate query rate is bounded by one attempt per tick per source.
//!
//! Tailers register through [`RateCoordinator::register`] and get a
//! [`Trigger`]; dropping the trigger removes the registration, so a tailer
//! that finishes takes itself off the clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Registry key of one trigger channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(u64);

struct Registration {
    label: String,
    tx: mpsc::Sender<Instant>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    triggers: HashMap<TriggerId, Registration>,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Triggers that received the tick.
    pub delivered: usize,
    /// Triggers whose slot was still full (tailer busy); the tick was dropped.
    pub skipped: usize,
    /// Triggers whose tailer had gone away and were pruned.
    pub pruned: usize,
}

/// Owns the session clock and the trigger registry. Cheap to clone.
#[derive(Clone, Default)]
pub struct RateCoordinator {
    registry: Arc<Mutex<Registry>>,
}

impl RateCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new single-capacity trigger channel.
    pub fn register(&self, label: impl Into<String>) -> Trigger {
        let (tx, rx) = mpsc::channel(1);
        let mut registry = self.lock();
        let id = TriggerId(registry.next_id);
        registry.next_id += 1;
        registry.triggers.insert(
            id,
            Registration {
                label: label.into(),
                tx,
            },
        );
        Trigger {
            id,
            rx,
            coordinator: self.clone(),
        }
    }

    /// Remove a trigger. Returns `false` if it was not registered.
    pub fn remove(&self, id: TriggerId) -> bool {
        let removed = self.lock().triggers.remove(&id);
        if let Some(reg) = &removed {
            tracing::debug!(source = %reg.label, "trigger removed");
        }
        removed.is_some()
    }

    /// Number of registered triggers.
    pub fn len(&self) -> usize {
        self.lock().triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offer one tick to every registered trigger.
    pub fn tick(&self, at: Instant) -> TickReport {
        let mut report = TickReport::default();
        let mut registry = self.lock();
        registry.triggers.retain(|_, reg| match reg.tx.try_send(at) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(source = %reg.label, "still tailing, skip polling");
                report.skipped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                report.pruned += 1;
                false
            }
        });
        report
    }

    /// Start the clock. Ticks every `every` until `cancel` fires; ticks that
    /// fall behind are skipped rather than bunched up.
    pub fn start(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut clock = tokio::time::interval(every);
            clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    // Stamped on delivery; a late clock must not look stale.
                    _ = clock.tick() => {
                        coordinator.tick(Instant::now());
                    }
                }
            }
            tracing::debug!("rate clock stopped");
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Receiving end of one tailer's trigger channel. Unregisters on drop.
pub struct Trigger {
    id: TriggerId,
    rx: mpsc::Receiver<Instant>,
    coordinator: RateCoordinator,
}

impl Trigger {
    pub fn id(&self) -> TriggerId {
        self.id
    }

    /// Wait for the next tick. `None` once the registration is gone.
    pub async fn recv(&mut self) -> Option<Instant> {
        self.rx.recv().await
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        self.coordinator.remove(self.id);
    }
}
