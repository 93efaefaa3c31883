//! Fan-in of per-source output channels.
//!
//! Each source gets its own forwarding task relaying into one merged channel.
//! Once [`OutputMerger::seal`] is called, an aggregation task waits for every
//! forwarder and then drops the last merged sender, so the consumer sees the
//! channel close exactly once, after the final source finished. Sources that
//! never finish (following) keep the merged channel open.

use cwtail_core::Event;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

pub struct OutputMerger {
    tx: mpsc::Sender<Event>,
    forwarders: JoinSet<String>,
}

impl OutputMerger {
    /// Create a merger and the consumer end of its merged channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                forwarders: JoinSet::new(),
            },
            rx,
        )
    }

    /// Start relaying one source's output.
    pub fn add(&mut self, label: impl Into<String>, mut rx: mpsc::Receiver<Event>) {
        let label = label.into();
        let tx = self.tx.clone();
        self.forwarders.spawn(async move {
            while let Some(event) = rx.recv().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            label
        });
    }

    /// Number of sources added so far.
    pub fn len(&self) -> usize {
        self.forwarders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forwarders.is_empty()
    }

    /// Stop accepting sources and close the merged channel once every
    /// forwarder has finished.
    pub fn seal(self) -> JoinHandle<()> {
        let OutputMerger { tx, mut forwarders } = self;
        tokio::spawn(async move {
            let mut remaining = forwarders.len();
            while let Some(done) = forwarders.join_next().await {
                remaining -= 1;
                match done {
                    Ok(label) => tracing::debug!(source = %label, remaining, "source output closed"),
                    Err(e) => tracing::warn!(error = %e, remaining, "forwarder ended abnormally"),
                }
            }
            tracing::debug!("closing merged output");
            drop(tx);
        })
    }
}
