//! cwtail-engine: the concurrent tailing engine.
//!
//! A [`TailSession`] runs one [`SourceTailer`] per `group[:prefix]` source.
//! All tailers share a single [`RateCoordinator`] clock, so the aggregate
//! query rate stays under the remote API's limit no matter how many sources
//! are tailed. Prefixed sources keep their stream list current through a
//! [`SourceSetResolver`]. Every tailer writes to its own channel and the
//! [`OutputMerger`] fans them into one stream for the caller.

pub mod coordinator;
pub mod error;
pub mod merger;
pub mod mock;
pub mod resolver;
pub mod session;
pub mod tailer;

pub use coordinator::{RateCoordinator, Trigger};
pub use error::TailError;
pub use merger::OutputMerger;
pub use mock::MockLogApi;
pub use resolver::SourceSetResolver;
pub use session::{SessionConfig, SessionReport, TailHandle, TailSession};
pub use tailer::{SourceTailer, TailerState};
