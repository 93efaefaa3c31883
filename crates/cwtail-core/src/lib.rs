//! cwtail-core: shared building blocks for cwtail.
//!
//! This crate holds everything the tailing engine, the remote client and the
//! CLI agree on: the [`Event`] model, the [`LogApi`](api::LogApi) contract the
//! engine polls, the bounded [`EventCache`](cache::EventCache), time-expression
//! parsing and the layered configuration.
//!
//! # Architecture
//!
//! ```text
//! RateCoordinator ──tick──► SourceTailer ×N ──► OutputMerger ──► CLI
//!                               │    ▲
//!                         LogApi│    │EventCache / SourceSet
//!                               ▼    │
//!                          remote log API
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use api::{FilterPage, FilterQuery, LogApi};
pub use cache::EventCache;
pub use error::{ApiError, SpecError, TimeParseError};
pub use types::{Event, SourceSpec, StreamInfo};
