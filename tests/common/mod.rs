//! Shared test utilities for cwtail integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Engine-level harnesses run on the in-memory
//! `MockLogApi` with `tokio::time::pause()`; HTTP-level harnesses start a
//! [`fake_log_api::FakeLogApi`].

pub mod assertions;
pub mod builders;
pub mod fake_log_api;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
