//! cwtail: tail remote log groups from the terminal.
//!
//! The binary is a thin shell over this library so that integration tests can
//! drive the same code paths:
//!
//! ```text
//! cli ──► TailSession (cwtail-engine) ──► HttpLogApi (cwtail-remote)
//!  │
//!  └──► format ──► stdout
//! ```

pub mod cli;
pub mod format;
