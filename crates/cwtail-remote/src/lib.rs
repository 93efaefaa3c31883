//! cwtail-remote: HTTP implementation of the remote log API.
//!
//! [`HttpLogApi`] speaks a small JSON-over-HTTP/1.1 protocol:
//!
//! | Call | Path |
//! |------|------|
//! | list groups | `POST {endpoint}/groups:list` |
//! | list streams | `POST {endpoint}/streams:list` |
//! | filter events | `POST {endpoint}/events:filter` |
//!
//! Region and profile selection travel in the `X-Log-Region` and
//! `X-Log-Profile` headers. The wire types live in [`wire`].

pub mod client;
pub mod error;
pub mod wire;

pub use client::{HttpLogApi, PROFILE_HEADER, REGION_HEADER};
pub use error::RemoteError;
