//! Shared types, the store adapter trait, and error types for Tollgate.
//!
//! Kept separate from `tollgate-core` so store adapters can build against the
//! trait without pulling in the engine.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod error;
pub mod prelude;
pub mod store_adapter;
pub mod types;

pub use error::{Error, TgResult};
pub use types::{Classification, ClientId};

// vim: ts=4
