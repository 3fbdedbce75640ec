//! Adaptive admission engine.
//!
//! Admits or rejects requests per client with a token bucket whose rate and
//! burst are overridden by a live behavioral classification, and fans every
//! decision out to any number of listeners.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod broadcast;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod engine;
pub mod memory_store;
pub mod persist;
pub mod prelude;
pub mod rate_limit;
pub mod service;
pub mod stats;
pub mod ticker;

pub use broadcast::{AdmissionEvent, Broadcaster, Listener, ListenerPoll};
pub use classifier::Signal;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{AdmissionEngine, AdmissionResult, ClientSummary, ProfileSnapshot};
pub use memory_store::MemoryStore;
pub use rate_limit::{Overrides, TokenBucket};
pub use service::AdmissionService;
pub use stats::GlobalStats;

// vim: ts=4
