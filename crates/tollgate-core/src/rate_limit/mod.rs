//! Token bucket rate limiting
//!
//! Continuous-refill token buckets keyed by client, with per-call rate and
//! burst overrides supplied by the classifier.

mod bucket;
mod limiter;

pub use bucket::{BucketState, Decision, Overrides};
pub use limiter::{LimiterStats, TokenBucket};

// vim: ts=4
