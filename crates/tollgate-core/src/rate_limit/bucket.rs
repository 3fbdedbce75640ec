//! Bucket state and refill math

use std::time::Duration;

use serde::Serialize;
use tollgate_types::store_adapter::BucketSnapshot;

/// Dynamic limiter parameters; `None` falls back to the static default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
	pub rate: Option<f64>,
	pub burst: Option<f64>,
}

impl Overrides {
	pub const NONE: Overrides = Overrides { rate: None, burst: None };

	pub fn new(rate: f64, burst: f64) -> Self {
		Self { rate: Some(rate), burst: Some(burst) }
	}
}

/// Outcome of a single `allow` call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
	pub allowed: bool,
	/// Tokens left after the call
	pub tokens: f64,
	/// Time until one token is available, set only on rejection
	pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketState {
	pub tokens: f64,
	/// Seconds since the UNIX epoch
	pub last_refill: f64,
}

impl BucketState {
	/// A fresh bucket starts full
	pub fn full(burst: f64, now: f64) -> Self {
		Self { tokens: burst, last_refill: now }
	}

	/// Refill to `now` under `rate` / `burst`, then try to take one token.
	///
	/// The ceiling is applied on every call, so tokens banked under a looser
	/// limit are clamped as soon as a smaller burst is in effect.
	/// `last_refill` advances on rejection too, otherwise the next call would
	/// refill the same interval twice. It never moves backwards.
	pub fn take(&mut self, now: f64, rate: f64, burst: f64) -> Decision {
		let elapsed = (now - self.last_refill).max(0.0);
		self.tokens = (self.tokens + elapsed * rate).min(burst).max(0.0);
		self.last_refill = self.last_refill.max(now);

		if self.tokens >= 1.0 {
			self.tokens -= 1.0;
			Decision { allowed: true, tokens: self.tokens, retry_after: None }
		} else {
			// Saturates for rates too small to express the wait as a Duration
			let retry_after = if rate > 0.0 {
				Some(Duration::try_from_secs_f64((1.0 - self.tokens) / rate).unwrap_or(Duration::MAX))
			} else {
				None
			};
			Decision { allowed: false, tokens: self.tokens, retry_after }
		}
	}
}

impl From<BucketSnapshot> for BucketState {
	fn from(snapshot: BucketSnapshot) -> Self {
		Self { tokens: snapshot.tokens.max(0.0), last_refill: snapshot.last_refill }
	}
}

impl From<BucketState> for BucketSnapshot {
	fn from(state: BucketState) -> Self {
		Self { tokens: state.tokens, last_refill: state.last_refill }
	}
}


// vim: ts=4
