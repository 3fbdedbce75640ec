//! Keyed Token Bucket
//!
//! One bucket per client in a sharded map, so concurrent clients only contend
//! when they hash to the same shard.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::bucket::{BucketState, Decision, Overrides};
use crate::prelude::*;

/// Statistics about the limiter
#[derive(Debug, Clone, Default)]
pub struct LimiterStats {
	pub tracked_clients: usize,
	pub total_allowed: u64,
	pub total_limited: u64,
}

#[derive(Debug)]
pub struct TokenBucket {
	rate: f64,
	burst: f64,
	buckets: DashMap<ClientId, BucketState>,
	total_allowed: AtomicU64,
	total_limited: AtomicU64,
}

impl TokenBucket {
	pub fn new(rate: f64, burst: f64) -> Self {
		Self {
			rate,
			burst,
			buckets: DashMap::new(),
			total_allowed: AtomicU64::new(0),
			total_limited: AtomicU64::new(0),
		}
	}

	pub fn rate(&self) -> f64 {
		self.rate
	}

	pub fn burst(&self) -> f64 {
		self.burst
	}

	/// Refill and try to consume one token for `client_id`
	pub fn allow(&self, client_id: &str, overrides: Overrides, now: f64) -> Decision {
		let rate = overrides.rate.unwrap_or(self.rate);
		let burst = overrides.burst.unwrap_or(self.burst);

		let decision = match self.buckets.get_mut(client_id) {
			Some(mut state) => state.take(now, rate, burst),
			None => {
				let mut entry = self
					.buckets
					.entry(client_id.into())
					.or_insert_with(|| BucketState::full(burst, now));
				entry.take(now, rate, burst)
			}
		};

		if decision.allowed {
			self.total_allowed.fetch_add(1, Ordering::Relaxed);
		} else {
			self.total_limited.fetch_add(1, Ordering::Relaxed);
			trace!(client_id = %client_id, tokens = decision.tokens, "bucket empty");
		}
		decision
	}

	/// Stored token count, or the default burst for unknown clients
	pub fn tokens(&self, client_id: &str) -> f64 {
		self.buckets.get(client_id).map_or(self.burst, |state| state.tokens)
	}

	pub fn state(&self, client_id: &str) -> Option<BucketState> {
		self.buckets.get(client_id).map(|state| *state)
	}

	/// Insert a previously persisted state unless the client is already tracked
	pub fn restore(&self, client_id: &str, state: BucketState) -> bool {
		let mut restored = false;
		self.buckets.entry(client_id.into()).or_insert_with(|| {
			restored = true;
			state
		});
		restored
	}

	pub fn stats(&self) -> LimiterStats {
		LimiterStats {
			tracked_clients: self.buckets.len(),
			total_allowed: self.total_allowed.load(Ordering::Relaxed),
			total_limited: self.total_limited.load(Ordering::Relaxed),
		}
	}
}


// vim: ts=4
