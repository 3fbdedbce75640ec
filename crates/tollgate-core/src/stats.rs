//! Global Traffic Statistics
//!
//! Process-wide request counters for dashboards and spike prediction. Nothing
//! here feeds back into per-client decisions.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use serde::Serialize;

use crate::prelude::*;

/// Recent global timestamps kept
pub const GLOBAL_WINDOW: usize = 2000;
/// Per-second history slots kept
pub const HISTORY_SLOTS: usize = 60;
/// Per-second history slots reported in a snapshot
pub const HISTORY_REPORTED: usize = 30;

/// Snapshot of global traffic
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
	#[serde(rename = "totalRequests60s")]
	pub total_requests_60s: usize,
	#[serde(rename = "totalRequests5s")]
	pub total_requests_5s: usize,
	pub spike_predicted: bool,
	/// Clients active in the last minute, per tier
	pub classifications: BTreeMap<Classification, usize>,
	/// Requests per second, oldest first
	pub traffic_history: Vec<u64>,
	pub active_clients: usize,
}

/// Extrapolate the last 5 seconds to a minute and compare with the real
/// minute plus 50%.
pub fn predict_spike(last_5s: usize, last_60s: usize) -> bool {
	if last_60s == 0 {
		return false;
	}
	(last_5s as f64 * 12.0) > (last_60s as f64 * 1.5)
}

#[derive(Debug)]
struct CounterState {
	timestamps: VecDeque<f64>,
	history: VecDeque<u64>,
	last_tick: f64,
	tick_count: u64,
}

/// Rolling global counters
#[derive(Debug)]
pub struct GlobalCounters {
	state: Mutex<CounterState>,
}

impl GlobalCounters {
	pub fn new(now: f64) -> Self {
		Self {
			state: Mutex::new(CounterState {
				timestamps: VecDeque::with_capacity(GLOBAL_WINDOW),
				history: VecDeque::with_capacity(HISTORY_SLOTS),
				last_tick: now,
				tick_count: 0,
			}),
		}
	}

	/// Count one request.
	///
	/// The per-second history is cut when a request arrives at least a second
	/// after the previous cut, so idle seconds produce no slot.
	pub fn record(&self, now: f64) {
		let mut state = self.state.lock();

		if state.timestamps.len() == GLOBAL_WINDOW {
			state.timestamps.pop_front();
		}
		state.timestamps.push_back(now);

		state.tick_count += 1;
		if now - state.last_tick >= 1.0 {
			if state.history.len() == HISTORY_SLOTS {
				state.history.pop_front();
			}
			let count = state.tick_count;
			state.history.push_back(count);
			state.tick_count = 0;
			state.last_tick = now;
		}
	}

	/// Requests in the last 60 and 5 seconds, and the reported history
	pub fn window(&self, now: f64) -> (usize, usize, Vec<u64>) {
		let state = self.state.lock();
		let total_60s = state.timestamps.iter().filter(|t| now - **t <= 60.0).count();
		let total_5s = state.timestamps.iter().filter(|t| now - **t <= 5.0).count();
		let skip = state.history.len().saturating_sub(HISTORY_REPORTED);
		let history = state.history.iter().skip(skip).copied().collect();
		(total_60s, total_5s, history)
	}

	/// Combine the counters with a per-tier population of active clients
	pub fn snapshot(
		&self,
		now: f64,
		classifications: BTreeMap<Classification, usize>,
	) -> GlobalStats {
		let (total_requests_60s, total_requests_5s, traffic_history) = self.window(now);
		let active_clients = classifications.values().sum();
		GlobalStats {
			total_requests_60s,
			total_requests_5s,
			spike_predicted: predict_spike(total_requests_5s, total_requests_60s),
			classifications,
			traffic_history,
			active_clients,
		}
	}
}


// vim: ts=4
