//! Time source
//!
//! All engine time is wall-clock seconds since the UNIX epoch as `f64`, which
//! keeps bucket refill and inter-arrival math in one unit.

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

pub trait Clock: Debug + Send + Sync {
	fn now(&self) -> f64;
}

/// Reads the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> f64 {
		SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
	}
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<f64>,
}

impl ManualClock {
	pub fn new(start: f64) -> Self {
		Self { now: Mutex::new(start) }
	}

	pub fn set(&self, now: f64) {
		*self.now.lock() = now;
	}

	pub fn advance(&self, secs: f64) {
		*self.now.lock() += secs;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> f64 {
		*self.now.lock()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_manual_clock() {
		let clock = ManualClock::new(1000.0);
		assert!((clock.now() - 1000.0).abs() < f64::EPSILON);
		clock.advance(2.5);
		assert!((clock.now() - 1002.5).abs() < f64::EPSILON);
		clock.set(5.0);
		assert!((clock.now() - 5.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_system_clock_is_after_2020() {
		assert!(SystemClock.now() > 1_577_836_800.0);
	}
}

// vim: ts=4
