//! Engine Configuration
//!
//! Static fallback limits and the sizing of queues and background tasks.
//! Dynamic per-client overrides from the classifier take precedence over
//! `rate` and `burst` whenever a client is not classified as normal.

use std::str::FromStr;
use std::time::Duration;

use crate::prelude::*;

#[derive(Clone, Debug)]
pub struct EngineConfig {
	/// Default refill rate (tokens per second)
	pub rate: f64,
	/// Default bucket ceiling
	pub burst: f64,
	/// Per-listener event queue capacity
	pub listener_queue: usize,
	/// Period of the stats broadcast
	pub stats_interval: Duration,
	/// Capacity of the write-through persistence queue
	pub persist_queue: usize,
	/// Distinct user agents retained per client
	pub max_user_agents: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			rate: 5.0,
			burst: 10.0,
			listener_queue: 100,
			stats_interval: Duration::from_secs(2),
			persist_queue: 1024,
			max_user_agents: 64,
		}
	}
}

impl EngineConfig {
	/// Read configuration from the process environment
	///
	/// `TOLLGATE_RATE` / `TOLLGATE_BURST` win over the bare `RATE` / `BURST`
	/// names older deployments use.
	pub fn from_env() -> TgResult<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TgResult<Self> {
		let mut config = Self::default();

		if let Some(rate) = parse_var::<f64>(&lookup, &["TOLLGATE_RATE", "RATE"])? {
			config.rate = rate;
		}
		if let Some(burst) = parse_var::<f64>(&lookup, &["TOLLGATE_BURST", "BURST"])? {
			config.burst = burst;
		}
		if let Some(queue) = parse_var::<usize>(&lookup, &["TOLLGATE_LISTENER_QUEUE"])? {
			config.listener_queue = queue;
		}
		if let Some(ms) = parse_var::<u64>(&lookup, &["TOLLGATE_STATS_INTERVAL_MS"])? {
			config.stats_interval = Duration::from_millis(ms);
		}
		if let Some(queue) = parse_var::<usize>(&lookup, &["TOLLGATE_PERSIST_QUEUE"])? {
			config.persist_queue = queue;
		}
		if let Some(max) = parse_var::<usize>(&lookup, &["TOLLGATE_MAX_USER_AGENTS"])? {
			config.max_user_agents = max;
		}

		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> TgResult<()> {
		if !self.rate.is_finite() || self.rate <= 0.0 {
			return Err(Error::ConfigError(format!("rate must be positive, got {}", self.rate)));
		}
		if !self.burst.is_finite() || self.burst < 1.0 {
			return Err(Error::ConfigError(format!("burst must be at least 1, got {}", self.burst)));
		}
		if self.listener_queue == 0 || self.persist_queue == 0 {
			return Err(Error::ConfigError("queue capacities must be non-zero".into()));
		}
		if self.stats_interval.is_zero() {
			return Err(Error::ConfigError("stats interval must be non-zero".into()));
		}
		Ok(())
	}
}

/// First key present wins
fn parse_var<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	keys: &[&str],
) -> TgResult<Option<T>> {
	for key in keys {
		if let Some(raw) = lookup(key) {
			let raw = raw.trim();
			return raw
				.parse::<T>()
				.map(Some)
				.map_err(|_| Error::ConfigError(format!("invalid value for {}: {:?}", key, raw)));
		}
	}
	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> =
			vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
		move |key| map.get(key).cloned()
	}

	#[test]
	fn test_defaults() {
		let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
		assert!((config.rate - 5.0).abs() < f64::EPSILON);
		assert!((config.burst - 10.0).abs() < f64::EPSILON);
		assert_eq!(config.listener_queue, 100);
		assert_eq!(config.stats_interval, Duration::from_secs(2));
	}

	#[test]
	fn test_prefixed_names_win() {
		let config = EngineConfig::from_lookup(lookup(&[
			("RATE", "1"),
			("TOLLGATE_RATE", "2.5"),
			("BURST", "20"),
			("TOLLGATE_STATS_INTERVAL_MS", "500"),
		]))
		.unwrap();
		assert!((config.rate - 2.5).abs() < f64::EPSILON);
		assert!((config.burst - 20.0).abs() < f64::EPSILON);
		assert_eq!(config.stats_interval, Duration::from_millis(500));
	}

	#[test]
	fn test_invalid_values() {
		let result = EngineConfig::from_lookup(lookup(&[("RATE", "fast")]));
		assert!(matches!(result, Err(Error::ConfigError(_))));

		let result = EngineConfig::from_lookup(lookup(&[("TOLLGATE_RATE", "0")]));
		assert!(matches!(result, Err(Error::ConfigError(_))));

		let result = EngineConfig::from_lookup(lookup(&[("BURST", "0.5")]));
		assert!(matches!(result, Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
