//! Behavior Profile
//!
//! Rolling per-client history the classifier scores. Windows are bounded;
//! the block counter is a lifetime value and is never reset.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::signals::Signal;
use super::{AgentTraits, Assessment};
use crate::prelude::*;
use crate::rate_limit::Overrides;

/// Timestamps kept for rate, burst and timing analysis
pub const TIMESTAMP_WINDOW: usize = 500;
/// Paths kept for the scraping-breadth signal
pub const PATH_WINDOW: usize = 200;
/// Longer user agents are truncated to this many characters
pub const USER_AGENT_MAX_LEN: usize = 120;

#[derive(Debug, Clone, Default)]
pub struct BehaviorProfile {
	pub(crate) timestamps: VecDeque<f64>,
	pub(crate) paths: VecDeque<Box<str>>,
	pub(crate) user_agents: BTreeSet<Box<str>>,
	pub(crate) agent_traits: AgentTraits,
	pub(crate) blocked_count: u64,

	// Derived on every evaluation
	pub(crate) score: f64,
	pub(crate) classification: Classification,
	pub(crate) signals: Vec<Signal>,
	pub(crate) overrides: Overrides,
}

impl BehaviorProfile {
	pub fn new() -> Self {
		Self {
			timestamps: VecDeque::with_capacity(TIMESTAMP_WINDOW),
			paths: VecDeque::with_capacity(PATH_WINDOW),
			..Self::default()
		}
	}

	/// Append one request to the rolling windows.
	///
	/// Agent traits are taken from every request. The retained agent set is
	/// for display only: once `max_user_agents` distinct agents are known,
	/// new ones are not stored.
	pub fn record(&mut self, now: f64, path: &str, user_agent: &str, max_user_agents: usize) {
		if self.timestamps.len() == TIMESTAMP_WINDOW {
			self.timestamps.pop_front();
		}
		self.timestamps.push_back(now);

		if self.paths.len() == PATH_WINDOW {
			self.paths.pop_front();
		}
		self.paths.push_back(path.into());

		self.agent_traits.merge(AgentTraits::of(user_agent));

		let agent: Box<str> = truncate_chars(user_agent, USER_AGENT_MAX_LEN).into();
		if self.user_agents.len() < max_user_agents || self.user_agents.contains(&agent) {
			self.user_agents.insert(agent);
		}
	}

	pub fn record_block(&mut self) {
		self.blocked_count = self.blocked_count.saturating_add(1);
	}

	pub(crate) fn apply(&mut self, assessment: &Assessment) {
		self.score = assessment.score;
		self.classification = assessment.classification;
		self.signals.clone_from(&assessment.signals);
		self.overrides = assessment.overrides;
	}

	/// Timestamps no older than `window` seconds
	pub fn recent(&self, now: f64, window: f64) -> impl Iterator<Item = f64> + '_ {
		self.timestamps.iter().copied().filter(move |t| now - t <= window)
	}

	pub fn count_recent(&self, now: f64, window: f64) -> usize {
		self.recent(now, window).count()
	}

	pub fn unique_paths(&self) -> usize {
		self.paths.iter().collect::<HashSet<_>>().len()
	}

	pub fn user_agents(&self) -> impl Iterator<Item = &str> {
		self.user_agents.iter().map(AsRef::as_ref)
	}

	pub fn agent_traits(&self) -> AgentTraits {
		self.agent_traits
	}

	pub fn blocked_count(&self) -> u64 {
		self.blocked_count
	}

	pub fn score(&self) -> f64 {
		self.score
	}

	pub fn classification(&self) -> Classification {
		self.classification
	}

	pub fn signals(&self) -> &[Signal] {
		&self.signals
	}

	pub fn overrides(&self) -> Overrides {
		self.overrides
	}
}

fn truncate_chars(s: &str, max: usize) -> &str {
	match s.char_indices().nth(max) {
		Some((idx, _)) => &s[..idx],
		None => s,
	}
}


// vim: ts=4
