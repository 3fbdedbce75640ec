//! Behavioral Classifier
//!
//! Scores a client's rolling profile from independent, additive signals and
//! maps the score to a tier. The tier in turn selects the token bucket
//! overrides applied to the client.
//!
//! | Tier       | Condition                         | Rate  | Burst |
//! |------------|-----------------------------------|-------|-------|
//! | Bot        | score >= 70 and `bot_timing` fired | 0.2/s | 1     |
//! | Abusive    | score >= 70                       | 0.5/s | 2     |
//! | Suspicious | score >= 40                       | 3.0/s | 5     |
//! | Normal     | otherwise                         | default | default |
//!
//! Bot needs timing regularity on top of a high score, so heavy but human
//! traffic tops out at Abusive.

mod profile;
mod signals;

pub use profile::{BehaviorProfile, PATH_WINDOW, TIMESTAMP_WINDOW, USER_AGENT_MAX_LEN};
pub use signals::{tally, Signal};

use crate::prelude::*;
use crate::rate_limit::Overrides;

/// Rate window length (seconds)
pub const RATE_WINDOW: f64 = 60.0;
pub const RATE_SUSPICIOUS: usize = 40;
pub const RATE_ABUSIVE: usize = 100;
/// Burst window length (seconds)
pub const BURST_WINDOW: f64 = 5.0;
pub const BURST_THRESHOLD: usize = 15;
/// Requests in the rate window before timing is analysed
pub const TIMING_MIN_REQUESTS: usize = 20;
/// Coefficient of variation below which timing looks mechanical
pub const TIMING_CV_THRESHOLD: f64 = 0.08;
pub const SCRAPING_PATHS: usize = 20;
pub const BLOCK_FEW: u64 = 3;
pub const BLOCK_MANY: u64 = 8;

pub const SCORE_ABUSIVE: f64 = 70.0;
pub const SCORE_SUSPICIOUS: f64 = 40.0;

/// Automation client markers, matched case-insensitively
const AUTOMATION_AGENTS: [&str; 6] =
	["curl", "wget", "scrapy", "go-http", "python-urllib", "java/"];
/// Load testing tool; only counts together with a suspicious rate
const LOAD_TEST_AGENT: &str = "apachebench";

/// What the user agents a client has sent reveal about it.
///
/// Accumulated on every request and never reset, so agents beyond the
/// retained set still count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentTraits {
	pub automation: bool,
	pub load_test: bool,
	pub blank: bool,
}

impl AgentTraits {
	pub fn of(agent: &str) -> Self {
		let lower = agent.to_lowercase();
		Self {
			automation: AUTOMATION_AGENTS.iter().any(|marker| lower.contains(marker)),
			load_test: lower.contains(LOAD_TEST_AGENT),
			blank: agent.trim().is_empty(),
		}
	}

	pub fn merge(&mut self, other: Self) {
		self.automation |= other.automation;
		self.load_test |= other.load_test;
		self.blank |= other.blank;
	}
}

/// Result of classifying a profile
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
	pub signals: Vec<Signal>,
	pub score: f64,
	pub classification: Classification,
	pub overrides: Overrides,
}

/// Compute the fired signals and the bounded score of a profile.
///
/// Pure: the same profile and `now` always give the same result.
pub fn score(profile: &BehaviorProfile, now: f64) -> (Vec<Signal>, f64) {
	let mut signals = Vec::new();

	let recent: Vec<f64> = profile.recent(now, RATE_WINDOW).collect();
	let rate_60 = recent.len();

	if rate_60 >= RATE_ABUSIVE {
		signals.push(Signal::RateAbusive);
	} else if rate_60 >= RATE_SUSPICIOUS {
		signals.push(Signal::RateSuspicious);
	}

	if profile.count_recent(now, BURST_WINDOW) >= BURST_THRESHOLD {
		signals.push(Signal::Burst);
	}

	if rate_60 >= TIMING_MIN_REQUESTS
		&& coefficient_of_variation(&recent).is_some_and(|cv| cv < TIMING_CV_THRESHOLD)
	{
		signals.push(Signal::BotTiming);
	}

	if profile.unique_paths() >= SCRAPING_PATHS {
		signals.push(Signal::Scraping);
	}

	if profile.blocked_count >= BLOCK_MANY {
		signals.push(Signal::BlockMany);
	} else if profile.blocked_count >= BLOCK_FEW {
		signals.push(Signal::BlockFew);
	}

	let agents = profile.agent_traits();
	if agents.automation || (agents.load_test && rate_60 >= RATE_SUSPICIOUS) {
		signals.push(Signal::BotUa);
	}
	if agents.blank {
		signals.push(Signal::NoUa);
	}

	let score = tally(&signals);
	(signals, score)
}

/// Map a score to a tier, first match wins
pub fn classify(score: f64, signals: &[Signal]) -> Classification {
	if score >= SCORE_ABUSIVE && signals.contains(&Signal::BotTiming) {
		Classification::Bot
	} else if score >= SCORE_ABUSIVE {
		Classification::Abusive
	} else if score >= SCORE_SUSPICIOUS {
		Classification::Suspicious
	} else {
		Classification::Normal
	}
}

pub fn overrides_for(classification: Classification) -> Overrides {
	match classification {
		Classification::Bot => Overrides::new(0.2, 1.0),
		Classification::Abusive => Overrides::new(0.5, 2.0),
		Classification::Suspicious => Overrides::new(3.0, 5.0),
		Classification::Normal => Overrides::NONE,
	}
}

/// Score, classify and derive overrides in one step
pub fn assess(profile: &BehaviorProfile, now: f64) -> Assessment {
	let (signals, score) = score(profile, now);
	let classification = classify(score, &signals);
	Assessment { overrides: overrides_for(classification), signals, score, classification }
}

/// Population stddev / mean of the gaps between consecutive timestamps.
/// `None` when there are no gaps or the mean gap is not positive.
fn coefficient_of_variation(timestamps: &[f64]) -> Option<f64> {
	if timestamps.len() < 2 {
		return None;
	}
	let intervals: Vec<f64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
	let n = intervals.len() as f64;
	let mean = intervals.iter().sum::<f64>() / n;
	if mean <= 0.0 {
		return None;
	}
	let variance = intervals.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
	Some(variance.sqrt() / mean)
}

#[cfg(test)]
mod tests {
	use super::*;

	const NOW: f64 = 10_000.0;
	const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

	fn profile_with(times: &[f64], path: &str, agent: &str) -> BehaviorProfile {
		let mut profile = BehaviorProfile::new();
		for t in times {
			profile.record(*t, path, agent, 64);
		}
		profile
	}

	/// `n` timestamps ending at NOW, spaced `gap` seconds apart
	fn evenly_spaced(n: usize, gap: f64) -> Vec<f64> {
		(0..n).map(|i| NOW - gap * (n - 1 - i) as f64).collect()
	}

	/// `n` increasing timestamps starting `span` seconds before NOW whose gaps
	/// alternate with period `period`, giving a high coefficient of variation
	fn irregular(n: i32, span: f64, step: f64, period: i32, jitter: f64) -> Vec<f64> {
		(0..n)
			.map(|i| NOW - span + f64::from(i) * step - f64::from(i % period) * jitter)
			.collect()
	}

	#[test]
	fn test_quiet_client_is_normal() {
		let profile = profile_with(&evenly_spaced(5, 7.3), "/hello", BROWSER);
		let assessment = assess(&profile, NOW);
		assert!(assessment.signals.is_empty());
		assert!(assessment.score.abs() < f64::EPSILON);
		assert_eq!(assessment.classification, Classification::Normal);
		assert_eq!(assessment.overrides, Overrides::NONE);
	}

	#[test]
	fn test_rate_tiers_are_exclusive() {
		// Irregular gaps so timing does not fire
		let times = irregular(45, 58.0, 1.3, 2, 0.9);
		let (signals, _) = score(&profile_with(&times, "/", BROWSER), NOW);
		assert!(signals.contains(&Signal::RateSuspicious));
		assert!(!signals.contains(&Signal::RateAbusive));

		let times = irregular(120, 59.0, 0.49, 3, 0.2);
		let (signals, _) = score(&profile_with(&times, "/", BROWSER), NOW);
		assert!(signals.contains(&Signal::RateAbusive));
		assert!(!signals.contains(&Signal::RateSuspicious));
	}

	#[test]
	fn test_burst_signal() {
		let times: Vec<f64> = (0..15).map(|i| NOW - 4.0 + f64::from(i) * 0.25).collect();
		let (signals, score) = score(&profile_with(&times, "/", BROWSER), NOW);
		assert_eq!(signals, vec![Signal::Burst]);
		assert!((score - 20.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_timing_needs_twenty_requests() {
		let (signals, _) = score(&profile_with(&evenly_spaced(19, 2.0), "/", BROWSER), NOW);
		assert!(!signals.contains(&Signal::BotTiming));

		let (signals, _) = score(&profile_with(&evenly_spaced(20, 2.0), "/", BROWSER), NOW);
		assert!(signals.contains(&Signal::BotTiming));
	}

	#[test]
	fn test_identical_timestamps_do_not_fire_timing() {
		let times = vec![NOW; 25];
		let (signals, _) = score(&profile_with(&times, "/", BROWSER), NOW);
		assert!(!signals.contains(&Signal::BotTiming));
		assert!(signals.contains(&Signal::Burst));
	}

	#[test]
	fn test_regular_timing_below_threshold_is_suspicious_not_bot() {
		// 25 requests 2.4s apart span 57.6s: rate_60 = 25, below the rate tiers
		let mut profile = profile_with(&evenly_spaced(25, 2.4), "/api/items", BROWSER);
		profile.blocked_count = 8;

		let assessment = assess(&profile, NOW);
		assert_eq!(assessment.signals, vec![Signal::BotTiming, Signal::BlockMany]);
		assert!((assessment.score - 60.0).abs() < f64::EPSILON);
		assert_eq!(assessment.classification, Classification::Suspicious);
		assert_eq!(assessment.overrides, Overrides::new(3.0, 5.0));
	}

	#[test]
	fn test_high_score_without_regular_timing_is_abusive() {
		// Gaps alternate 0.1s / 1.0s: cv far above the threshold
		let mut times = Vec::with_capacity(100);
		let mut t = NOW - 55.0;
		for i in 0..100 {
			times.push(t);
			t += if i % 2 == 0 { 0.1 } else { 1.0 };
		}
		let mut profile = BehaviorProfile::new();
		for (i, ts) in times.iter().enumerate() {
			profile.record(*ts, &format!("/catalog/{}", i % 25), "curl/8.5.0", 64);
		}
		profile.record(NOW - 54.0, "/", "", 64);
		profile.timestamps.make_contiguous().sort_by(f64::total_cmp);
		profile.blocked_count = 8;

		let assessment = assess(&profile, NOW);
		assert_eq!(
			assessment.signals,
			vec![Signal::RateAbusive, Signal::Scraping, Signal::BlockMany, Signal::BotUa, Signal::NoUa]
		);
		assert!((assessment.score - 95.0).abs() < f64::EPSILON);
		assert_eq!(assessment.classification, Classification::Abusive);
	}

	#[test]
	fn test_regular_heavy_traffic_is_bot() {
		let times = evenly_spaced(120, 0.45);
		let assessment = assess(&profile_with(&times, "/", "python-urllib/3.12"), NOW);
		assert!(assessment.signals.contains(&Signal::BotTiming));
		assert!(assessment.signals.contains(&Signal::RateAbusive));
		assert_eq!(assessment.classification, Classification::Bot);
		assert_eq!(assessment.overrides, Overrides::new(0.2, 1.0));
	}

	#[test]
	fn test_scraping_and_block_signals() {
		let mut profile = BehaviorProfile::new();
		for i in 0..20 {
			let t = NOW - 3000.0 + f64::from(i) * 100.0;
			profile.record(t, &format!("/page/{}", i), BROWSER, 64);
		}
		profile.blocked_count = 5;
		let (signals, score) = score(&profile, NOW);
		assert_eq!(signals, vec![Signal::Scraping, Signal::BlockFew]);
		assert!((score - 25.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_load_test_agent_needs_rate() {
		let quiet = profile_with(&evenly_spaced(3, 10.0), "/", "ApacheBench/2.3");
		let (signals, _) = score(&quiet, NOW);
		assert!(!signals.contains(&Signal::BotUa));

		let times = irregular(45, 58.0, 1.3, 2, 0.9);
		let busy = profile_with(&times, "/", "ApacheBench/2.3");
		let (signals, _) = score(&busy, NOW);
		assert_eq!(signals.iter().filter(|s| **s == Signal::BotUa).count(), 1);
	}

	#[test]
	fn test_agent_markers_case_insensitive_and_blank() {
		let mut profile = profile_with(&[NOW], "/", "Wget/1.21");
		profile.record(NOW, "/", "   ", 64);
		let (signals, score) = score(&profile, NOW);
		assert_eq!(signals, vec![Signal::BotUa, Signal::NoUa]);
		assert!((score - 15.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_agents_past_the_retained_set_still_count() {
		let mut profile = BehaviorProfile::new();
		for i in 0..64 {
			profile.record(NOW, "/", &format!("Mozilla/5.0 build-{}", i), 64);
		}
		profile.record(NOW, "/", "curl/8.5.0", 64);
		profile.record(NOW, "/", "", 64);
		assert_eq!(profile.user_agents().count(), 64);

		let (signals, _) = score(&profile, NOW);
		assert_eq!(signals, vec![Signal::BotUa, Signal::NoUa]);
	}

	#[test]
	fn test_classify_order() {
		assert_eq!(classify(70.0, &[Signal::BotTiming]), Classification::Bot);
		assert_eq!(classify(69.9, &[Signal::BotTiming]), Classification::Suspicious);
		assert_eq!(classify(95.0, &[Signal::RateAbusive]), Classification::Abusive);
		assert_eq!(classify(40.0, &[]), Classification::Suspicious);
		assert_eq!(classify(39.9, &[]), Classification::Normal);
	}

	#[test]
	fn test_bot_always_has_bot_timing() {
		for mask in 0u32..(1 << Signal::ALL.len()) {
			let signals: Vec<Signal> = Signal::ALL
				.iter()
				.enumerate()
				.filter(|(i, _)| mask & (1 << i) != 0)
				.map(|(_, s)| *s)
				.collect();
			if classify(tally(&signals), &signals) == Classification::Bot {
				assert!(signals.contains(&Signal::BotTiming));
			}
		}
	}

	#[test]
	fn test_coefficient_of_variation() {
		assert_eq!(coefficient_of_variation(&[1.0]), None);
		assert_eq!(coefficient_of_variation(&[1.0, 1.0, 1.0]), None);
		let cv = coefficient_of_variation(&[0.0, 1.0, 2.0, 3.0]).unwrap();
		assert!(cv.abs() < 1e-12);
		// gaps 1 and 3: mean 2, stddev 1
		let cv = coefficient_of_variation(&[0.0, 1.0, 4.0]).unwrap();
		assert!((cv - 0.5).abs() < 1e-12);
	}
}

// vim: ts=4
