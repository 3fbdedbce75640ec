//! Behavioral signals and their weights

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named condition contributing fixed points to the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
	/// 40 to 99 requests in the last minute
	RateSuspicious,
	/// 100 or more requests in the last minute
	RateAbusive,
	/// 15 or more requests in 5 seconds
	Burst,
	/// Mechanically regular inter-arrival times
	BotTiming,
	/// Many distinct paths
	Scraping,
	/// Rejected 3 to 7 times
	BlockFew,
	/// Rejected 8 or more times
	BlockMany,
	/// Automation client user agent
	BotUa,
	/// Blank user agent seen
	NoUa,
}

impl Signal {
	pub const ALL: [Signal; 9] = [
		Signal::RateSuspicious,
		Signal::RateAbusive,
		Signal::Burst,
		Signal::BotTiming,
		Signal::Scraping,
		Signal::BlockFew,
		Signal::BlockMany,
		Signal::BotUa,
		Signal::NoUa,
	];

	pub fn points(self) -> f64 {
		match self {
			Signal::RateSuspicious => 20.0,
			Signal::RateAbusive => 40.0,
			Signal::Burst => 20.0,
			Signal::BotTiming => 35.0,
			Signal::Scraping => 15.0,
			Signal::BlockFew => 10.0,
			Signal::BlockMany => 25.0,
			Signal::BotUa => 10.0,
			Signal::NoUa => 5.0,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Signal::RateSuspicious => "rate_suspicious",
			Signal::RateAbusive => "rate_abusive",
			Signal::Burst => "burst",
			Signal::BotTiming => "bot_timing",
			Signal::Scraping => "scraping",
			Signal::BlockFew => "block_few",
			Signal::BlockMany => "block_many",
			Signal::BotUa => "bot_ua",
			Signal::NoUa => "no_ua",
		}
	}
}

impl fmt::Display for Signal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Sum of signal points, clamped to `[0, 100]` and rounded to one decimal
pub fn tally(signals: &[Signal]) -> f64 {
	let raw: f64 = signals.iter().map(|s| s.points()).sum();
	(raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}


// vim: ts=4
