//! Client identity and classification types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque client identity (usually the peer address)
pub type ClientId = Box<str>;

/// Behavioral classification tier.
///
/// Variants are declared in ascending severity so the derived `Ord` gives
/// `Normal < Suspicious < Abusive < Bot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
	#[default]
	Normal,
	Suspicious,
	Abusive,
	Bot,
}

impl Classification {
	pub const ALL: [Classification; 4] = [
		Classification::Normal,
		Classification::Suspicious,
		Classification::Abusive,
		Classification::Bot,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Classification::Normal => "normal",
			Classification::Suspicious => "suspicious",
			Classification::Abusive => "abusive",
			Classification::Bot => "bot",
		}
	}
}

impl fmt::Display for Classification {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_severity_order() {
		assert!(Classification::Normal < Classification::Suspicious);
		assert!(Classification::Suspicious < Classification::Abusive);
		assert!(Classification::Abusive < Classification::Bot);
		assert_eq!(Classification::ALL.iter().max(), Some(&Classification::Bot));
	}

	#[test]
	fn test_serde_lowercase() {
		let json = serde_json::to_string(&Classification::Suspicious).unwrap();
		assert_eq!(json, "\"suspicious\"");
		let parsed: Classification = serde_json::from_str("\"bot\"").unwrap();
		assert_eq!(parsed, Classification::Bot);
	}
}

// vim: ts=4
