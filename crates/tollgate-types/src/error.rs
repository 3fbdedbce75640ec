//! Error type shared by the Tollgate crates.
//!
//! The admission path itself never fails; errors only surface from
//! configuration loading and store adapters.

use std::fmt;

pub type TgResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Invalid configuration value
	ConfigError(String),
	/// External store unreachable or failed
	StoreError(String),
	Serialization(String),
	Internal(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::StoreError(msg) => write!(f, "store error: {}", msg),
			Error::Serialization(msg) => write!(f, "serialization error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::Internal(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display() {
		assert_eq!(Error::StoreError("timeout".into()).to_string(), "store error: timeout");
		assert_eq!(
			Error::ConfigError("RATE must be positive".into()).to_string(),
			"configuration error: RATE must be positive"
		);
	}

	#[test]
	fn test_from_serde_json() {
		let err = serde_json::from_str::<u32>("nope").map_err(Error::from);
		assert!(matches!(err, Err(Error::Serialization(_))));
	}
}

// vim: ts=4
