//! Error types for the redb store adapter

use std::fmt;

#[derive(Debug)]
pub enum Error {
	/// Database operation error
	DbError(String),

	/// I/O error
	IoError(String),

	/// Serialization error
	SerializationError(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::DbError(msg) => write!(f, "Database error: {}", msg),
			Error::IoError(msg) => write!(f, "I/O error: {}", msg),
			Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::SerializationError(err.to_string())
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::IoError(err.to_string())
	}
}

impl From<Error> for tollgate_types::error::Error {
	fn from(err: Error) -> Self {
		match err {
			Error::SerializationError(msg) => tollgate_types::error::Error::Serialization(msg),
			other => tollgate_types::error::Error::StoreError(other.to_string()),
		}
	}
}

// vim: ts=4
