//! HTTP-facing errors
//!
//! Everything returned to a client is a JSON body of the form
//! `{"error": {"code": ..., "message": ...}}`.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tollgate_types::Classification;

pub type Result<T> = std::result::Result<T, Error>;

/// Header carrying the client's current tier
pub const CLIENT_CLASS_HEADER: &str = "X-Client-Class";

#[derive(Debug)]
pub enum Error {
	NotFound,
	/// Request rejected by the admission engine
	RateLimited {
		classification: Classification,
		retry_after: Option<Duration>,
	},
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::RateLimited { classification, retry_after } => {
				write!(f, "rate limited as {}, retry after {:?}", classification, retry_after)
			}
		}
	}
}

impl std::error::Error for Error {}

/// Whole seconds until a retry may succeed, never less than one
pub fn retry_after_secs(retry_after: Option<Duration>) -> u64 {
	retry_after.map_or(1, |d| d.as_secs_f64().ceil() as u64).max(1)
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		match self {
			Error::NotFound => {
				let body = serde_json::json!({
					"error": {
						"code": "E-NOT-FOUND",
						"message": "Not found"
					}
				});
				(StatusCode::NOT_FOUND, Json(body)).into_response()
			}
			Error::RateLimited { classification, retry_after } => {
				let retry_secs = retry_after_secs(retry_after);
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"classification": classification,
							"retryAfter": retry_secs
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

				if let Ok(val) = retry_secs.to_string().parse() {
					response.headers_mut().insert("Retry-After", val);
				}
				if let Ok(val) = classification.as_str().parse() {
					response.headers_mut().insert(CLIENT_CLASS_HEADER, val);
				}

				response
			}
		}
	}
}


// vim: ts=4
