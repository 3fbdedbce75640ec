//! Store adapter trait
//!
//! Optional write-through cache for bucket and profile snapshots. The engine
//! keeps its own process-local state and treats the store as best-effort:
//! every method may fail and the caller logs and ignores the failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::prelude::*;

/// Persisted token bucket state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSnapshot {
	pub tokens: f64,
	/// Seconds since the UNIX epoch
	pub last_refill: f64,
}

/// Persisted profile summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
	pub classification: Classification,
	pub score: f64,
	pub blocked_count: u64,
}

/// A bucket and profile written together after one evaluation
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
	pub client_id: ClientId,
	pub bucket: BucketSnapshot,
	pub profile: ProfileRecord,
}

#[async_trait]
pub trait StoreAdapter: Debug + Send + Sync {
	/// Load a bucket snapshot. Unknown or expired clients yield `Ok(None)`.
	async fn load_bucket(&self, client_id: &str) -> TgResult<Option<BucketSnapshot>>;

	async fn store_bucket(&self, client_id: &str, bucket: &BucketSnapshot) -> TgResult<()>;

	/// Load a profile summary. Unknown or expired clients yield `Ok(None)`.
	async fn load_profile(&self, client_id: &str) -> TgResult<Option<ProfileRecord>>;

	async fn store_profile(&self, client_id: &str, profile: &ProfileRecord) -> TgResult<()>;

	/// Write both halves of a snapshot
	async fn store_snapshot(&self, snapshot: &ClientSnapshot) -> TgResult<()> {
		self.store_bucket(&snapshot.client_id, &snapshot.bucket).await?;
		self.store_profile(&snapshot.client_id, &snapshot.profile).await
	}
}

// vim: ts=4
