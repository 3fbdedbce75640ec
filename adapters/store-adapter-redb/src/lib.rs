//! Redb-based Store Adapter
//!
//! Implements the StoreAdapter trait using redb as a write-through cache for
//! token bucket and profile snapshots.
//!
//! # Storage Layout
//!
//! One redb file with two tables, both keyed by client id:
//! - `buckets` - bucket snapshot as JSON
//! - `profiles` - profile summary as JSON
//!
//! Every value carries the wall-clock time it was written. Entries older than
//! the configured TTL read as absent and are removed by `purge_expired`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tollgate_types::error::{Error as TgError, TgResult};
use tollgate_types::store_adapter::{BucketSnapshot, ClientSnapshot, ProfileRecord, StoreAdapter};
use tracing::{debug, info, trace};

mod error;
pub use error::Error;

/// Store adapter configuration
#[derive(Debug, Clone)]
pub struct AdapterConfig {
	/// Entries older than this read as absent
	pub ttl: Duration,
}

impl Default for AdapterConfig {
	fn default() -> Self {
		Self { ttl: Duration::from_secs(3600) }
	}
}

type JsonTable = TableDefinition<'static, &'static str, &'static str>;

// Storage table definitions
mod tables {
	use super::JsonTable;
	use redb::TableDefinition;

	/// client_id -> bucket_json
	pub const TABLE_BUCKETS: JsonTable = TableDefinition::new("buckets");

	/// client_id -> profile_json
	pub const TABLE_PROFILES: JsonTable = TableDefinition::new("profiles");
}

use tables::*;

/// Stored value with its write time
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry<T> {
	stored_at: f64,
	value: T,
}

fn now_secs() -> f64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[derive(Debug)]
pub struct StoreAdapterRedb {
	db: redb::Database,
	path: PathBuf,
	config: AdapterConfig,
}

impl StoreAdapterRedb {
	/// Open (or create) the store at `storage_path/tollgate.db`
	pub async fn new(storage_path: impl AsRef<Path>, config: AdapterConfig) -> TgResult<Self> {
		let storage_path = storage_path.as_ref();
		tokio::fs::create_dir_all(storage_path).await.map_err(Error::from)?;
		let path = storage_path.join("tollgate.db");

		let db = redb::Database::create(&path)
			.map_err(|e| Error::DbError(format!("Failed to open database: {}", e)))?;

		let tx = db
			.begin_write()
			.map_err(|e| Error::DbError(format!("Failed to begin write transaction: {}", e)))?;
		tx.open_table(TABLE_BUCKETS)
			.map_err(|e| Error::DbError(format!("Failed to create buckets table: {}", e)))?;
		tx.open_table(TABLE_PROFILES)
			.map_err(|e| Error::DbError(format!("Failed to create profiles table: {}", e)))?;
		tx.commit()
			.map_err(|e| Error::DbError(format!("Failed to commit table creation: {}", e)))?;

		info!("Opened store at {}", path.display());
		Ok(Self { db, path, config })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn is_expired(&self, stored_at: f64, now: f64) -> bool {
		now - stored_at > self.config.ttl.as_secs_f64()
	}

	fn read<T: DeserializeOwned>(&self, table: JsonTable, client_id: &str) -> Result<Option<T>, Error> {
		let tx = self
			.db
			.begin_read()
			.map_err(|e| Error::DbError(format!("Failed to begin read transaction: {}", e)))?;
		let table = tx
			.open_table(table)
			.map_err(|e| Error::DbError(format!("Failed to open table: {}", e)))?;

		let Some(value) = table
			.get(client_id)
			.map_err(|e| Error::DbError(format!("Failed to read entry: {}", e)))?
		else {
			return Ok(None);
		};

		let entry: Entry<T> = serde_json::from_str(value.value())?;
		if self.is_expired(entry.stored_at, now_secs()) {
			trace!("Entry for {} expired", client_id);
			return Ok(None);
		}
		Ok(Some(entry.value))
	}

	fn write<T: Serialize>(&self, writes: &[(JsonTable, &str, &T)]) -> Result<(), Error> {
		let stored_at = now_secs();
		let tx = self
			.db
			.begin_write()
			.map_err(|e| Error::DbError(format!("Failed to begin write transaction: {}", e)))?;
		for (table, client_id, value) in writes {
			let json = serde_json::to_string(&Entry { stored_at, value })?;
			let mut table = tx
				.open_table(*table)
				.map_err(|e| Error::DbError(format!("Failed to open table: {}", e)))?;
			table
				.insert(*client_id, json.as_str())
				.map_err(|e| Error::DbError(format!("Failed to write entry: {}", e)))?;
		}
		tx.commit().map_err(|e| Error::DbError(format!("Failed to commit write: {}", e)))?;
		Ok(())
	}

	/// Remove expired entries from both tables, returning how many were removed
	pub fn purge_expired(&self) -> TgResult<usize> {
		let now = now_secs();
		let tx = self
			.db
			.begin_write()
			.map_err(|e| Error::DbError(format!("Failed to begin write transaction: {}", e)))?;

		let mut removed = 0;
		for definition in [TABLE_BUCKETS, TABLE_PROFILES] {
			let mut table = tx
				.open_table(definition)
				.map_err(|e| Error::DbError(format!("Failed to open table: {}", e)))?;

			let mut expired = Vec::new();
			let iter = table.iter().map_err(|e| Error::DbError(format!("Failed to scan table: {}", e)))?;
			for item in iter {
				let (key, value) =
					item.map_err(|e| Error::DbError(format!("Failed to iterate table: {}", e)))?;
				// Only the timestamp matters here
				let entry: Entry<serde_json::Value> =
					serde_json::from_str(value.value()).map_err(Error::from)?;
				if self.is_expired(entry.stored_at, now) {
					expired.push(key.value().to_string());
				}
			}

			for key in &expired {
				table
					.remove(key.as_str())
					.map_err(|e| Error::DbError(format!("Failed to remove entry: {}", e)))?;
			}
			removed += expired.len();
		}

		tx.commit().map_err(|e| Error::DbError(format!("Failed to commit purge: {}", e)))?;
		debug!("Purged {} expired entries", removed);
		Ok(removed)
	}
}

#[async_trait::async_trait]
impl StoreAdapter for StoreAdapterRedb {
	async fn load_bucket(&self, client_id: &str) -> TgResult<Option<BucketSnapshot>> {
		Ok(self.read(TABLE_BUCKETS, client_id)?)
	}

	async fn store_bucket(&self, client_id: &str, bucket: &BucketSnapshot) -> TgResult<()> {
		Ok(self.write(&[(TABLE_BUCKETS, client_id, bucket)])?)
	}

	async fn load_profile(&self, client_id: &str) -> TgResult<Option<ProfileRecord>> {
		Ok(self.read(TABLE_PROFILES, client_id)?)
	}

	async fn store_profile(&self, client_id: &str, profile: &ProfileRecord) -> TgResult<()> {
		Ok(self.write(&[(TABLE_PROFILES, client_id, profile)])?)
	}

	/// Both halves in one transaction
	async fn store_snapshot(&self, snapshot: &ClientSnapshot) -> TgResult<()> {
		let bucket = serde_json::to_value(snapshot.bucket).map_err(TgError::from)?;
		let profile = serde_json::to_value(&snapshot.profile).map_err(TgError::from)?;
		self.write(&[
			(TABLE_BUCKETS, &*snapshot.client_id, &bucket),
			(TABLE_PROFILES, &*snapshot.client_id, &profile),
		])?;
		trace!("Stored snapshot for {}", snapshot.client_id);
		Ok(())
	}
}

// vim: ts=4
