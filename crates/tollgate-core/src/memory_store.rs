//! In-process store adapter.
//!
//! Keeps snapshots in concurrent maps with no expiry. Used by tests and as a
//! stand-in when no persistent store is configured but hydration should
//! still work across engine instances within one process.

use async_trait::async_trait;
use dashmap::DashMap;
use tollgate_types::store_adapter::{BucketSnapshot, ProfileRecord, StoreAdapter};

use crate::prelude::*;

#[derive(Debug, Default)]
pub struct MemoryStore {
	buckets: DashMap<ClientId, BucketSnapshot>,
	profiles: DashMap<ClientId, ProfileRecord>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.buckets.len().max(self.profiles.len())
	}

	pub fn is_empty(&self) -> bool {
		self.buckets.is_empty() && self.profiles.is_empty()
	}
}

#[async_trait]
impl StoreAdapter for MemoryStore {
	async fn load_bucket(&self, client_id: &str) -> TgResult<Option<BucketSnapshot>> {
		Ok(self.buckets.get(client_id).map(|b| *b.value()))
	}

	async fn store_bucket(&self, client_id: &str, bucket: &BucketSnapshot) -> TgResult<()> {
		self.buckets.insert(client_id.into(), *bucket);
		Ok(())
	}

	async fn load_profile(&self, client_id: &str) -> TgResult<Option<ProfileRecord>> {
		Ok(self.profiles.get(client_id).map(|p| p.value().clone()))
	}

	async fn store_profile(&self, client_id: &str, profile: &ProfileRecord) -> TgResult<()> {
		self.profiles.insert(client_id.into(), profile.clone());
		Ok(())
	}
}


// vim: ts=4
