//! Store adapter operation tests
//!
//! Round trips, expiry, and reopening an existing database file

use std::time::Duration;

use tempfile::TempDir;
use tollgate_store_adapter_redb::{AdapterConfig, StoreAdapterRedb};
use tollgate_types::Classification;
use tollgate_types::store_adapter::{BucketSnapshot, ClientSnapshot, ProfileRecord, StoreAdapter};

async fn create_test_adapter(ttl: Duration) -> (StoreAdapterRedb, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = StoreAdapterRedb::new(temp_dir.path(), AdapterConfig { ttl })
		.await
		.expect("Failed to create adapter");
	(adapter, temp_dir)
}

fn snapshot(client_id: &str) -> ClientSnapshot {
	ClientSnapshot {
		client_id: client_id.into(),
		bucket: BucketSnapshot { tokens: 2.5, last_refill: 1_700_000_000.25 },
		profile: ProfileRecord { classification: Classification::Suspicious, score: 45.0, blocked_count: 4 },
	}
}

#[tokio::test]
async fn test_unknown_client() {
	let (adapter, _temp) = create_test_adapter(Duration::from_secs(3600)).await;

	assert!(adapter.load_bucket("nobody").await.expect("Failed to load").is_none());
	assert!(adapter.load_profile("nobody").await.expect("Failed to load").is_none());
}

#[tokio::test]
async fn test_snapshot_round_trip() {
	let (adapter, _temp) = create_test_adapter(Duration::from_secs(3600)).await;
	let snap = snapshot("10.0.0.1");

	adapter.store_snapshot(&snap).await.expect("Failed to store snapshot");

	let bucket = adapter.load_bucket("10.0.0.1").await.expect("Failed to load").expect("missing bucket");
	assert_eq!(bucket, snap.bucket);
	let profile = adapter.load_profile("10.0.0.1").await.expect("Failed to load").expect("missing profile");
	assert_eq!(profile, snap.profile);

	// Other clients are unaffected
	assert!(adapter.load_bucket("10.0.0.2").await.expect("Failed to load").is_none());
}

#[tokio::test]
async fn test_overwrite_keeps_latest() {
	let (adapter, _temp) = create_test_adapter(Duration::from_secs(3600)).await;

	adapter
		.store_bucket("a", &BucketSnapshot { tokens: 9.0, last_refill: 10.0 })
		.await
		.expect("Failed to store");
	adapter
		.store_bucket("a", &BucketSnapshot { tokens: 3.0, last_refill: 11.0 })
		.await
		.expect("Failed to store");

	let bucket = adapter.load_bucket("a").await.expect("Failed to load").expect("missing bucket");
	assert!((bucket.tokens - 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_expired_entries_read_as_absent() {
	let (adapter, _temp) = create_test_adapter(Duration::from_millis(20)).await;
	adapter.store_snapshot(&snapshot("a")).await.expect("Failed to store snapshot");

	tokio::time::sleep(Duration::from_millis(60)).await;

	assert!(adapter.load_bucket("a").await.expect("Failed to load").is_none());
	assert!(adapter.load_profile("a").await.expect("Failed to load").is_none());
	assert_eq!(adapter.purge_expired().expect("Failed to purge"), 2);
	assert_eq!(adapter.purge_expired().expect("Failed to purge"), 0);
}

#[tokio::test]
async fn test_reopen_keeps_entries() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	{
		let adapter = StoreAdapterRedb::new(temp_dir.path(), AdapterConfig::default())
			.await
			.expect("Failed to create adapter");
		adapter.store_snapshot(&snapshot("a")).await.expect("Failed to store snapshot");
	}

	let adapter = StoreAdapterRedb::new(temp_dir.path(), AdapterConfig::default())
		.await
		.expect("Failed to reopen adapter");
	let profile = adapter.load_profile("a").await.expect("Failed to load").expect("missing profile");
	assert_eq!(profile.blocked_count, 4);
	assert_eq!(adapter.purge_expired().expect("Failed to purge"), 0);
}

// vim: ts=4
