//! Write-through persistence queue.
//!
//! The admission path never waits on the store: snapshots are offered to a
//! bounded channel and a background task writes them out. When the queue is
//! full the snapshot is dropped, the next request from the same client will
//! offer a fresher one anyway.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_types::store_adapter::{ClientSnapshot, StoreAdapter};

use crate::prelude::*;

/// Sending side of the persistence queue
#[derive(Debug, Clone)]
pub struct PersistHandle {
	tx: flume::Sender<ClientSnapshot>,
	dropped: Arc<AtomicU64>,
}

impl PersistHandle {
	/// Queue a snapshot without blocking. Returns false if it was dropped.
	pub fn offer(&self, snapshot: ClientSnapshot) -> bool {
		match self.tx.try_send(snapshot) {
			Ok(()) => true,
			Err(flume::TrySendError::Full(snapshot)) => {
				let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
				debug!(client_id = %snapshot.client_id, dropped, "persist queue full, snapshot dropped");
				false
			}
			Err(flume::TrySendError::Disconnected(_)) => false,
		}
	}

	pub fn dropped_count(&self) -> u64 {
		self.dropped.load(Ordering::Relaxed)
	}

	pub fn pending(&self) -> usize {
		self.tx.len()
	}
}

/// Spawn the writer task. It runs until `cancel` fires, then drains what is
/// already queued before exiting.
pub fn spawn_persister(
	store: Arc<dyn StoreAdapter>,
	capacity: usize,
	cancel: CancellationToken,
) -> (PersistHandle, JoinHandle<()>) {
	let (tx, rx) = flume::bounded::<ClientSnapshot>(capacity);
	let handle = PersistHandle { tx, dropped: Arc::new(AtomicU64::new(0)) };

	let task = tokio::spawn(async move {
		loop {
			tokio::select! {
				() = cancel.cancelled() => break,
				res = rx.recv_async() => match res {
					Ok(snapshot) => write(store.as_ref(), &snapshot).await,
					Err(_) => return,
				},
			}
		}

		let mut drained = 0usize;
		while let Ok(snapshot) = rx.try_recv() {
			write(store.as_ref(), &snapshot).await;
			drained += 1;
		}
		debug!(drained, "persister stopped");
	});

	(handle, task)
}

async fn write(store: &dyn StoreAdapter, snapshot: &ClientSnapshot) {
	if let Err(err) = store.store_snapshot(snapshot).await {
		warn!(client_id = %snapshot.client_id, "failed to persist client state: {}", err);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory_store::MemoryStore;
	use tollgate_types::store_adapter::{BucketSnapshot, ProfileRecord};

	fn snapshot(client_id: &str, tokens: f64) -> ClientSnapshot {
		ClientSnapshot {
			client_id: client_id.into(),
			bucket: BucketSnapshot { tokens, last_refill: 100.0 },
			profile: ProfileRecord {
				classification: Classification::Normal,
				score: 0.0,
				blocked_count: 0,
			},
		}
	}

	#[tokio::test]
	async fn test_snapshots_reach_store() {
		let store = Arc::new(MemoryStore::new());
		let cancel = CancellationToken::new();
		let (handle, task) = spawn_persister(store.clone(), 16, cancel.clone());

		assert!(handle.offer(snapshot("a", 3.0)));
		assert!(handle.offer(snapshot("a", 2.0)));
		cancel.cancel();
		task.await.unwrap();

		let bucket = store.load_bucket("a").await.unwrap().unwrap();
		assert!((bucket.tokens - 2.0).abs() < f64::EPSILON);
	}

	#[tokio::test]
	async fn test_full_queue_drops() {
		let store = Arc::new(MemoryStore::new());
		let cancel = CancellationToken::new();
		cancel.cancel();
		// Cancelled before the first poll, so nothing is consumed until drain
		let (handle, task) = spawn_persister(store.clone(), 1, cancel);

		let accepted = (0..4).filter(|i| handle.offer(snapshot("a", f64::from(*i)))).count();
		assert!(accepted >= 1);
		assert_eq!(handle.dropped_count() as usize, 4 - accepted);
		task.await.unwrap();
	}
}

// vim: ts=4
