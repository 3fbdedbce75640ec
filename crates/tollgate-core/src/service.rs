//! Admission service
//!
//! Owns an engine together with its background tasks: the stats ticker and,
//! when a store is attached, the persistence writer. Must be started inside a
//! tokio runtime.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tollgate_types::store_adapter::StoreAdapter;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::engine::AdmissionEngine;
use crate::persist::spawn_persister;
use crate::prelude::*;
use crate::ticker::spawn_stats_ticker;

#[derive(Debug)]
pub struct AdmissionService {
	engine: Arc<AdmissionEngine>,
	cancel: CancellationToken,
	tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AdmissionService {
	pub fn start(config: EngineConfig, store: Option<Arc<dyn StoreAdapter>>) -> TgResult<Self> {
		Self::start_with_clock(config, store, Arc::new(SystemClock))
	}

	pub fn start_with_clock(
		config: EngineConfig,
		store: Option<Arc<dyn StoreAdapter>>,
		clock: Arc<dyn Clock>,
	) -> TgResult<Self> {
		config.validate()?;

		let cancel = CancellationToken::new();
		let mut tasks = Vec::with_capacity(2);
		let stats_interval = config.stats_interval;
		let persist_queue = config.persist_queue;

		let mut engine = AdmissionEngine::new(config, clock);
		if let Some(store) = store {
			let (handle, task) = spawn_persister(Arc::clone(&store), persist_queue, cancel.child_token());
			engine = engine.with_store(store, handle);
			tasks.push(task);
		}
		let engine = Arc::new(engine);
		tasks.push(spawn_stats_ticker(Arc::clone(&engine), stats_interval, cancel.child_token()));

		info!(
			rate = engine.config().rate,
			burst = engine.config().burst,
			"admission service started"
		);
		Ok(Self { engine, cancel, tasks: Mutex::new(tasks) })
	}

	pub fn engine(&self) -> &Arc<AdmissionEngine> {
		&self.engine
	}

	/// Stop background tasks, flushing queued snapshots to the store
	pub async fn shutdown(&self) {
		self.cancel.cancel();
		let tasks = std::mem::take(&mut *self.tasks.lock());
		for task in tasks {
			if let Err(err) = task.await {
				error!("admission background task failed: {}", err);
			}
		}
		info!("admission service stopped");
	}
}

impl Drop for AdmissionService {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}


// vim: ts=4
