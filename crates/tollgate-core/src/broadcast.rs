//! Admission Event Fan-out
//!
//! Publishes every admission decision (and periodic stats) to any number of
//! listeners. Each listener owns a bounded queue; publishing never blocks and
//! never fails. A full queue drops the event for that listener only, and a
//! listener whose receiving side is gone is removed during the publish pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use flume::TrySendError;
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::prelude::*;
use crate::stats::GlobalStats;

pub type ListenerId = Uuid;

type Registry = RwLock<HashMap<ListenerId, flume::Sender<Arc<AdmissionEvent>>>>;

/// One admission decision
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
	pub client_id: ClientId,
	pub path: Box<str>,
	pub allowed: bool,
	pub classification: Classification,
	pub score: f64,
	/// Seconds since the UNIX epoch
	pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AdmissionEvent {
	Request(RequestEvent),
	Stats(GlobalStats),
}

/// Result of a publish pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
	pub delivered: usize,
	/// Listeners whose queue was full
	pub dropped: usize,
	/// Listeners found disconnected and removed
	pub removed: usize,
}

/// Result of waiting on a listener
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerPoll {
	Event(Arc<AdmissionEvent>),
	/// Nothing arrived within the wait; send a keepalive downstream
	Keepalive,
	/// The listener was unsubscribed or the broadcaster is gone
	Closed,
}

#[derive(Debug)]
pub struct Broadcaster {
	listeners: Arc<Registry>,
	capacity: usize,
	published: AtomicU64,
	dropped: AtomicU64,
}

impl Broadcaster {
	pub fn new(capacity: usize) -> Self {
		Self {
			listeners: Arc::new(RwLock::new(HashMap::new())),
			capacity: capacity.max(1),
			published: AtomicU64::new(0),
			dropped: AtomicU64::new(0),
		}
	}

	/// Register a listener with its own bounded queue
	pub fn subscribe(&self) -> Listener {
		let (sender, receiver) = flume::bounded(self.capacity);
		let id = Uuid::new_v4();
		self.listeners.write().insert(id, sender);
		debug!(listener = %id, "listener subscribed");
		Listener { id, receiver, registry: Arc::downgrade(&self.listeners) }
	}

	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		let removed = self.listeners.write().remove(&id).is_some();
		if removed {
			debug!(listener = %id, "listener unsubscribed");
		}
		removed
	}

	/// Offer `event` to every listener without blocking.
	///
	/// The registry lock is held only to copy the sender list and, afterwards,
	/// to remove disconnected listeners.
	pub fn publish(&self, event: AdmissionEvent) -> PublishOutcome {
		let senders: Vec<(ListenerId, flume::Sender<Arc<AdmissionEvent>>)> =
			self.listeners.read().iter().map(|(id, tx)| (*id, tx.clone())).collect();
		self.published.fetch_add(1, Ordering::Relaxed);

		if senders.is_empty() {
			return PublishOutcome::default();
		}

		let event = Arc::new(event);
		let mut outcome = PublishOutcome::default();
		let mut disconnected = Vec::new();

		for (id, sender) in senders {
			match sender.try_send(Arc::clone(&event)) {
				Ok(()) => outcome.delivered += 1,
				Err(TrySendError::Full(_)) => {
					outcome.dropped += 1;
					trace!(listener = %id, "listener queue full, event dropped");
				}
				Err(TrySendError::Disconnected(_)) => disconnected.push(id),
			}
		}

		if outcome.dropped > 0 {
			self.dropped.fetch_add(outcome.dropped as u64, Ordering::Relaxed);
		}
		if !disconnected.is_empty() {
			let mut listeners = self.listeners.write();
			for id in &disconnected {
				listeners.remove(id);
			}
			drop(listeners);
			outcome.removed = disconnected.len();
			debug!(count = outcome.removed, "removed disconnected listeners");
		}

		outcome
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.read().len()
	}

	/// Events published since start
	pub fn published_count(&self) -> u64 {
		self.published.load(Ordering::Relaxed)
	}

	/// Per-listener deliveries dropped on full queues since start
	pub fn dropped_count(&self) -> u64 {
		self.dropped.load(Ordering::Relaxed)
	}
}

impl Default for Broadcaster {
	fn default() -> Self {
		Self::new(100)
	}
}

/// Receiving side of a subscription. Dropping it deregisters the listener.
pub struct Listener {
	id: ListenerId,
	receiver: flume::Receiver<Arc<AdmissionEvent>>,
	registry: Weak<Registry>,
}

impl Listener {
	pub fn id(&self) -> ListenerId {
		self.id
	}

	/// Wait up to `wait` for the next event
	pub async fn next(&self, wait: Duration) -> ListenerPoll {
		match tokio::time::timeout(wait, self.receiver.recv_async()).await {
			Ok(Ok(event)) => ListenerPoll::Event(event),
			Ok(Err(_)) => ListenerPoll::Closed,
			Err(_) => ListenerPoll::Keepalive,
		}
	}

	/// Take a queued event without waiting
	pub fn try_next(&self) -> Option<Arc<AdmissionEvent>> {
		self.receiver.try_recv().ok()
	}

	pub fn pending(&self) -> usize {
		self.receiver.len()
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		if let Some(registry) = self.registry.upgrade() {
			registry.write().remove(&self.id);
		}
	}
}


// vim: ts=4
