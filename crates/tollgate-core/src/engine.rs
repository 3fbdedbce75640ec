//! Admission Engine
//!
//! Evaluates one request per call: the client's profile is appended to,
//! scored and classified, and the resulting overrides drive the token bucket.
//! All of this happens inside a per-client critical section so two concurrent
//! requests from one client cannot both act on a stale classification.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tollgate_types::store_adapter::{ClientSnapshot, ProfileRecord, StoreAdapter};

use crate::broadcast::{AdmissionEvent, Broadcaster, RequestEvent};
use crate::classifier::{self, BehaviorProfile, Signal, RATE_WINDOW};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::persist::PersistHandle;
use crate::prelude::*;
use crate::rate_limit::{BucketState, LimiterStats, TokenBucket};
use crate::stats::{GlobalCounters, GlobalStats};

/// User agents reported in a profile snapshot
const SNAPSHOT_USER_AGENTS: usize = 3;

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResult {
	pub allowed: bool,
	pub classification: Classification,
	pub score: f64,
	/// Time until the next token, set only when rejected
	#[serde(skip)]
	pub retry_after: Option<Duration>,
}

/// Read-only view of one client's profile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
	pub client_id: ClientId,
	pub classification: Classification,
	pub score: f64,
	#[serde(rename = "requests60s")]
	pub requests_60s: usize,
	pub blocked_count: u64,
	pub unique_paths: usize,
	pub dynamic_rate: Option<f64>,
	pub dynamic_burst: Option<f64>,
	pub user_agents: Vec<Box<str>>,
	pub signals: Vec<Signal>,
	pub tokens: f64,
}

/// Dashboard row for an active client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
	pub client_id: ClientId,
	pub classification: Classification,
	pub score: f64,
	#[serde(rename = "requests60s")]
	pub requests_60s: usize,
	pub blocked_count: u64,
	pub signals: Vec<Signal>,
}

type ProfileEntry = Arc<Mutex<BehaviorProfile>>;

#[derive(Debug)]
pub struct AdmissionEngine {
	config: EngineConfig,
	clock: Arc<dyn Clock>,
	limiter: TokenBucket,
	profiles: DashMap<ClientId, ProfileEntry>,
	counters: GlobalCounters,
	broadcaster: Arc<Broadcaster>,
	store: Option<Arc<dyn StoreAdapter>>,
	persist: Option<PersistHandle>,
}

impl AdmissionEngine {
	pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
		let now = clock.now();
		Self {
			limiter: TokenBucket::new(config.rate, config.burst),
			broadcaster: Arc::new(Broadcaster::new(config.listener_queue)),
			counters: GlobalCounters::new(now),
			profiles: DashMap::new(),
			store: None,
			persist: None,
			config,
			clock,
		}
	}

	/// Attach a write-through store; snapshots are queued on `persist`
	pub fn with_store(mut self, store: Arc<dyn StoreAdapter>, persist: PersistHandle) -> Self {
		self.store = Some(store);
		self.persist = Some(persist);
		self
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn broadcaster(&self) -> &Arc<Broadcaster> {
		&self.broadcaster
	}

	pub fn limiter_stats(&self) -> LimiterStats {
		self.limiter.stats()
	}

	/// Admit or reject one request from `client_id`. Never fails.
	pub fn evaluate(&self, client_id: &str, path: &str, user_agent: &str) -> AdmissionResult {
		let now = self.clock.now();
		let entry = self.profile_entry(client_id);

		let mut profile = entry.lock();
		let previous = profile.classification();

		profile.record(now, path, user_agent, self.config.max_user_agents);
		let assessment = classifier::assess(&profile, now);
		profile.apply(&assessment);

		let decision = self.limiter.allow(client_id, assessment.overrides, now);
		if !decision.allowed {
			profile.record_block();
		}

		if let Some(persist) = &self.persist {
			let bucket = self
				.limiter
				.state(client_id)
				.unwrap_or(BucketState { tokens: decision.tokens, last_refill: now });
			persist.offer(ClientSnapshot {
				client_id: client_id.into(),
				bucket: bucket.into(),
				profile: ProfileRecord {
					classification: assessment.classification,
					score: assessment.score,
					blocked_count: profile.blocked_count(),
				},
			});
		}
		drop(profile);

		if assessment.classification != previous {
			info!(
				client_id = %client_id,
				from = %previous,
				to = %assessment.classification,
				score = assessment.score,
				"client reclassified"
			);
		}
		debug!(
			client_id = %client_id,
			path = %path,
			allowed = decision.allowed,
			classification = %assessment.classification,
			score = assessment.score,
			tokens = decision.tokens,
			"admission evaluated"
		);

		self.counters.record(now);
		self.broadcaster.publish(AdmissionEvent::Request(RequestEvent {
			client_id: client_id.into(),
			path: path.into(),
			allowed: decision.allowed,
			classification: assessment.classification,
			score: assessment.score,
			timestamp: now,
		}));

		AdmissionResult {
			allowed: decision.allowed,
			classification: assessment.classification,
			score: assessment.score,
			retry_after: decision.retry_after,
		}
	}

	/// Restore a client's bucket and block history from the store.
	///
	/// Only clients not yet seen by this process are restored. Store failures
	/// are logged and treated as "nothing stored".
	///
	/// The bucket and `blocked_count` carry over into admission decisions.
	/// The stored tier and score only show in `get_profile` and
	/// `list_active_clients` until the first `evaluate`, which rescores from
	/// the (empty) request windows.
	pub async fn hydrate(&self, client_id: &str) -> bool {
		let Some(store) = &self.store else {
			return false;
		};
		if self.profiles.contains_key(client_id) {
			return false;
		}

		let bucket = store.load_bucket(client_id).await.unwrap_or_else(|err| {
			warn!(client_id = %client_id, "failed to load bucket: {}", err);
			None
		});
		let record = store.load_profile(client_id).await.unwrap_or_else(|err| {
			warn!(client_id = %client_id, "failed to load profile: {}", err);
			None
		});

		let mut restored = false;
		if let Some(bucket) = bucket {
			restored |= self.limiter.restore(client_id, bucket.into());
		}
		if let Some(record) = record {
			self.profiles.entry(client_id.into()).or_insert_with(|| {
				restored = true;
				let mut profile = BehaviorProfile::new();
				profile.blocked_count = record.blocked_count;
				profile.classification = record.classification;
				profile.score = record.score;
				profile.overrides = classifier::overrides_for(record.classification);
				Arc::new(Mutex::new(profile))
			});
		}

		if restored {
			debug!(client_id = %client_id, "client state restored from store");
		}
		restored
	}

	pub fn get_profile(&self, client_id: &str) -> Option<ProfileSnapshot> {
		let entry = self.profiles.get(client_id).map(|e| Arc::clone(e.value()))?;
		let now = self.clock.now();
		let profile = entry.lock();
		let overrides = profile.overrides();

		Some(ProfileSnapshot {
			client_id: client_id.into(),
			classification: profile.classification(),
			score: profile.score(),
			requests_60s: profile.count_recent(now, RATE_WINDOW),
			blocked_count: profile.blocked_count(),
			unique_paths: profile.unique_paths(),
			dynamic_rate: overrides.rate,
			dynamic_burst: overrides.burst,
			user_agents: profile.user_agents().take(SNAPSHOT_USER_AGENTS).map(Into::into).collect(),
			signals: profile.signals().to_vec(),
			tokens: self.limiter.tokens(client_id),
		})
	}

	/// Clients worth showing, highest score first.
	///
	/// Normal clients without requests in the last minute are left out.
	pub fn list_active_clients(&self) -> Vec<ClientSummary> {
		let now = self.clock.now();
		let mut clients: Vec<ClientSummary> = self
			.entries()
			.into_iter()
			.filter_map(|(client_id, entry)| {
				let profile = entry.lock();
				let requests_60s = profile.count_recent(now, RATE_WINDOW);
				if requests_60s == 0 && profile.classification() == Classification::Normal {
					return None;
				}
				Some(ClientSummary {
					client_id,
					classification: profile.classification(),
					score: profile.score(),
					requests_60s,
					blocked_count: profile.blocked_count(),
					signals: profile.signals().to_vec(),
				})
			})
			.collect();

		clients.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.client_id.cmp(&b.client_id)));
		clients
	}

	pub fn global_stats(&self) -> GlobalStats {
		let now = self.clock.now();
		let mut population = BTreeMap::new();
		for (_, entry) in self.entries() {
			let profile = entry.lock();
			if profile.count_recent(now, RATE_WINDOW) > 0 {
				*population.entry(profile.classification()).or_insert(0) += 1;
			}
		}
		self.counters.snapshot(now, population)
	}

	pub fn tracked_clients(&self) -> usize {
		self.profiles.len()
	}

	fn profile_entry(&self, client_id: &str) -> ProfileEntry {
		if let Some(entry) = self.profiles.get(client_id) {
			return Arc::clone(entry.value());
		}
		let entry = self
			.profiles
			.entry(client_id.into())
			.or_insert_with(|| Arc::new(Mutex::new(BehaviorProfile::new())));
		Arc::clone(entry.value())
	}

	/// Copy out the profile handles so no map guard is held while locking
	fn entries(&self) -> Vec<(ClientId, ProfileEntry)> {
		self.profiles.iter().map(|e| (e.key().clone(), Arc::clone(e.value()))).collect()
	}
}


// vim: ts=4
