//! Periodic global stats publisher

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::broadcast::AdmissionEvent;
use crate::engine::AdmissionEngine;
use crate::prelude::*;

/// Publish a stats event every `period` until `cancel` fires.
///
/// Ticks with no listeners attached skip the snapshot entirely.
pub fn spawn_stats_ticker(
	engine: Arc<AdmissionEngine>,
	period: Duration,
	cancel: CancellationToken,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// The first tick completes immediately
		interval.tick().await;

		loop {
			tokio::select! {
				() = cancel.cancelled() => break,
				_ = interval.tick() => {
					let broadcaster = engine.broadcaster();
					if broadcaster.listener_count() == 0 {
						continue;
					}
					let outcome = broadcaster.publish(AdmissionEvent::Stats(engine.global_stats()));
					trace!(delivered = outcome.delivered, dropped = outcome.dropped, "stats published");
				}
			}
		}
		debug!("stats ticker stopped");
	})
}


// vim: ts=4
