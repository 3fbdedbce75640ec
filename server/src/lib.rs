//! HTTP front end for the Tollgate admission engine.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod prelude;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tollgate_core::AdmissionService;
use tollgate_store_adapter_redb::{AdapterConfig, StoreAdapterRedb};
use tollgate_types::store_adapter::StoreAdapter;

use crate::config::ServerConfig;
use crate::extractors::ServerMode;
use crate::prelude::*;

pub use crate::middleware::AdmissionLayer;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AdmissionService>,
	pub mode: ServerMode,
}

/// Open the store (if configured), start the admission service and serve
/// until ctrl-c.
pub async fn run(config: ServerConfig) -> TgResult<()> {
	let store: Option<Arc<dyn StoreAdapter>> = match &config.store_path {
		Some(path) => {
			let adapter = StoreAdapterRedb::new(path, AdapterConfig { ttl: config.store_ttl }).await?;
			let purged = adapter.purge_expired()?;
			info!("Store ready, {} expired entries purged", purged);
			Some(Arc::new(adapter))
		}
		None => None,
	};

	let service = Arc::new(AdmissionService::start(config.engine.clone(), store)?);
	let router = routes::init(AppState { service: service.clone(), mode: config.mode });

	let listener = tokio::net::TcpListener::bind(config.listen.as_ref()).await?;
	info!("Listening on {} ({:?} mode)", config.listen, config.mode);
	axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	service.shutdown().await;
	Ok(())
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for shutdown signal: {}", err);
		std::future::pending::<()>().await;
	}
	info!("Shutting down");
}

// vim: ts=4
