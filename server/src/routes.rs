//! HTTP routes
//!
//! `/hello` sits behind the admission layer. The `/api` routes are read-only
//! views of the engine and are not themselves admitted.

use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use futures::Stream;
use tollgate_core::{ClientSummary, GlobalStats, ListenerPoll, ProfileSnapshot};

use crate::AppState;
use crate::middleware::AdmissionLayer;
use crate::prelude::*;

/// How long an event stream waits before sending a keepalive comment
const EVENT_KEEPALIVE: Duration = Duration::from_secs(15);

pub fn init(state: AppState) -> Router {
	let admitted = Router::new()
		.route("/hello", get(hello))
		.route_layer(AdmissionLayer::new(state.service.engine().clone(), state.mode));

	let api = Router::new()
		.route("/api/profile/{id}", get(get_profile))
		.route("/api/clients", get(list_clients))
		.route("/api/stats", get(get_stats))
		.route("/api/events", get(get_events));

	admitted.merge(api).with_state(state)
}

async fn hello() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "message": "Hello, world!" }))
}

async fn get_profile(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> ApiResult<Json<ProfileSnapshot>> {
	state.service.engine().get_profile(&id).map(Json).ok_or(ApiError::NotFound)
}

async fn list_clients(State(state): State<AppState>) -> Json<Vec<ClientSummary>> {
	Json(state.service.engine().list_active_clients())
}

async fn get_stats(State(state): State<AppState>) -> Json<GlobalStats> {
	Json(state.service.engine().global_stats())
}

/// Server-sent stream of admission and stats events
async fn get_events(
	State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
	let listener = state.service.engine().broadcaster().subscribe();
	debug!(listener = %listener.id(), "event stream opened");

	let stream = futures::stream::unfold(listener, |listener| async move {
		match listener.next(EVENT_KEEPALIVE).await {
			ListenerPoll::Event(event) => Some((Event::default().json_data(event.as_ref()), listener)),
			ListenerPoll::Keepalive => Some((Ok(Event::default().comment("keepalive")), listener)),
			ListenerPoll::Closed => None,
		}
	});

	Sse::new(stream)
}

// vim: ts=4
