//! Admission Middleware
//!
//! Tower layer that runs every request through the admission engine before
//! it reaches the wrapped service.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::USER_AGENT;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use hyper::Request;
use tollgate_core::AdmissionEngine;
use tower::{Layer, Service};

use crate::error::{CLIENT_CLASS_HEADER, Error};
use crate::extractors::{ServerMode, extract_client_id};

#[derive(Clone)]
pub struct AdmissionLayer {
	engine: Arc<AdmissionEngine>,
	mode: ServerMode,
}

impl AdmissionLayer {
	pub fn new(engine: Arc<AdmissionEngine>, mode: ServerMode) -> Self {
		Self { engine, mode }
	}
}

impl<S> Layer<S> for AdmissionLayer {
	type Service = AdmissionMiddleware<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AdmissionMiddleware { inner, engine: self.engine.clone(), mode: self.mode }
	}
}

#[derive(Clone)]
pub struct AdmissionMiddleware<S> {
	inner: S,
	engine: Arc<AdmissionEngine>,
	mode: ServerMode,
}

impl<S> Service<Request<Body>> for AdmissionMiddleware<S>
where
	S: Service<Request<Body>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let engine = self.engine.clone();
		let client_id = extract_client_id(&req, self.mode);
		// Take the service that was driven to readiness, leave a fresh clone behind
		let clone = self.inner.clone();
		let mut inner = std::mem::replace(&mut self.inner, clone);

		Box::pin(async move {
			let user_agent = req.headers().get(USER_AGENT).and_then(|h| h.to_str().ok()).unwrap_or("");

			engine.hydrate(&client_id).await;
			let result = engine.evaluate(&client_id, req.uri().path(), user_agent);

			if !result.allowed {
				return Ok(Error::RateLimited {
					classification: result.classification,
					retry_after: result.retry_after,
				}
				.into_response());
			}

			let mut response = inner.call(req).await?;
			if let Ok(val) = result.classification.as_str().parse() {
				response.headers_mut().insert(CLIENT_CLASS_HEADER, val);
			}
			Ok(response)
		})
	}
}

// vim: ts=4
