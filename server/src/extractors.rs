//! Client Identity Extraction
//!
//! The admission engine keys everything by an opaque client id. Here that id
//! is the client's IP address, taken from the connection or, behind a
//! reverse proxy, from the forwarding headers.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use hyper::Request;

/// Id used when no address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerMode {
	/// Clients connect directly; the peer address is the client
	#[default]
	Standalone,
	/// Behind a reverse proxy; trust forwarding headers first
	Proxy,
}

/// Extract client IP from request based on ServerMode
pub fn extract_client_ip<B>(req: &Request<B>, mode: ServerMode) -> Option<IpAddr> {
	let peer = || req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip());
	match mode {
		ServerMode::Standalone => peer(),
		ServerMode::Proxy => extract_from_xff(req).or_else(|| extract_from_x_real_ip(req)).or_else(peer),
	}
}

/// Client id for the admission engine
pub fn extract_client_id<B>(req: &Request<B>, mode: ServerMode) -> Box<str> {
	extract_client_ip(req, mode).map_or_else(|| UNKNOWN_CLIENT.into(), |ip| ip.to_string().into())
}

/// Extract IP from X-Forwarded-For header
fn extract_from_xff<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		// "client, proxy1, proxy2": the leftmost entry is the original client
		.and_then(|s| s.split(',').next().map(str::trim).and_then(|ip| ip.parse().ok()))
}

/// Extract IP from X-Real-IP header
fn extract_from_x_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(peer: Option<[u8; 4]>, xff: Option<&str>) -> Request<()> {
		let mut builder = Request::builder().uri("/hello");
		if let Some(xff) = xff {
			builder = builder.header("x-forwarded-for", xff);
		}
		let mut req = builder.body(()).unwrap();
		if let Some(ip) = peer {
			req.extensions_mut().insert(ConnectInfo(SocketAddr::from((ip, 40000))));
		}
		req
	}

	#[test]
	fn test_standalone_ignores_headers() {
		let req = request(Some([10, 0, 0, 1]), Some("203.0.113.9"));
		assert_eq!(&*extract_client_id(&req, ServerMode::Standalone), "10.0.0.1");
	}

	#[test]
	fn test_proxy_uses_first_hop() {
		let req = request(Some([10, 0, 0, 1]), Some("203.0.113.9, 10.0.0.1"));
		assert_eq!(&*extract_client_id(&req, ServerMode::Proxy), "203.0.113.9");

		let req = request(Some([10, 0, 0, 1]), Some("garbage"));
		assert_eq!(&*extract_client_id(&req, ServerMode::Proxy), "10.0.0.1");
	}

	#[test]
	fn test_no_address() {
		let req = request(None, None);
		assert_eq!(&*extract_client_id(&req, ServerMode::Standalone), UNKNOWN_CLIENT);
	}
}

// vim: ts=4
