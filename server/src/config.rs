//! Server configuration from the environment

use std::path::PathBuf;
use std::time::Duration;

use tollgate_core::EngineConfig;

use crate::extractors::ServerMode;
use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub listen: Box<str>,
	pub mode: ServerMode,
	/// Directory of the redb store; no store when unset
	pub store_path: Option<PathBuf>,
	pub store_ttl: Duration,
	pub engine: EngineConfig,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			listen: "0.0.0.0:5000".into(),
			mode: ServerMode::Standalone,
			store_path: None,
			store_ttl: Duration::from_secs(3600),
			engine: EngineConfig::default(),
		}
	}
}

impl ServerConfig {
	pub fn from_env() -> TgResult<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TgResult<Self> {
		let mut config = Self { engine: EngineConfig::from_lookup(&lookup)?, ..Self::default() };

		if let Some(listen) = lookup("TOLLGATE_LISTEN") {
			config.listen = listen.trim().into();
		}
		if let Some(mode) = lookup("TOLLGATE_MODE") {
			config.mode = match mode.trim().to_ascii_lowercase().as_str() {
				"standalone" => ServerMode::Standalone,
				"proxy" => ServerMode::Proxy,
				other => {
					return Err(Error::ConfigError(format!("TOLLGATE_MODE: unknown mode '{}'", other)));
				}
			};
		}
		if let Some(path) = lookup("TOLLGATE_STORE_PATH").filter(|p| !p.trim().is_empty()) {
			config.store_path = Some(PathBuf::from(path.trim()));
		}
		if let Some(ttl) = lookup("TOLLGATE_STORE_TTL_SECS") {
			let secs: u64 = ttl.trim().parse().map_err(|_| {
				Error::ConfigError(format!("TOLLGATE_STORE_TTL_SECS: invalid value '{}'", ttl))
			})?;
			config.store_ttl = Duration::from_secs(secs);
		}

		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> =
			vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
		move |key| vars.get(key).cloned()
	}

	#[test]
	fn test_defaults() {
		let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
		assert_eq!(&*config.listen, "0.0.0.0:5000");
		assert_eq!(config.mode, ServerMode::Standalone);
		assert!(config.store_path.is_none());
		assert_eq!(config.store_ttl, Duration::from_secs(3600));
	}

	#[test]
	fn test_overrides() {
		let config = ServerConfig::from_lookup(lookup(&[
			("TOLLGATE_LISTEN", "127.0.0.1:8080"),
			("TOLLGATE_MODE", "Proxy"),
			("TOLLGATE_STORE_PATH", "/var/lib/tollgate"),
			("RATE", "2"),
		]))
		.unwrap();
		assert_eq!(&*config.listen, "127.0.0.1:8080");
		assert_eq!(config.mode, ServerMode::Proxy);
		assert_eq!(config.store_path, Some(PathBuf::from("/var/lib/tollgate")));
		assert!((config.engine.rate - 2.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_invalid_mode() {
		let result = ServerConfig::from_lookup(lookup(&[("TOLLGATE_MODE", "mesh")]));
		assert!(matches!(result, Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
