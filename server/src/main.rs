use std::process::ExitCode;

use tollgate_server::config::ServerConfig;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.init();

	let config = match ServerConfig::from_env() {
		Ok(config) => config,
		Err(err) => {
			error!("{}", err);
			return ExitCode::FAILURE;
		}
	};

	if let Err(err) = tollgate_server::run(config).await {
		error!("{}", err);
		return ExitCode::FAILURE;
	}
	ExitCode::SUCCESS
}

// vim: ts=4
