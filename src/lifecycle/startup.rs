//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The header policy is compiled before the listener binds, so the
//!   gateway never serves a response without it
//! - Listeners start last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Build the server, bind, and serve until SIGINT/SIGTERM.
pub async fn start(config: GatewayConfig) -> Result<(), StartupError> {
    let server = HttpServer::new(config)?;
    let config = server.config();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        security_headers = config.security.enabled,
        custom_policies = config.security.policies.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    let signal_task = signals::spawn_signal_handler(shutdown.clone());

    let result = server.run(listener, shutdown.subscribe()).await;
    signal_task.abort();

    tracing::info!("Shutdown complete");
    Ok(result?)
}
