//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, with OpenAPI/Swagger UI at `/swagger-ui`. The
//! workspace's `healthdid-run` binary does the same after loading a `.env` file.

use api_rest::AppState;
use healthdid_core::{Collaborators, CoreConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the healthdid REST API server
///
/// # Environment Variables
/// - `HEALTHDID_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `HEALTHDID_*`: core configuration, see [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the core configuration or local stores cannot be set up,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("HEALTHDID_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env()?);
    tracing::info!(
        "-- Starting healthdid REST API on {} (chain {}, data in {})",
        addr,
        cfg.chain_id(),
        cfg.data_dir().display()
    );
    let collaborators = Collaborators::local(&cfg)?;

    api_rest::serve(&addr, AppState::new(cfg, collaborators)).await
}
