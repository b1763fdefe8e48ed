use api_rest::AppState;
use healthdid_core::{Collaborators, CoreConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the healthdid application
///
/// Loads `.env`, resolves the core configuration and serves the REST API with Swagger UI.
///
/// # Environment Variables
/// - `HEALTHDID_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HEALTHDID_DATA_DIR`: Directory for the content store, registry ledger and exports
///   (default: "healthdid_data")
/// - `HEALTHDID_CHAIN_ID`: Chain DIDs are registered on (default: 5)
/// - `HEALTHDID_ENCRYPTION_KEY`: 64 hex master key; a key file in the data dir is used otherwise
/// - `HEALTHDID_GATEWAY`: Profile URI gateway template (default: "https://{cid}.ipfs.dweb.link")
/// - `HEALTHDID_BLOCK_CONFIRMATIONS`: Confirmations reported on registry receipts (default: 10)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthdid=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("HEALTHDID_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = Arc::new(CoreConfig::from_env()?);

    tracing::info!("++ Starting healthdid REST on {}", rest_addr);
    tracing::info!(
        "++ Chain {}, data directory {}",
        cfg.chain_id(),
        cfg.data_dir().display()
    );

    let collaborators = Collaborators::local(&cfg)?;
    api_rest::serve(&rest_addr, AppState::new(cfg, collaborators)).await
}
