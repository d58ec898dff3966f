use std::net::SocketAddr;

use storage_gateway::{config::Config, routes::create_router, storage, utils, AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Connect to object storage
    let store = storage::connect(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to configure storage: {}", e))?;
    info!(
        provider = %config.storage.provider,
        bucket = %config.storage.bucket,
        "Object storage ready"
    );

    let state = AppState::new(config.clone(), store);
    let app = create_router(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
