//! Robot Arena Server
//!
//! Authoritative server for the turn-based 1v1 robot arena.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use robot_arena::{
    config::ArenaConfig,
    game::{catalog::Catalog, engine::ArenaEngine},
    network::{session::ArenaSession, server::GameServer},
    VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Robot Arena Server v{}", VERSION);

    let config = ArenaConfig::from_env().context("invalid configuration")?;
    let catalog = Catalog::from_path(&config.catalog_path)
        .with_context(|| format!("failed to load catalog from {}", config.catalog_path.display()))?;
    info!(
        robots = catalog.robots().count(),
        weapons = catalog.weapons().count(),
        "Catalog loaded"
    );

    let seed = config.seed();
    let match_config = config.match_config();
    info!(
        seed,
        cols = match_config.grid.width,
        rows = match_config.grid.height,
        ap = match_config.action_points,
        "Arena configured"
    );

    let engine = ArenaEngine::new(seed, match_config, Arc::new(catalog));
    let server = Arc::new(GameServer::new(config.server_config(), ArenaSession::shared(engine)));

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            let _ = shutdown.send(());
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
