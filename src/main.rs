//! Pose Broadcast Server - Entry Point
//!
//! Streams robot joint states to WebSocket viewers at a fixed rate.

use log::{error, info};

use pose_broadcast_server::config::ServerConfig;
use pose_broadcast_server::error::handlers::{handle_error, is_fatal};
use pose_broadcast_server::serve;
use pose_broadcast_server::utils::setup_logging;

#[tokio::main]
async fn main() {
    setup_logging();

    info!("Launching pose broadcast server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = serve(config, shutdown).await {
        handle_error(&e);
        if is_fatal(&e) {
            std::process::exit(1);
        }
    }
}
