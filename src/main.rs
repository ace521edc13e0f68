use std::sync::{Arc, Mutex};

use tracing::{error, info};

use mqpush::bridge::Bridge;
use mqpush::config::load_config;
use mqpush::mqtt::MqttLink;
use mqpush::transport::websocket::start_websocket_server;
use mqpush::utils::error::BridgeError;
use mqpush::utils::logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init(&std::env::var("MQPUSH_LOG").unwrap_or_else(|_| "info".to_string()));

    if let Err(e) = run().await {
        error!(error = %e, "bridge failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BridgeError> {
    let config = load_config()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let bridge = Arc::new(Mutex::new(Bridge::new()));
    let (link, commands) = MqttLink::connect(&config.mqtt, bridge.clone());
    tokio::spawn(link.run());

    tokio::select! {
        result = start_websocket_server(addr, bridge, commands, config.bridge.clone()) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting gracefully");
            Ok(())
        }
    }
}
