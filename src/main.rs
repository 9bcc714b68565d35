//! Broker binary.
//!
//! Runs the engine over the in-process loopback connection; attaching to a
//! real AMQP router is done by the surrounding gateway.

use std::sync::Arc;

use amqp_mqtt_broker::Engine;
use amqp_mqtt_broker::config::{load_config, load_config_from};
use amqp_mqtt_broker::transport::MemoryConnection;
use amqp_mqtt_broker::utils::logging;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "amqp-mqtt-broker", about = "MQTT pub/sub routing engine over AMQP links")]
struct Args {
    /// Configuration file, replacing config/default
    #[arg(long)]
    config: Option<String>,

    /// Log level, overriding logging.level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Broker failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> amqp_mqtt_broker::Result<()> {
    let settings = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            logging::init(args.log_level.as_deref().unwrap_or("info"));
            return Err(e);
        }
    };
    logging::init(args.log_level.as_deref().unwrap_or(&settings.logging.level));

    info!(
        host = %settings.connection.host,
        port = settings.connection.port,
        container_id = %settings.connection.container_id,
        "starting broker on loopback connection"
    );

    let connection = Arc::new(MemoryConnection::new());
    let handle = Engine::start(connection, settings.broker)?;
    let client = handle.client();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received. Exiting gracefully.");
    client.shutdown().await?;

    handle.join().await;
    Ok(())
}
