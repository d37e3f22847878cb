use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use lora_mqtt_bridge::{BridgeConfig, list_ports, supervise};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Bridge a LoRa P2P serial radio to an MQTT broker.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the radio module
    #[arg(short, long)]
    port: Option<String>,

    /// MQTT broker host
    #[arg(long)]
    mqtt_host: Option<String>,

    /// MQTT broker port
    #[arg(long)]
    mqtt_port: Option<u16>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    if args.list_ports {
        for port in list_ports()? {
            println!("{port}");
        }
        return Ok(());
    }

    let mut config = BridgeConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(host) = args.mqtt_host {
        config.mqtt.host = host;
    }
    if let Some(port) = args.mqtt_port {
        config.mqtt.port = port;
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });

    supervise(config, cancel).await?;
    Ok(())
}
