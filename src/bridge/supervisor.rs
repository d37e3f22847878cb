//! Session supervision.
//!
//! A session ends when the serial port or the broker connection fails. The
//! supervisor logs the failure, waits, and starts a fresh session with a
//! newly opened port and broker connection.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::bridge::Bridge;
use crate::bus::MqttBus;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::transport::{SerialTransport, Transport};

/// Runs bridge sessions until `cancel` fires.
pub async fn supervise(config: BridgeConfig, cancel: CancellationToken) -> Result<()> {
    let restart_delay = config.restart_delay();

    loop {
        match run_session(&config, &cancel).await {
            Ok(()) if cancel.is_cancelled() => break,
            Ok(()) => tracing::warn!("bridge session ended"),
            Err(e) => tracing::error!("bridge session failed: {}", e),
        }

        tracing::info!("restarting bridge in {}s", restart_delay.as_secs());
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(restart_delay) => {}
        }
    }

    tracing::info!("bridge stopped");
    Ok(())
}

/// Opens the port and the broker connection and runs one session.
async fn run_session(config: &BridgeConfig, cancel: &CancellationToken) -> Result<()> {
    let mut transport = SerialTransport::new(config.serial_config());

    tokio::select! {
        () = cancel.cancelled() => return Ok(()),
        result = transport.connect() => result?,
    }

    let mqtt_config = config.mqtt_config();
    let bus = tokio::select! {
        () = cancel.cancelled() => None,
        result = MqttBus::connect(&mqtt_config) => Some(result),
    };
    let bus = match bus {
        Some(Ok(bus)) => Arc::new(bus),
        Some(Err(e)) => {
            transport.disconnect().await?;
            return Err(e);
        }
        None => {
            transport.disconnect().await?;
            return Ok(());
        }
    };

    let bridge = Bridge::new(
        Arc::new(Mutex::new(transport)),
        Arc::clone(&bus),
        config.bridge_settings(),
    );
    let result = bridge.run(cancel.clone()).await;

    if let Err(e) = bus.disconnect().await {
        tracing::debug!("MQTT disconnect failed: {}", e);
    }

    result
}
