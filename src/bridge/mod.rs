//! Bridge between the radio link and the message bus.
//!
//! A bridge session runs two tasks over one shared transport:
//!
//! - the **radio reader** polls the transport for received lines, publishes
//!   sensor reports and resends the last command when the device reports it
//!   ignored one;
//! - the **bus listener** turns control messages into wire commands and
//!   transmits them.
//!
//! The transport mutex is only held for a single read attempt or a single
//! write, never while talking to the bus.

pub mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::MessageBus;
use crate::error::{Error, Result};
use crate::protocol::frame::decode_lossy;
use crate::protocol::{
    ControlCommand, Message, SensorFrame, SensorReading, classify, decode_line, hex_to_text,
    translate,
};
use crate::retry::RetryState;
use crate::transport::Transport;

/// Default topic sensor readings are published to.
pub const DEFAULT_SENSOR_TOPIC: &str = "invernadero/sensores";

/// Default topic control commands are received on.
pub const DEFAULT_CONTROL_TOPIC: &str = "invernadero/control";

/// Default pause between transport polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default pause after resending an ignored command.
pub const DEFAULT_RETRY_SETTLE: Duration = Duration::from_millis(500);

/// How sensor frames are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishMode {
    /// Publish the accumulated reading after every item of a frame.
    #[default]
    Eager,
    /// Publish the complete reading once per frame.
    PerFrame,
}

/// Settings for a bridge session.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Topic sensor readings are published to.
    pub sensor_topic: String,
    /// Topic control commands are received on.
    pub control_topic: String,
    /// Pause between transport polls.
    pub poll_interval: Duration,
    /// Pause after resending an ignored command.
    pub retry_settle: Duration,
    /// How sensor frames are published.
    pub publish_mode: PublishMode,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            sensor_topic: DEFAULT_SENSOR_TOPIC.to_string(),
            control_topic: DEFAULT_CONTROL_TOPIC.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_settle: DEFAULT_RETRY_SETTLE,
            publish_mode: PublishMode::default(),
        }
    }
}

/// State shared by both tasks of a session.
struct Shared<T, B> {
    transport: Arc<Mutex<T>>,
    bus: Arc<B>,
    retry: RetryState,
    settings: BridgeSettings,
}

/// A bridge session over a connected transport and bus.
pub struct Bridge<T, B> {
    shared: Arc<Shared<T, B>>,
}

impl<T, B> Bridge<T, B>
where
    T: Transport + 'static,
    B: MessageBus + 'static,
{
    /// Creates a new bridge.
    #[must_use]
    pub fn new(transport: Arc<Mutex<T>>, bus: Arc<B>, settings: BridgeSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                bus,
                retry: RetryState::new(),
                settings,
            }),
        }
    }

    /// Returns the retry state of this session.
    #[must_use]
    pub fn retry_state(&self) -> &RetryState {
        &self.shared.retry
    }

    /// Runs both tasks until one of them fails or `cancel` fires.
    ///
    /// The transport is disconnected and the retry state cleared before
    /// returning.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let session = cancel.child_token();

        let mut reader: JoinHandle<Result<()>> =
            tokio::spawn(read_radio(Arc::clone(&self.shared), session.clone()));
        let mut listener: JoinHandle<Result<()>> =
            tokio::spawn(listen_bus(Arc::clone(&self.shared), session.clone()));

        let (first, other) = tokio::select! {
            result = &mut reader => (result, listener),
            result = &mut listener => (result, reader),
        };

        session.cancel();
        let second = other.await;

        {
            let mut transport = self.shared.transport.lock().await;
            if let Err(e) = transport.disconnect().await {
                tracing::warn!("failed to release transport: {}", e);
            }
        }
        self.shared.retry.clear().await;

        flatten(first).and(flatten(second))
    }
}

/// Converts a task outcome into a bridge result.
fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| Error::Task(e.to_string()))?
}

/// Radio reader task.
async fn read_radio<T, B>(shared: Arc<Shared<T, B>>, cancel: CancellationToken) -> Result<()>
where
    T: Transport,
    B: MessageBus,
{
    tracing::info!("radio reader started");

    while !cancel.is_cancelled() {
        let line = {
            let mut transport = shared.transport.lock().await;
            transport.try_read_line().await?
        };

        if let Some(line) = line {
            handle_line(&shared, &line, &cancel).await?;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(shared.settings.poll_interval) => {}
        }
    }

    tracing::info!("radio reader stopped");
    Ok(())
}

/// Acts on a single received line.
async fn handle_line<T, B>(
    shared: &Shared<T, B>,
    line: &str,
    cancel: &CancellationToken,
) -> Result<()>
where
    T: Transport,
    B: MessageBus,
{
    tracing::trace!("RX < {}", line);

    let Some(hex) = decode_line(line) else {
        return Ok(());
    };

    let text = hex_to_text(hex);
    tracing::info!("received message: {}", text);

    match classify(&text) {
        Message::Ignored => resend_last(shared, cancel).await,
        Message::SensorComposite(frame) => {
            publish_frame(shared, &frame).await;
            Ok(())
        }
        Message::Unrecognized => {
            tracing::debug!("ignoring unrecognized message: {}", text);
            Ok(())
        }
    }
}

/// Resends the last transmitted command once.
///
/// The settle delay after the resend ends early when `cancel` fires.
async fn resend_last<T, B>(shared: &Shared<T, B>, cancel: &CancellationToken) -> Result<()>
where
    T: Transport,
    B: MessageBus,
{
    let Some(command) = shared.retry.last().await else {
        tracing::warn!("device ignored a command but none is stored");
        return Ok(());
    };

    tracing::info!("device ignored last command, resending {}", command);

    {
        let mut transport = shared.transport.lock().await;
        transport.send(command.payload()).await?;
    }

    tokio::select! {
        () = cancel.cancelled() => {}
        () = tokio::time::sleep(shared.settings.retry_settle) => {}
    }
    Ok(())
}

/// Publishes the readings of a sensor frame.
async fn publish_frame<T, B>(shared: &Shared<T, B>, frame: &SensorFrame)
where
    B: MessageBus,
{
    let readings: &[SensorReading] = match shared.settings.publish_mode {
        PublishMode::Eager => frame.updates(),
        PublishMode::PerFrame => frame.reading().map(std::slice::from_ref).unwrap_or_default(),
    };

    let topic = &shared.settings.sensor_topic;
    for reading in readings {
        let payload = match reading.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("failed to encode sensor reading: {}", e);
                continue;
            }
        };

        match shared.bus.publish(topic, Bytes::from(payload.clone())).await {
            Ok(()) => tracing::debug!("published to {}: {}", topic, payload),
            Err(e) => tracing::warn!("failed to publish sensor reading: {}", e),
        }
    }
}

/// Bus listener task.
async fn listen_bus<T, B>(shared: Arc<Shared<T, B>>, cancel: CancellationToken) -> Result<()>
where
    T: Transport,
    B: MessageBus,
{
    let topic = &shared.settings.control_topic;
    let mut messages = shared.bus.subscribe(topic).await?;
    tracing::info!("bus listener started on {}", topic);

    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => break,
            message = messages.next() => message,
        };

        let Some(message) = message else {
            tracing::warn!("subscription to {} ended", topic);
            return Err(Error::BusClosed);
        };

        handle_command(&shared, &message.payload).await?;
    }

    tracing::info!("bus listener stopped");
    Ok(())
}

/// Translates and transmits a single control message.
async fn handle_command<T, B>(shared: &Shared<T, B>, payload: &[u8]) -> Result<()>
where
    T: Transport,
{
    let command = match ControlCommand::from_json(payload) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(
                "skipping malformed control message {:?}: {}",
                decode_lossy(payload),
                e
            );
            return Ok(());
        }
    };

    let Some(wire) = translate(&command) else {
        tracing::warn!("no wire command for target {:?}", command.target);
        return Ok(());
    };

    {
        let mut transport = shared.transport.lock().await;
        transport.send(wire.payload()).await?;
    }

    tracing::info!("TX > {} ({})", wire, wire.hex());
    shared.retry.remember(wire).await;
    Ok(())
}
