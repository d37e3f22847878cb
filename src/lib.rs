//! # lora-mqtt-bridge
//!
//! A bridge between a LoRa point-to-point serial radio and an MQTT broker.
//!
//! The radio module (RAK-style AT firmware in P2P mode) reports received
//! packets as hex-encoded text lines. The bridge decodes them, publishes
//! sensor reports as JSON, and turns JSON control commands from the broker
//! into compact wire commands sent back over the radio.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - One serial port shared by a reader task and a writer task
//! - Both vendor receive formats (`+EVT:RXP2P` and `at+recv=`)
//! - Single-shot resend of the last command when the device ignores it
//! - Automatic session restart on serial or broker failure
//!
//! ## Quick Start
//!
//! ```no_run
//! use lora_mqtt_bridge::{BridgeConfig, supervise};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lora_mqtt_bridge::Error> {
//!     let config = BridgeConfig::default();
//!     let cancel = CancellationToken::new();
//!
//!     supervise(config, cancel).await
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Line extraction, message classification, command translation
//! - [`transport`] - Transport implementations (currently USB/Serial)
//! - [`bus`] - Publish/subscribe abstraction and the MQTT implementation
//! - [`retry`] - Memory of the last transmitted command
//! - [`bridge`] - The two bridge tasks and the session supervisor
//! - [`config`] - TOML configuration

pub mod bridge;
pub mod bus;
pub mod config;
pub mod error;
pub mod protocol;
pub mod retry;
pub mod transport;

// Re-exports for convenience
pub use bridge::supervisor::supervise;
pub use bridge::{Bridge, BridgeSettings, PublishMode};
pub use bus::{BusMessage, BusStream, MessageBus, MqttBus, MqttConfig};
pub use config::BridgeConfig;
pub use error::{Error, FrameError, Result};
pub use protocol::{
    ControlCommand, Message, SensorFrame, SensorReading, SensorValue, Target, WireCommand,
    classify, decode_line, hex_to_text, text_to_hex, translate,
};
pub use retry::RetryState;
pub use transport::{SerialTransport, Transport, serial::SerialConfig, serial::list_ports};
