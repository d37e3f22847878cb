//! Error types for the bridge.

use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// MQTT request could not be queued.
    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// MQTT connection failed or was lost.
    #[error("MQTT connection error: {0}")]
    MqttConnection(#[from] rumqttc::ConnectionError),

    /// JSON encoding/decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The bus subscription ended.
    #[error("message bus closed")]
    BusClosed,

    /// A bridge task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(String),
}

/// Frame-specific errors.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload is not valid hexadecimal.
    #[error("invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
