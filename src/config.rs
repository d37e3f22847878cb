//! Bridge configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so an
//! empty file (or no file at all) gives a bridge for `/dev/ttyUSB0` and a
//! broker on `localhost:1883`:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [mqtt]
//! host = "localhost"
//! port = 1883
//! client_id = "lora-bridge"
//! keep_alive_secs = 30
//!
//! [topics]
//! sensors = "invernadero/sensores"
//! control = "invernadero/control"
//!
//! [bridge]
//! poll_interval_ms = 100
//! retry_settle_ms = 500
//! restart_delay_secs = 5
//! publish_mode = "eager"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::bridge::{
    BridgeSettings, DEFAULT_CONTROL_TOPIC, DEFAULT_SENSOR_TOPIC, PublishMode,
};
use crate::bus::MqttConfig;
use crate::error::Result;
use crate::transport::serial::{DEFAULT_BAUD_RATE, SerialConfig};

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    /// Serial port path.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// MQTT broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MqttSection {
    /// Broker host.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Client identifier.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "lora-bridge".to_string(),
            keep_alive_secs: 30,
        }
    }
}

/// Topic names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicsSection {
    /// Topic sensor readings are published to.
    pub sensors: String,
    /// Topic control commands are received on.
    pub control: String,
}

impl Default for TopicsSection {
    fn default() -> Self {
        Self {
            sensors: DEFAULT_SENSOR_TOPIC.to_string(),
            control: DEFAULT_CONTROL_TOPIC.to_string(),
        }
    }
}

/// Bridge timing and behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSection {
    /// Pause between transport polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Pause after resending an ignored command, in milliseconds.
    pub retry_settle_ms: u64,
    /// Pause before restarting a failed session, in seconds.
    pub restart_delay_secs: u64,
    /// How sensor frames are published.
    pub publish_mode: PublishMode,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            retry_settle_ms: 500,
            restart_delay_secs: 5,
            publish_mode: PublishMode::Eager,
        }
    }
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Serial port settings.
    pub serial: SerialSection,
    /// MQTT broker settings.
    pub mqtt: MqttSection,
    /// Topic names.
    pub topics: TopicsSection,
    /// Bridge timing and behavior.
    pub bridge: BridgeSection,
}

impl BridgeConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the configuration file at `path`, or the defaults if `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        tracing::info!("loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Returns the serial transport configuration.
    #[must_use]
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::new(&self.serial.port).baud_rate(self.serial.baud_rate)
    }

    /// Returns the MQTT connection configuration.
    #[must_use]
    pub fn mqtt_config(&self) -> MqttConfig {
        MqttConfig::new(&self.mqtt.host, &self.mqtt.client_id)
            .port(self.mqtt.port)
            .keep_alive(Duration::from_secs(self.mqtt.keep_alive_secs))
    }

    /// Returns the bridge session settings.
    #[must_use]
    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            sensor_topic: self.topics.sensors.clone(),
            control_topic: self.topics.control.clone(),
            poll_interval: Duration::from_millis(self.bridge.poll_interval_ms),
            retry_settle: Duration::from_millis(self.bridge.retry_settle_ms),
            publish_mode: self.bridge.publish_mode,
        }
    }

    /// Returns the pause before restarting a failed session.
    #[must_use]
    pub const fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.bridge.restart_delay_secs)
    }
}
