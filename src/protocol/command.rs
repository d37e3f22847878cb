//! Control commands and their wire encoding.
//!
//! Commands arrive from the bus as JSON (`{"target": "servo", "value": 90}`)
//! and leave over the radio as a compact `<Code>:<value>` string.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Deserialize;

use super::frame::{encode_send, text_to_hex};

/// Actuators the field device understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Water pump.
    Bomba,
    /// Vent servo.
    Servo,
    /// Fan motor.
    Motor,
}

impl Target {
    /// Returns the single-letter wire code.
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::Bomba => 'B',
            Self::Servo => 'S',
            Self::Motor => 'M',
        }
    }

}

/// Error returned when a target name is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTarget(pub String);

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown target {:?}", self.0)
    }
}

impl std::error::Error for UnknownTarget {}

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bomba" => Ok(Self::Bomba),
            "servo" => Ok(Self::Servo),
            "motor" => Ok(Self::Motor),
            _ => Err(UnknownTarget(s.to_string())),
        }
    }
}

/// A control command received from the bus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlCommand {
    /// Target actuator name.
    #[serde(default)]
    pub target: String,
    /// Value to apply.
    #[serde(default)]
    pub value: i64,
}

impl ControlCommand {
    /// Creates a new command.
    #[must_use]
    pub fn new(target: impl Into<String>, value: i64) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }

    /// Parses a command from a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a JSON object with the
    /// expected field types.
    pub fn from_json(payload: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// A command ready to be sent over the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCommand {
    text: String,
    hex: String,
}

impl WireCommand {
    /// Builds the wire command for a target and value.
    #[must_use]
    pub fn new(target: Target, value: i64) -> Self {
        let text = format!("{}:{}", target.code(), value);
        let hex = text_to_hex(&text);
        Self { text, hex }
    }

    /// Returns the plain text form, e.g. `S:90`.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the hex encoded form.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Returns the hex form as a transport payload.
    #[must_use]
    pub fn payload(&self) -> Bytes {
        Bytes::copy_from_slice(self.hex.as_bytes())
    }

    /// Returns the framed send instruction.
    #[must_use]
    pub fn frame(&self) -> Bytes {
        encode_send(self.hex.as_bytes())
    }
}

impl fmt::Display for WireCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Translates a control command into its wire form.
///
/// Returns `None` for unknown targets.
#[must_use]
pub fn translate(command: &ControlCommand) -> Option<WireCommand> {
    let target = command.target.parse::<Target>().ok()?;
    Some(WireCommand::new(target, command.value))
}
