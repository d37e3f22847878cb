//! Protocol definitions for the radio link.
//!
//! This module contains the radio-side protocol types including:
//! - Line extraction and hex framing
//! - Classification of decoded messages
//! - Control command translation

pub mod command;
pub mod frame;
pub mod message;

pub use command::{ControlCommand, Target, UnknownTarget, WireCommand, translate};
pub use frame::{LineDecoder, decode_line, encode_send, hex_to_text, text_to_hex};
pub use message::{Message, SensorFrame, SensorKey, SensorReading, SensorValue, classify};
