//! Publish/subscribe message bus.
//!
//! The bridge only needs two operations from the bus: publishing a payload
//! to a topic, and a stream of messages arriving on a subscribed topic.
//! [`mqtt::MqttBus`] implements them over an MQTT broker.

pub mod mqtt;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;

/// A message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload.
    pub payload: Bytes,
}

impl BusMessage {
    /// Creates a new message.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Stream of messages for one subscription.
///
/// The stream ends when the bus connection is lost.
pub type BusStream = BoxStream<'static, BusMessage>;

/// Trait for message bus implementations.
pub trait MessageBus: Send + Sync {
    /// Publishes a payload to a topic.
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Subscribes to a topic.
    fn subscribe<'a>(
        &'a self,
        topic: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BusStream>> + Send + 'a>>;
}

pub use mqtt::{MqttBus, MqttConfig};
