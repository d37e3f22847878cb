//! MQTT implementation of the message bus.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::bus::{BusMessage, BusStream, MessageBus};
use crate::error::Result;

/// Default broker port.
pub const DEFAULT_PORT: u16 = 1883;

/// Default keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Default capacity of the request and incoming message queues.
pub const DEFAULT_CAPACITY: usize = 64;

/// Configuration for the MQTT connection.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Client identifier.
    pub client_id: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Queue capacity.
    pub capacity: usize,
}

impl MqttConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            client_id: client_id.into(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Sets the broker port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub const fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Message bus backed by an MQTT broker.
///
/// A background task drives the connection and fans incoming publishes out
/// to subscribers. When the connection fails the task stops and every
/// subscription stream ends.
pub struct MqttBus {
    client: AsyncClient,
    incoming: broadcast::Receiver<BusMessage>,
    pump: Option<JoinHandle<()>>,
}

impl MqttBus {
    /// Connects to the broker and waits for the connection to be accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker cannot be reached or refuses the
    /// connection.
    pub async fn connect(config: &MqttConfig) -> Result<Self> {
        tracing::info!("connecting to MQTT broker {}:{}", config.host, config.port);

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);

        let (client, mut eventloop) = AsyncClient::new(options, config.capacity);

        loop {
            if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
                break;
            }
        }

        tracing::info!("connected to MQTT broker");

        let (sender, incoming) = broadcast::channel(config.capacity);
        let pump = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        tracing::trace!(
                            "MQTT < {} ({} bytes)",
                            publish.topic,
                            publish.payload.len()
                        );
                        // No subscribers is fine
                        let _ = sender.send(BusMessage {
                            topic: publish.topic,
                            payload: publish.payload,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("MQTT connection lost: {}", e);
                        return;
                    }
                }
            }
        });

        Ok(Self {
            client,
            incoming,
            pump: Some(pump),
        })
    }

    /// Disconnects from the broker.
    pub async fn disconnect(&self) -> Result<()> {
        self.client.disconnect().await?;
        Ok(())
    }
}

/// Turns a broadcast receiver into a stream of messages for one topic.
fn topic_stream(receiver: broadcast::Receiver<BusMessage>, topic: String) -> BusStream {
    stream::unfold((receiver, topic), |(mut receiver, topic)| async move {
        loop {
            match receiver.recv().await {
                Ok(message) if message.topic == topic => {
                    return Some((message, (receiver, topic)));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("dropped {} messages on {}", n, topic);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

impl MessageBus for MqttBus {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.client
                .publish_bytes(topic, QoS::AtLeastOnce, false, payload)
                .await?;
            Ok(())
        })
    }

    fn subscribe<'a>(
        &'a self,
        topic: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<BusStream>> + Send + 'a>> {
        Box::pin(async move {
            // Register the receiver first so nothing published after the
            // SUBSCRIBE is missed.
            let receiver = self.incoming.resubscribe();
            self.client.subscribe(topic, QoS::AtLeastOnce).await?;
            tracing::info!("subscribed to {}", topic);
            Ok(topic_stream(receiver, topic.to_string()))
        })
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
