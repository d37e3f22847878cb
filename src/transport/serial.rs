//! Serial transport implementation.
//!
//! This module provides serial port communication with a RAK-style LoRa
//! module running AT firmware in P2P mode.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPortBuilderExt, SerialStream};

use crate::error::{Error, Result};
use crate::protocol::frame::{LINE_TERMINATOR, LineDecoder, encode_send};
use crate::transport::Transport;

/// Default baud rate for the radio module.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default delay after opening the port before configuring the module.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Module configuration sent on connect, each followed by its settle delay.
///
/// Switches the module to P2P mode, sets 923.7 MHz / SF7 / 125 kHz /
/// CR 4/5 / preamble 10 / 14 dBm, then enables continuous receive.
pub const STARTUP_SEQUENCE: &[(&str, Duration)] = &[
    ("AT+NWM=0", Duration::from_secs(2)),
    ("AT+P2P=923700000:7:125:0:10:14", Duration::from_secs(1)),
    ("at+PRECV=65533", Duration::from_secs(1)),
];

/// Size of a single read from the port.
const READ_CHUNK: usize = 256;

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Delay after opening the port before the startup sequence.
    pub settle_delay: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the settle delay.
    #[must_use]
    pub const fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Serial transport for the radio module.
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
    decoder: LineDecoder,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
            decoder: LineDecoder::new(),
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Writes a raw AT instruction followed by the line terminator.
    async fn write_line(stream: &mut SerialStream, command: &str) -> Result<()> {
        tracing::debug!("AT > {}", command);
        stream.write_all(command.as_bytes()).await?;
        stream.write_all(LINE_TERMINATOR.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Runs the fixed module configuration and discards anything it echoed.
    async fn configure(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        tokio::time::sleep(self.config.settle_delay).await;

        for (command, delay) in STARTUP_SEQUENCE {
            Self::write_line(stream, command).await?;
            tokio::time::sleep(*delay).await;
        }

        tokio_serial::SerialPort::clear(&*stream, ClearBuffer::Input)?;
        self.decoder.clear();

        tracing::info!("radio module configured for P2P receive");
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!("connecting to serial port: {}", self.config.port);

            let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .open_native_async()
                .map_err(Error::Serial)?;
            self.stream = Some(stream);

            if let Err(e) = self.configure().await {
                self.stream = None;
                return Err(e);
            }

            tracing::info!("connected to serial port");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.stream.take().is_some() {
                tracing::info!("disconnecting from serial port");
            }
            self.decoder.clear();
            Ok(())
        })
    }

    fn try_read_line(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            if let Some(line) = self.decoder.next_line() {
                return Ok(Some(line));
            }

            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            let available = read_len(tokio_serial::SerialPort::bytes_to_read(&*stream)?);
            if available == 0 {
                return Ok(None);
            }

            let mut buf = [0u8; READ_CHUNK];
            let n = stream.read(&mut buf[..available]).await?;
            tracing::trace!("received {} bytes", n);
            self.decoder.feed(&buf[..n]);

            Ok(self.decoder.next_line())
        })
    }

    fn send(&mut self, hex: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            let frame = encode_send(&hex);
            tracing::trace!("sending frame: {} bytes", frame.len());

            stream.write_all(&frame).await?;
            stream.flush().await?;

            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Bytes to read in one attempt, given what the OS reports as pending.
fn read_len(pending: u32) -> usize {
    usize::try_from(pending).map_or(READ_CHUNK, |n| n.min(READ_CHUNK))
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.settle_delay, DEFAULT_SETTLE_DELAY);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyUSB0")
            .baud_rate(9600)
            .settle_delay(Duration::from_millis(10));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.settle_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_startup_sequence_order() {
        let commands: Vec<&str> = STARTUP_SEQUENCE.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            commands,
            ["AT+NWM=0", "AT+P2P=923700000:7:125:0:10:14", "at+PRECV=65533"]
        );
    }

    #[test]
    fn test_read_len_capped_to_chunk() {
        assert_eq!(read_len(0), 0);
        assert_eq!(read_len(12), 12);
        assert_eq!(read_len(u32::MAX), READ_CHUNK);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut transport = SerialTransport::with_port("/dev/null-radio");
        assert!(!transport.is_connected());
        transport.disconnect().await.unwrap();
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_io_requires_connection() {
        let mut transport = SerialTransport::with_port("/dev/null-radio");
        assert!(matches!(
            transport.try_read_line().await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            transport.send(Bytes::from_static(b"4d3a31")).await,
            Err(Error::NotConnected)
        ));
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        // Just verify it doesn't panic
        let _ = list_ports();
    }
}
