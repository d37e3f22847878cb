//! Transport layer for the radio module.
//!
//! This module provides the abstraction over the serial link. All access
//! goes through `&mut self`, so sharing a transport between tasks means
//! wrapping it in a mutex that each task holds for a single operation.

pub mod serial;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Opens and configures the device.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Releases the device. Calling this more than once is a no-op.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns the next received line without waiting for new data.
    fn try_read_line(&mut self)
    -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + '_>>;

    /// Sends a hex payload over the radio.
    fn send(&mut self, hex: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use serial::SerialTransport;
