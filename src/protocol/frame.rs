//! Line extraction and hex encoding for the radio link.
//!
//! The radio module reports received packets as text lines in one of two
//! vendor formats:
//! ```text
//! +EVT:RXP2P:<rssi>:<snr>:<hex>        (event format)
//! at+recv=<rssi>,<snr>,<len>,<hex>     (legacy format)
//! ```
//! Outbound packets are sent with a single AT instruction:
//! ```text
//! AT+PSEND=<hex>\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Marker identifying event-format receive lines.
pub const EVENT_MARKER: &str = "+EVT:RXP2P";

/// Marker identifying legacy-format receive lines.
pub const LEGACY_MARKER: &str = "recv=";

/// Prefix stripped from legacy-format lines before splitting.
pub const LEGACY_PREFIX: &str = "at+recv=";

/// Prefix of the send instruction.
pub const SEND_PREFIX: &str = "AT+PSEND=";

/// Line terminator for outbound AT instructions.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Maximum bytes buffered before an unterminated line is flushed.
pub const MAX_LINE_LEN: usize = 1024;

/// Minimum `:`-separated tokens in an event-format line.
const MIN_EVENT_TOKENS: usize = 4;

/// Minimum `,`-separated tokens in a legacy-format line.
const MIN_LEGACY_TOKENS: usize = 3;

/// Extracts the hex payload from a received line.
///
/// Returns `None` if the line matches neither vendor format or carries an
/// empty payload.
#[must_use]
pub fn decode_line(line: &str) -> Option<&str> {
    let payload = if line.contains(EVENT_MARKER) {
        if line.split(':').count() < MIN_EVENT_TOKENS {
            return None;
        }
        line.rsplit(':').next()?.trim()
    } else if line.contains(LEGACY_MARKER) {
        let content = line.strip_prefix(LEGACY_PREFIX).unwrap_or(line).trim();
        if content.split(',').count() < MIN_LEGACY_TOKENS {
            return None;
        }
        content.rsplit(',').next()?.trim()
    } else {
        return None;
    };

    (!payload.is_empty()).then_some(payload)
}

/// Decodes bytes as UTF-8, dropping invalid sequences.
#[must_use]
pub fn decode_lossy(data: &[u8]) -> String {
    data.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Decodes a hex payload into text.
///
/// # Errors
///
/// Returns `Error::Frame` if the payload is not valid hex.
pub fn try_hex_to_text(hex: &str) -> Result<String> {
    let data = hex::decode(hex).map_err(FrameError::from)?;
    Ok(decode_lossy(&data))
}

/// Decodes a hex payload into text, yielding an empty string on bad hex.
#[must_use]
pub fn hex_to_text(hex: &str) -> String {
    match try_hex_to_text(hex) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("dropping payload {:?}: {}", hex, e);
            String::new()
        }
    }
}

/// Encodes text as lowercase hex.
#[must_use]
pub fn text_to_hex(text: &str) -> String {
    hex::encode(text.as_bytes())
}

/// Splits received bytes into trimmed text lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next non-empty line, if a complete one is buffered.
    ///
    /// Data longer than `MAX_LINE_LEN` without a terminator is returned as
    /// a line of its own.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let end = match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) => pos + 1,
                None if self.buffer.len() > MAX_LINE_LEN => self.buffer.len(),
                None => return None,
            };

            let raw = self.buffer.split_to(end);
            let line = decode_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Wraps a hex payload in a send instruction.
#[must_use]
pub fn encode_send(hex: &[u8]) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(SEND_PREFIX.len() + hex.len() + LINE_TERMINATOR.len());
    buf.put_slice(SEND_PREFIX.as_bytes());
    buf.put_slice(hex);
    buf.put_slice(LINE_TERMINATOR.as_bytes());
    buf.freeze()
}
