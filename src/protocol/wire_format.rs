//! Wire format encoding and decoding.
//!
//! Every frame starts with a 4-byte header:
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Length   │ Endpoint │ Payload          │
//! │ 2 bytes  │ 2 bytes  │ `Length` bytes   │
//! │ uint16 BE│ uint16 BE│                  │
//! └──────────┴──────────┴──────────────────┘
//! ```
//!
//! There is no footer and no checksum at this layer.

use crate::error::{Result, WireError};

/// Header size in bytes (fixed, exactly 4).
pub const HEADER_SIZE: usize = 4;

/// Protocol ceiling for a single frame payload.
pub const MAX_PAYLOAD_SIZE: usize = 2048;

/// Endpoint identifiers.
pub mod endpoints {
    /// Time get/set.
    pub const TIME: u16 = 11;
    /// Firmware version query.
    pub const FIRMWARE_VERSION: u16 = 16;
    /// Phone version handshake (device asks, phone answers).
    pub const PHONE_VERSION: u16 = 17;
    /// Firmware update lifecycle messages.
    pub const SYSTEM_MESSAGE: u16 = 18;
    /// Now-playing metadata and media buttons.
    pub const MUSIC_CONTROL: u16 = 32;
    /// Application messages (dictionary exchange with a watch app).
    pub const APP_MESSAGE: u16 = 48;
    /// Device log output.
    pub const LOGS: u16 = 2000;
    /// Ping/pong.
    pub const PING: u16 = 2001;
    /// Device reset.
    pub const RESET: u16 = 2003;
    /// Legacy notifications.
    pub const NOTIFICATION: u16 = 3000;
    /// App bank management.
    pub const APP_MANAGER: u16 = 6000;
    /// Blob database.
    pub const BLOB_DB: u16 = 0xB1DB;
    /// Bulk transfer.
    pub const PUT_BYTES: u16 = 0xBEEF;
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload length in bytes.
    pub payload_length: u16,
    /// Endpoint identifier.
    pub endpoint: u16,
}

impl Header {
    /// Create a header for `payload_length` bytes on `endpoint`.
    ///
    /// Fails with `PayloadTooLarge` above [`MAX_PAYLOAD_SIZE`].
    pub fn for_payload(endpoint: u16, payload_length: usize) -> Result<Self> {
        if payload_length > MAX_PAYLOAD_SIZE {
            return Err(WireError::PayloadTooLarge {
                size: payload_length,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            payload_length: payload_length as u16,
            endpoint,
        })
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use wristwire::protocol::{endpoints, Header};
    ///
    /// let header = Header::for_payload(endpoints::PING, 5).unwrap();
    /// assert_eq!(header.encode(), [0x00, 0x05, 0x07, 0xD1]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.payload_length.to_be_bytes());
        buf[2..4].copy_from_slice(&self.endpoint.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short. The length is taken as-is;
    /// nothing on the inbound path checks it against the ceiling.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            payload_length: u16::from_be_bytes([buf[0], buf[1]]),
            endpoint: u16::from_be_bytes([buf[2], buf[3]]),
        })
    }
}
