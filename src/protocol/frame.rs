//! Decoded frame type and outbound frame encoding.
//!
//! Uses `bytes::Bytes` so payloads move from the frame buffer to the
//! router without copying.
//!
//! # Example
//!
//! ```
//! use wristwire::protocol::{encode_frame, endpoints, FrameBuffer};
//!
//! let wire = encode_frame(endpoints::PING, &[0x00, 0, 0, 0, 1]).unwrap();
//! let frames = FrameBuffer::new().feed(&wire);
//!
//! assert_eq!(frames[0].endpoint, endpoints::PING);
//! assert_eq!(frames[0].payload(), &[0x00, 0, 0, 0, 1]);
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{Header, HEADER_SIZE};
use crate::error::Result;

/// One complete `(endpoint, payload)` unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Endpoint identifier.
    pub endpoint: u16,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl RawFrame {
    /// Create a new frame.
    pub fn new(endpoint: u16, payload: Bytes) -> Self {
        Self { endpoint, payload }
    }

    /// Create a frame from raw bytes (copies data).
    pub fn from_parts(endpoint: u16, payload: &[u8]) -> Self {
        Self {
            endpoint,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Encode this frame to wire bytes.
    pub fn encode(&self) -> Result<Bytes> {
        encode_frame(self.endpoint, &self.payload)
    }
}

/// Encode `(endpoint, payload)` into a single wire frame.
///
/// Fails with `PayloadTooLarge` before producing any bytes if the
/// payload exceeds the ceiling.
pub fn encode_frame(endpoint: u16, payload: &[u8]) -> Result<Bytes> {
    let header = Header::for_payload(endpoint, payload.len())?;
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(&header.encode());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Concatenate several frames into one byte stream.
pub fn build_frames<'a, I>(frames: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (u16, &'a [u8])>,
{
    let mut out = Vec::new();
    for (endpoint, payload) in frames {
        out.extend_from_slice(&encode_frame(endpoint, payload)?);
    }
    Ok(out)
}
