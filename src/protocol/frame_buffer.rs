//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a two-state cursor:
//! - `AwaitingHeader`: need at least 4 bytes
//! - `AwaitingPayload`: header consumed, need `expected` payload bytes
//!
//! Input is never rejected. A truncated frame stalls until more bytes
//! arrive, and a corrupted length field desynchronizes the stream for good:
//! there is no resynchronization marker in the wire format.
//!
//! # Example
//!
//! ```
//! use wristwire::protocol::{encode_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let wire = encode_frame(2001, b"pong").unwrap();
//!
//! assert!(buffer.feed(&wire[..3]).is_empty());
//! let frames = buffer.feed(&wire[3..]);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].endpoint, 2001);
//! ```

use bytes::BytesMut;

use super::wire_format::{Header, HEADER_SIZE};
use super::RawFrame;

/// Default initial buffer capacity.
const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    AwaitingPayload { endpoint: u16, expected: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// Owned by exactly one reader; it is never shared.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
}

impl FrameBuffer {
    /// Create a new frame buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new frame buffer with a custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::AwaitingHeader,
        }
    }

    /// Append `data` and return every frame it completes, in arrival order.
    ///
    /// Runs to exhaustion: when one read carries several frames, all of them
    /// are returned by this call.
    pub fn feed(&mut self, data: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        self.feed_with(data, |frame| frames.push(frame));
        frames
    }

    /// Like [`feed`](Self::feed) but hands each frame to `emit` as soon as
    /// it is complete.
    pub fn feed_with<F>(&mut self, data: &[u8], mut emit: F)
    where
        F: FnMut(RawFrame),
    {
        self.buffer.extend_from_slice(data);
        while let Some(frame) = self.try_extract_one() {
            emit(frame);
        }
    }

    fn try_extract_one(&mut self) -> Option<RawFrame> {
        loop {
            match self.state {
                State::AwaitingHeader => {
                    let header = Header::decode(&self.buffer)?;
                    let _ = self.buffer.split_to(HEADER_SIZE);
                    self.state = State::AwaitingPayload {
                        endpoint: header.endpoint,
                        expected: header.payload_length as usize,
                    };
                }
                State::AwaitingPayload { endpoint, expected } => {
                    if self.buffer.len() < expected {
                        return None;
                    }
                    let payload = self.buffer.split_to(expected).freeze();
                    self.state = State::AwaitingHeader;
                    return Some(RawFrame::new(endpoint, payload));
                }
            }
        }
    }

    /// Number of buffered bytes not yet part of an emitted frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// True while a header has been consumed and its payload is pending.
    pub fn is_mid_frame(&self) -> bool {
        matches!(self.state, State::AwaitingPayload { .. })
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingHeader;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_frame, MAX_PAYLOAD_SIZE};

    fn frame_bytes(endpoint: u16, payload: &[u8]) -> Vec<u8> {
        encode_frame(endpoint, payload).unwrap().to_vec()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.feed(&frame_bytes(2001, b"hello"));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].endpoint, 2001);
        assert_eq!(frames[0].payload(), b"hello");
        assert!(buffer.is_empty());
        assert!(!buffer.is_mid_frame());
    }

    #[test]
    fn test_multiple_frames_in_one_feed() {
        let mut buffer = FrameBuffer::new();
        let mut combined = frame_bytes(1, b"first");
        combined.extend(frame_bytes(2, b"second"));
        combined.extend(frame_bytes(3, b"third"));

        let frames = buffer.feed(&combined);

        let endpoints: Vec<u16> = frames.iter().map(|f| f.endpoint).collect();
        assert_eq!(endpoints, vec![1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header() {
        let mut buffer = FrameBuffer::new();
        let bytes = frame_bytes(48, b"test");

        assert!(buffer.feed(&bytes[..3]).is_empty());
        assert!(!buffer.is_mid_frame());

        let frames = buffer.feed(&bytes[3..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].endpoint, 48);
    }

    #[test]
    fn test_fragmented_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = b"this is a longer payload that will be fragmented";
        let bytes = frame_bytes(1, payload);

        let split = HEADER_SIZE + 10;
        assert!(buffer.feed(&bytes[..split]).is_empty());
        assert!(buffer.is_mid_frame());
        assert_eq!(buffer.len(), 10);

        let frames = buffer.feed(&bytes[split..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.feed(&frame_bytes(2003, b""));

        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
        assert!(!buffer.is_mid_frame());
    }

    #[test]
    fn test_max_payload() {
        let mut buffer = FrameBuffer::new();
        let payload = vec![0xAB; MAX_PAYLOAD_SIZE];
        let frames = buffer.feed(&frame_bytes(0xBEEF, &payload));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload_len(), MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_every_split_point_yields_same_frames() {
        let mut stream = frame_bytes(11, &[1, 2, 3, 4]);
        stream.extend(frame_bytes(0, &[]));
        stream.extend(frame_bytes(0xFFFF, &[9; 300]));

        for chunk_size in 1..=stream.len() {
            let mut buffer = FrameBuffer::new();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                frames.extend(buffer.feed(chunk));
            }
            assert_eq!(frames.len(), 3, "chunk size {}", chunk_size);
            assert_eq!(frames[0], RawFrame::from_parts(11, &[1, 2, 3, 4]));
            assert_eq!(frames[1], RawFrame::from_parts(0, &[]));
            assert_eq!(frames[2], RawFrame::from_parts(0xFFFF, &[9; 300]));
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_truncated_input_stalls() {
        let mut buffer = FrameBuffer::new();
        // Claims 10 bytes, delivers 2.
        let frames = buffer.feed(&[0x00, 0x0A, 0x00, 0x01, 0xAA, 0xBB]);
        assert!(frames.is_empty());
        assert!(buffer.is_mid_frame());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_feed_with_emits_in_order() {
        let mut buffer = FrameBuffer::new();
        let mut stream = frame_bytes(5, b"a");
        stream.extend(frame_bytes(6, b"b"));

        let mut seen = Vec::new();
        buffer.feed_with(&stream, |frame| seen.push(frame.endpoint));
        assert_eq!(seen, vec![5, 6]);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let bytes = frame_bytes(1, b"test");
        buffer.feed(&bytes[..HEADER_SIZE + 1]);
        assert!(buffer.is_mid_frame());

        buffer.clear();

        assert!(!buffer.is_mid_frame());
        assert!(buffer.is_empty());
        assert_eq!(buffer.feed(&bytes).len(), 1);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let bytes = frame_bytes(2001, b"hi");

        let mut all_frames = Vec::new();
        for byte in &bytes {
            all_frames.extend(buffer.feed(&[*byte]));
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].payload(), b"hi");
    }
}
