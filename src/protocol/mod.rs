//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the byte-stream framing:
//! - 4-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - `RawFrame` and outbound encoding

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frames, encode_frame, RawFrame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{endpoints, Header, HEADER_SIZE, MAX_PAYLOAD_SIZE};
