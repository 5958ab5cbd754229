//! Client configuration.
//!
//! Every field has a default, so a JSON document only needs the fields it
//! overrides:
//!
//! ```
//! use wristwire::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{ "request_timeout_ms": 2500 }"#).unwrap();
//! assert_eq!(config.request_timeout().as_millis(), 2500);
//! assert_eq!(config.transfer_timeout_ms, 30_000);
//! ```

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::writer::WriterConfig;

/// Default deadline for request/response calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for each bulk transfer step.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait for the acknowledgement of a best-effort abort.
pub const DEFAULT_ABORT_TIMEOUT: Duration = Duration::from_secs(2);

/// What this client announces when the device asks for the phone version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneVersionConfig {
    pub session_capabilities: u32,
    pub remote_capabilities: u32,
    pub response_version: u8,
    pub major_version: u8,
    pub minor_version: u8,
    pub bugfix_version: u8,
    pub protocol_capabilities: u64,
}

impl Default for PhoneVersionConfig {
    fn default() -> Self {
        Self {
            session_capabilities: 0x8000_0000,
            // Android host with SMS and telephony support.
            remote_capabilities: 0x0000_0032,
            response_version: 2,
            major_version: 3,
            minor_version: 0,
            bugfix_version: 0,
            protocol_capabilities: 0,
        }
    }
}

impl PhoneVersionConfig {
    /// Encode the fixed phone version reply.
    pub fn encode_reply(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(25);
        buf.put_u8(0x01);
        buf.put_u32(0xFFFF_FFFF);
        buf.put_u32(self.session_capabilities);
        buf.put_u32(self.remote_capabilities);
        buf.put_u8(self.response_version);
        buf.put_u8(self.major_version);
        buf.put_u8(self.minor_version);
        buf.put_u8(self.bugfix_version);
        buf.put_u64(self.protocol_capabilities);
        buf.freeze()
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Deadline for façade requests, in milliseconds.
    pub request_timeout_ms: u64,
    /// Deadline for each bulk transfer step, in milliseconds.
    pub transfer_timeout_ms: u64,
    /// Wait for the abort acknowledgement, in milliseconds.
    pub abort_timeout_ms: u64,
    pub writer: WriterConfig,
    pub phone_version: PhoneVersionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT.as_millis() as u64,
            abort_timeout_ms: DEFAULT_ABORT_TIMEOUT.as_millis() as u64,
            writer: WriterConfig::default(),
            phone_version: PhoneVersionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn abort_timeout(&self) -> Duration {
        Duration::from_millis(self.abort_timeout_ms)
    }
}
