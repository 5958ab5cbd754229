//! # wristwire
//!
//! Async client for the length-prefixed, endpoint-tagged serial protocol
//! spoken by smartwatches over Bluetooth serial links and bridges.
//!
//! ## Architecture
//!
//! - **Framing**: `[len u16][endpoint u16][payload]`, Big Endian, payloads
//!   up to 2048 bytes
//! - **Receiver task**: owns the frame buffer and routes every frame in
//!   arrival order
//! - **Transactions**: at most one outstanding expectation per response
//!   kind; requests are serialized
//! - **Writer task**: the only owner of the transport write half
//! - **Bulk transfer**: PutBytes uploads with CRC32 commit
//!
//! ## Example
//!
//! ```ignore
//! use wristwire::{Client, ResponseKind, transport::DeviceTransport};
//!
//! #[tokio::main]
//! async fn main() -> wristwire::Result<()> {
//!     let client = Client::builder()
//!         .on_push(ResponseKind::MusicControl, |msg| println!("{:?}", msg))
//!         .connect(DeviceTransport::new("/dev/rfcomm0"))
//!         .await?;
//!
//!     let version = client.firmware_version().await?;
//!     println!("running {}", version.running.version);
//!
//!     client.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod response;
pub mod transaction;
pub mod transfer;
pub mod transport;
pub mod writer;

mod client;

pub use client::{Client, ClientBuilder};
pub use command::{BlobDatabase, NotificationKind};
pub use config::{ClientConfig, PhoneVersionConfig};
pub use error::{Result, WireError};
pub use response::{Response, ResponseKind};
pub use transfer::{PutBytes, TransferProgress, TransferType};
