//! Transport module - the byte pipe under the protocol.
//!
//! The protocol treats the transport as an unstructured, ordered byte
//! stream. A [`Transport`] is opened once and yields a read half (owned by
//! the receiver task) and a write half (owned by the writer task). Closing
//! is dropping the read half and shutting down the write half, which the
//! client does on disconnect.
//!
//! Provides:
//! - [`StreamTransport`] - any `AsyncRead + AsyncWrite` value (tests, bridges)
//! - [`TcpTransport`] - TCP bridge or emulator
//! - [`UnixTransport`] - Unix socket bridge (Unix only)
//! - [`DeviceTransport`] - character device such as a Bluetooth serial port

mod socket;

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

use crate::error::Result;

pub use socket::{DeviceTransport, TcpTransport};
#[cfg(unix)]
pub use socket::UnixTransport;

/// A byte pipe that can be opened into independent read and write halves.
pub trait Transport: Send + 'static {
    type Reader: AsyncRead + Unpin + Send + 'static;
    type Writer: AsyncWrite + Unpin + Send + 'static;

    /// Open the pipe.
    fn open(self) -> impl Future<Output = Result<(Self::Reader, Self::Writer)>> + Send;
}

/// Wraps an already connected stream.
///
/// # Example
///
/// ```
/// use wristwire::transport::StreamTransport;
///
/// let (client_side, _device_side) = tokio::io::duplex(4096);
/// let transport = StreamTransport::new(client_side);
/// ```
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    type Reader = ReadHalf<S>;
    type Writer = WriteHalf<S>;

    async fn open(self) -> Result<(Self::Reader, Self::Writer)> {
        Ok(tokio::io::split(self.stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_stream_transport_halves() {
        let (client, mut device) = duplex(64);
        let (mut reader, mut writer) = StreamTransport::new(client).open().await.unwrap();

        writer.write_all(b"out").await.unwrap();
        let mut buf = [0u8; 3];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"out");

        device.write_all(b"in").await.unwrap();
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"in");
    }
}
