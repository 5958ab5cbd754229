//! Socket and device transports.
//!
//! - TCP: bridges and emulators
//! - Unix Domain Socket: local bridges (Unix only)
//! - Character device: RFCOMM / serial ports opened read-write

use std::path::PathBuf;

use tokio::fs::{File, OpenOptions};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::Transport;
use crate::error::Result;

/// Connects to `addr` over TCP.
pub struct TcpTransport {
    addr: String,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Transport for TcpTransport {
    type Reader = OwnedReadHalf;
    type Writer = OwnedWriteHalf;

    async fn open(self) -> Result<(Self::Reader, Self::Writer)> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        tracing::debug!("Connected to {}", self.addr);
        Ok(stream.into_split())
    }
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::UnixStream;

    /// Connects to a Unix Domain Socket.
    pub struct UnixTransport {
        path: PathBuf,
    }

    impl UnixTransport {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl Transport for UnixTransport {
        type Reader = OwnedReadHalf;
        type Writer = OwnedWriteHalf;

        async fn open(self) -> Result<(Self::Reader, Self::Writer)> {
            let stream = UnixStream::connect(&self.path).await?;
            tracing::debug!("Connected to {}", self.path.display());
            Ok(stream.into_split())
        }
    }
}

#[cfg(unix)]
pub use unix_impl::UnixTransport;

/// Opens a character device read-write, e.g. `/dev/rfcomm0`.
pub struct DeviceTransport {
    path: PathBuf,
}

impl DeviceTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Transport for DeviceTransport {
    type Reader = ReadHalf<File>;
    type Writer = WriteHalf<File>;

    async fn open(self) -> Result<(Self::Reader, Self::Writer)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await?;
        tracing::debug!("Opened device {}", self.path.display());
        Ok(tokio::io::split(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_transport_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let (_reader, mut writer) = TcpTransport::new(addr).open().await.unwrap();
        writer.write_all(&[0, 0, 7, 0xD1]).await.unwrap();

        assert_eq!(server.await.unwrap(), [0, 0, 7, 0xD1]);
    }

    #[tokio::test]
    async fn test_tcp_transport_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(TcpTransport::new(addr).open().await.is_err());
    }

    #[tokio::test]
    async fn test_device_transport_missing_path() {
        let result = DeviceTransport::new("/nonexistent/wristwire-device")
            .open()
            .await;
        assert!(result.is_err());
    }
}
