//! Client builder and runtime loop.
//!
//! The [`ClientBuilder`] collects configuration and push handlers. The
//! [`Client`] manages the connection lifecycle:
//! 1. Open the transport
//! 2. Spawn the writer task on the write half
//! 3. Spawn the receiver task: read bytes, frame them, route each frame
//! 4. Serve request/response cycles one at a time
//!
//! A request that times out is taken as evidence the link is dead and
//! disconnects the client. Decode failures never do.
//!
//! # Example
//!
//! ```ignore
//! use wristwire::{Client, transport::TcpTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .request_timeout(std::time::Duration::from_secs(5))
//!         .connect(TcpTransport::new("127.0.0.1:12344"))
//!         .await?;
//!
//!     let cookie = client.ping(0xC0FFEE).await?;
//!     client.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::config::{ClientConfig, PhoneVersionConfig};
use crate::dispatch::{PushSubscriptions, Router, SharedPushHandler};
use crate::error::{Result, WireError};
use crate::protocol::FrameBuffer;
use crate::response::{Response, ResponseKind};
use crate::transaction::ResponseRegistry;
use crate::transport::Transport;
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};

/// Size of the receiver's read buffer.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Builder for configuring and connecting a client.
pub struct ClientBuilder {
    config: ClientConfig,
    subscriptions: Vec<(ResponseKind, SharedPushHandler)>,
}

impl ClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            subscriptions: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Deadline for request/response calls.
    ///
    /// Default: 10 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Deadline for each bulk transfer step.
    ///
    /// Default: 30 seconds
    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.config.transfer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// How long a best-effort transfer abort waits for its acknowledgement.
    ///
    /// Default: 2 seconds
    pub fn abort_timeout(mut self, timeout: Duration) -> Self {
        self.config.abort_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the maximum pending frames for backpressure.
    ///
    /// Default: 1024
    pub fn max_pending_frames(mut self, limit: usize) -> Self {
        self.config.writer.max_pending_frames = limit;
        self
    }

    /// Set the writer channel capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.writer.channel_capacity = capacity;
        self
    }

    /// Set the backpressure timeout.
    ///
    /// Default: 5 seconds
    pub fn backpressure_timeout(mut self, timeout: Duration) -> Self {
        self.config.writer.backpressure_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// What to announce when the device asks for the phone version.
    pub fn phone_version(mut self, phone_version: PhoneVersionConfig) -> Self {
        self.config.phone_version = phone_version;
        self
    }

    /// Register a push handler that is live from the first received byte.
    pub fn on_push<F>(mut self, kind: ResponseKind, handler: F) -> Self
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.subscriptions.push((kind, Arc::new(handler)));
        self
    }

    /// Open `transport` and start the client.
    pub async fn connect<T: Transport>(self, transport: T) -> Result<Client> {
        Client::start(self.config, self.subscriptions, transport).await
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared {
    config: ClientConfig,
    registry: ResponseRegistry,
    subscriptions: Arc<PushSubscriptions>,
    writer: WriterHandle,
    /// One request/response cycle in flight at a time.
    request_lock: tokio::sync::Mutex<()>,
    connected: Arc<watch::Sender<bool>>,
    tasks: Mutex<Vec<AbortHandle>>,
    next_app_message_id: AtomicU8,
    next_blobdb_token: AtomicU16,
}

impl Shared {
    /// Stop the receiver and let the writer drain what it already accepted.
    fn stop_tasks(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
        self.writer.close();
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

/// Flip the connection state and cancel outstanding transactions.
///
/// Returns `true` the first time only.
fn mark_disconnected(connected: &watch::Sender<bool>, registry: &ResponseRegistry) -> bool {
    let was_connected = connected.send_replace(false);
    if was_connected {
        let cancelled = registry.cancel_all();
        if cancelled > 0 {
            tracing::debug!("Cancelled {} pending transactions", cancelled);
        }
    }
    was_connected
}

/// A connected client. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Client {
    shared: Arc<Shared>,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    async fn start<T: Transport>(
        config: ClientConfig,
        subscriptions: Vec<(ResponseKind, SharedPushHandler)>,
        transport: T,
    ) -> Result<Self> {
        let (reader, write_half) = transport.open().await?;

        let (writer, writer_task) = spawn_writer_task(write_half, &config.writer);

        let registry = ResponseRegistry::new();
        let push = Arc::new(PushSubscriptions::new());
        for (kind, handler) in subscriptions {
            push.subscribe(kind, handler);
        }

        let router = Router::new(
            registry.clone(),
            push.clone(),
            writer.clone(),
            config.phone_version.encode_reply(),
        );

        let connected = Arc::new(watch::Sender::new(true));
        let reader_state = connected.clone();
        let reader_registry = registry.clone();
        let reader_writer = writer.clone();
        let reader_task = tokio::spawn(async move {
            match Self::read_loop(reader, router).await {
                Ok(()) => tracing::debug!("Transport closed by peer"),
                Err(e) => tracing::error!("Read loop error: {}", e),
            }
            mark_disconnected(&reader_state, &reader_registry);
            reader_writer.close();
        });

        let writer_state = connected.clone();
        let writer_registry = registry.clone();
        tokio::spawn(async move {
            match writer_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Writer error: {}", e),
                Err(e) => tracing::error!("Writer task failed: {}", e),
            }
            mark_disconnected(&writer_state, &writer_registry);
        });

        let tasks = vec![reader_task.abort_handle()];

        Ok(Client {
            shared: Arc::new(Shared {
                config,
                registry,
                subscriptions: push,
                writer,
                request_lock: tokio::sync::Mutex::new(()),
                connected,
                tasks: Mutex::new(tasks),
                next_app_message_id: AtomicU8::new(0),
                next_blobdb_token: AtomicU16::new(1),
            }),
        })
    }

    /// Receiver loop - reads bytes, frames them, routes every complete frame
    /// before reading again.
    async fn read_loop<R: AsyncRead + Unpin>(mut reader: R, router: Router) -> Result<()> {
        let mut frame_buffer = FrameBuffer::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }

            for frame in frame_buffer.feed(&buf[..n]) {
                router.route(frame).await;
            }
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// The transaction table shared with the receiver task.
    pub fn registry(&self) -> &ResponseRegistry {
        &self.shared.registry
    }

    /// Send one request and wait for its response, up to `timeout`.
    ///
    /// Holds the request lock for the whole cycle. The transaction is
    /// opened before the frame is written, so a fast reply cannot be missed.
    /// A timeout is returned to the caller without disconnecting.
    pub async fn exchange(
        &self,
        kind: ResponseKind,
        endpoint: u16,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<Response> {
        let frame = OutboundFrame::new(endpoint, payload)?;
        if !self.is_connected() {
            return Err(WireError::ConnectionClosed);
        }

        let _cycle = self.shared.request_lock.lock().await;
        let mut txn = self.shared.registry.open(kind)?;
        self.shared.writer.send(frame).await?;
        txn.wait(timeout).await
    }

    /// Like [`exchange`](Self::exchange) with the configured request
    /// timeout, but a timeout disconnects the client.
    pub async fn request(
        &self,
        kind: ResponseKind,
        endpoint: u16,
        payload: impl Into<Bytes>,
    ) -> Result<Response> {
        let timeout = self.shared.config.request_timeout();
        match self.exchange(kind, endpoint, payload, timeout).await {
            Err(WireError::TimedOut(kind)) => {
                tracing::warn!(
                    "No {:?} response within {:?}, considering the link dead",
                    kind,
                    timeout
                );
                self.disconnect();
                Err(WireError::TimedOut(kind))
            }
            other => other,
        }
    }

    /// Send one frame without waiting for anything.
    pub async fn send(&self, endpoint: u16, payload: impl Into<Bytes>) -> Result<()> {
        let frame = OutboundFrame::new(endpoint, payload)?;
        if !self.is_connected() {
            return Err(WireError::ConnectionClosed);
        }
        self.shared.writer.send(frame).await
    }

    /// Register a push handler. Keep the returned value to unsubscribe.
    pub fn subscribe<F>(&self, kind: ResponseKind, handler: F) -> SharedPushHandler
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        let handler: SharedPushHandler = Arc::new(handler);
        self.shared.subscriptions.subscribe(kind, handler.clone());
        handler
    }

    /// Remove a handler returned by [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, kind: ResponseKind, handler: &SharedPushHandler) -> bool {
        self.shared.subscriptions.unsubscribe(kind, handler)
    }

    /// Check whether the connection is up.
    pub fn is_connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// Tear the connection down. Idempotent.
    ///
    /// Cancels every open transaction and stops the receiver, which drops
    /// the read half. Frames already accepted by [`send`](Self::send) are
    /// still written before the write half is shut down.
    pub fn disconnect(&self) {
        if mark_disconnected(&self.shared.connected, &self.shared.registry) {
            tracing::warn!("Disconnecting");
        }
        self.shared.stop_tasks();
    }

    /// Wait until the connection is down.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shared.connected.subscribe();
        let _ = rx.wait_for(|connected| !*connected).await;
    }

    pub(crate) fn next_app_message_id(&self) -> u8 {
        self.shared.next_app_message_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_blobdb_token(&self) -> u16 {
        self.shared.next_blobdb_token.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the current pending outbound frame count.
    pub fn pending_frames(&self) -> usize {
        self.shared.writer.pending_count()
    }
}
