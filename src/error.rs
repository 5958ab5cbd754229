//! Error types for wristwire.

use thiserror::Error;

use crate::response::ResponseKind;

/// Main error type for all wristwire operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Outbound payload exceeds the per-frame ceiling. Nothing was written.
    #[error("Payload of {size} bytes exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// A transaction for this response kind is already open.
    #[error("A {0:?} transaction is already open")]
    AlreadyOpen(ResponseKind),

    /// No response of the expected kind arrived before the deadline.
    #[error("Timed out waiting for {0:?} response")]
    TimedOut(ResponseKind),

    /// The wait was abandoned before a response arrived.
    #[error("{0:?} transaction was cancelled")]
    Cancelled(ResponseKind),

    /// Malformed payload for a known endpoint.
    #[error("Cannot decode {kind:?} payload: {reason}")]
    Decode { kind: ResponseKind, reason: String },

    /// The device declined to start a bulk transfer.
    #[error("Transfer rejected: {0}")]
    TransferRejected(String),

    /// A data chunk was not acknowledged.
    #[error("Transfer chunk failed: {0}")]
    TransferChunkFailed(String),

    /// The checksum commit was not acknowledged.
    #[error("Transfer commit failed: {0}")]
    TransferCommitFailed(String),

    /// The completion request was not acknowledged.
    #[error("Transfer finalize failed: {0}")]
    TransferFinalizeFailed(String),

    /// Protocol error (unexpected reply shape, NACK, id mismatch).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection closed or torn down.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Backpressure timeout - write queue full.
    #[error("Backpressure timeout")]
    BackpressureTimeout,
}

impl WireError {
    /// True for the four bulk transfer failure variants.
    pub fn is_transfer_failure(&self) -> bool {
        matches!(
            self,
            WireError::TransferRejected(_)
                | WireError::TransferChunkFailed(_)
                | WireError::TransferCommitFailed(_)
                | WireError::TransferFinalizeFailed(_)
        )
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
