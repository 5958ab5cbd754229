//! PutBytes upload engine.
//!
//! ```text
//! Idle -> begin -> TokenAcquired -> chunk* -> AllChunksSent
//!      -> commit -> Committed -> finalize -> Complete
//! ```
//!
//! The first failure is terminal: the token is aborted (best effort) and
//! the error for the failed step is returned. Nothing is retried.
//! Transfer steps never disconnect the client on timeout.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use super::{checksum, TransferProgress, TransferStage, TransferType, CHUNK_SIZE};
use crate::client::Client;
use crate::error::{Result, WireError};
use crate::protocol::endpoints;
use crate::response::{PutBytesAck, Response, ResponseKind};

const BEGIN: u8 = 0x01;
const CHUNK: u8 = 0x02;
const COMMIT: u8 = 0x03;
const ABORT: u8 = 0x04;
const FINALIZE: u8 = 0x05;

/// Uploads one binary per [`send`](Self::send) call.
pub struct PutBytes<'a> {
    client: &'a Client,
    step_timeout: Duration,
    abort_timeout: Duration,
}

impl<'a> PutBytes<'a> {
    /// Engine using the client's configured transfer timeouts.
    pub fn new(client: &'a Client) -> Self {
        let config = client.config();
        Self {
            client,
            step_timeout: config.transfer_timeout(),
            abort_timeout: config.abort_timeout(),
        }
    }

    /// Override the per-step deadline.
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Upload `data` as `transfer_type` into slot `index`.
    pub async fn send<P>(
        &self,
        data: &[u8],
        transfer_type: TransferType,
        index: u8,
        mut progress: P,
    ) -> Result<()>
    where
        P: FnMut(TransferProgress),
    {
        let length = u32::try_from(data.len()).map_err(|_| WireError::PayloadTooLarge {
            size: data.len(),
            max: u32::MAX as usize,
        })?;

        progress(TransferProgress::at(TransferStage::Started));
        let token = self
            .begin(length, transfer_type, index)
            .await
            .map_err(|e| WireError::TransferRejected(e.to_string()))?;
        tracing::debug!(
            "PutBytes {:?} ({} bytes) got token {:02x?}",
            transfer_type,
            data.len(),
            &token[..]
        );
        progress(TransferProgress::at(TransferStage::TokenAcquired));

        let total = data.len().div_ceil(CHUNK_SIZE);
        for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            if let Err(e) = self.step(chunk_payload(&token, chunk)).await {
                tracing::warn!("PutBytes chunk {}/{} failed: {}", i + 1, total, e);
                self.abort(&token).await;
                return Err(WireError::TransferChunkFailed(e.to_string()));
            }
            progress(TransferProgress::at(TransferStage::Chunk {
                sent: i + 1,
                total,
            }));
        }

        let crc = checksum(data);
        if let Err(e) = self.step(commit_payload(&token, crc)).await {
            tracing::warn!("PutBytes commit failed: {}", e);
            self.abort(&token).await;
            return Err(WireError::TransferCommitFailed(e.to_string()));
        }
        progress(TransferProgress::at(TransferStage::Committed));

        if let Err(e) = self.step(token_payload(FINALIZE, &token)).await {
            tracing::warn!("PutBytes finalize failed: {}", e);
            self.abort(&token).await;
            return Err(WireError::TransferFinalizeFailed(e.to_string()));
        }
        progress(TransferProgress::at(TransferStage::Complete));

        tracing::info!(
            "PutBytes {:?} complete, {} bytes in {} chunks, crc {:#010x}",
            transfer_type,
            data.len(),
            total,
            crc
        );
        Ok(())
    }

    async fn begin(&self, length: u32, transfer_type: TransferType, index: u8) -> Result<Bytes> {
        let mut payload = BytesMut::with_capacity(7);
        payload.put_u8(BEGIN);
        payload.put_u32(length);
        payload.put_u8(transfer_type.to_byte());
        payload.put_u8(index);

        let ack = self.step(payload.freeze()).await?;
        if ack.token.is_empty() {
            return Err(WireError::Protocol("begin acknowledged without a token".into()));
        }
        Ok(ack.token)
    }

    /// One acknowledged request/response step.
    async fn step(&self, payload: Bytes) -> Result<PutBytesAck> {
        self.exchange(payload, self.step_timeout).await
    }

    async fn exchange(&self, payload: Bytes, timeout: Duration) -> Result<PutBytesAck> {
        let kind = ResponseKind::PutBytesAck;
        match self
            .client
            .exchange(kind, endpoints::PUT_BYTES, payload, timeout)
            .await?
        {
            Response::PutBytesAck(ack) if ack.is_ack() => Ok(ack),
            Response::PutBytesAck(ack) => Err(WireError::Protocol(format!(
                "device answered with status {:#04x}",
                ack.status
            ))),
            other => Err(WireError::Protocol(format!(
                "expected {:?} reply, got {:?}",
                kind, other
            ))),
        }
    }

    /// Tell the device to drop `token`. Failures are logged only.
    async fn abort(&self, token: &[u8]) {
        let payload = token_payload(ABORT, token);
        match self.exchange(payload, self.abort_timeout).await {
            Ok(_) => tracing::debug!("PutBytes token {:02x?} aborted", token),
            Err(e) => tracing::warn!("PutBytes abort for token {:02x?} failed: {}", token, e),
        }
    }
}

fn chunk_payload(token: &[u8], chunk: &[u8]) -> Bytes {
    let mut payload = BytesMut::with_capacity(1 + token.len() + 4 + chunk.len());
    payload.put_u8(CHUNK);
    payload.put_slice(token);
    payload.put_u32(chunk.len() as u32);
    payload.put_slice(chunk);
    payload.freeze()
}

fn commit_payload(token: &[u8], crc: u32) -> Bytes {
    let mut payload = BytesMut::with_capacity(1 + token.len() + 4);
    payload.put_u8(COMMIT);
    payload.put_slice(token);
    payload.put_u32(crc);
    payload.freeze()
}

fn token_payload(tag: u8, token: &[u8]) -> Bytes {
    let mut payload = BytesMut::with_capacity(1 + token.len());
    payload.put_u8(tag);
    payload.put_slice(token);
    payload.freeze()
}
