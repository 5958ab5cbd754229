//! Routes decoded frames to transactions, obligations and push handlers.
//!
//! For each frame, in order:
//! 1. Look up the kind for the endpoint; unknown endpoints are dropped.
//! 2. Decode; failures are logged and dropped, the link stays up.
//! 3. Run built-in obligations (phone version reply, app message ack).
//! 4. Complete the open transaction for the kind, if any.
//! 5. Otherwise fan out to push handlers, or log the message as unhandled.

use std::sync::Arc;

use bytes::Bytes;

use super::PushSubscriptions;
use crate::protocol::{endpoints, RawFrame};
use crate::response::{AppMessageCommand, Response, ResponseKind};
use crate::transaction::ResponseRegistry;
use crate::writer::WriterHandle;

/// What happened to a routed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Completed an open transaction.
    Fulfilled,
    /// Delivered to this many push handlers.
    Pushed(usize),
    /// Decoded, but nobody was waiting or subscribed.
    Unhandled(ResponseKind),
    /// Payload did not decode.
    Undecodable(ResponseKind),
    /// Endpoint outside the table.
    UnknownEndpoint(u16),
}

/// Dispatcher owned by the receiver task.
pub struct Router {
    registry: ResponseRegistry,
    subscriptions: Arc<PushSubscriptions>,
    writer: WriterHandle,
    phone_version_reply: Bytes,
}

impl Router {
    pub fn new(
        registry: ResponseRegistry,
        subscriptions: Arc<PushSubscriptions>,
        writer: WriterHandle,
        phone_version_reply: Bytes,
    ) -> Self {
        Self {
            registry,
            subscriptions,
            writer,
            phone_version_reply,
        }
    }

    /// Route one frame.
    pub async fn route(&self, frame: RawFrame) -> RouteOutcome {
        let Some(kind) = ResponseKind::from_endpoint(frame.endpoint) else {
            tracing::debug!(
                "Dropping frame for unknown endpoint {} ({} bytes)",
                frame.endpoint,
                frame.payload_len()
            );
            return RouteOutcome::UnknownEndpoint(frame.endpoint);
        };

        let response = match Response::decode(kind, &frame.payload) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Dropping undecodable frame: {}", e);
                return RouteOutcome::Undecodable(kind);
            }
        };

        self.run_obligations(&response).await;

        if completes_transaction(&response) && self.registry.fulfill(&response) {
            return RouteOutcome::Fulfilled;
        }

        let handlers = self.subscriptions.handlers_for(kind);
        if handlers.is_empty() {
            tracing::debug!("Unhandled {:?} message", kind);
            return RouteOutcome::Unhandled(kind);
        }

        for handler in &handlers {
            handler.handle(&response);
        }
        RouteOutcome::Pushed(handlers.len())
    }

    /// Replies the protocol requires no matter who is listening.
    async fn run_obligations(&self, response: &Response) {
        let sent = match response {
            Response::PhoneVersion(_) => {
                self.writer
                    .send_payload(endpoints::PHONE_VERSION, self.phone_version_reply.clone())
                    .await
            }
            Response::AppMessage(msg) if msg.needs_ack() => {
                let ack = vec![AppMessageCommand::Ack.to_byte(), msg.transaction_id];
                self.writer.send_payload(endpoints::APP_MESSAGE, ack).await
            }
            _ => return,
        };

        if let Err(e) = sent {
            tracing::warn!("Failed to answer {:?}: {}", response.kind(), e);
        }
    }
}

/// Device-initiated app messages never answer a request of ours.
fn completes_transaction(response: &Response) -> bool {
    match response {
        Response::AppMessage(msg) => !msg.needs_ack(),
        Response::PhoneVersion(_) => false,
        _ => true,
    }
}
