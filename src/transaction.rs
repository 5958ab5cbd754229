//! Response registry: single-flight expectations keyed by response kind.
//!
//! Most endpoints carry no request id, so the registry allows at most one
//! open [`Transaction`] per [`ResponseKind`]. The receiver task completes
//! it with [`ResponseRegistry::fulfill`]; the requester waits on it with a
//! deadline.
//!
//! Dropping a `Transaction` always removes it, so failed or cancelled
//! waits never leave an open expectation behind.
//!
//! # Example
//!
//! ```ignore
//! let registry = ResponseRegistry::new();
//! let mut txn = registry.open(ResponseKind::Ping)?;
//! writer.send(ping_frame).await?;
//! let response = txn.wait(Duration::from_secs(5)).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{Result, WireError};
use crate::response::{Response, ResponseKind};

/// Lifecycle of a transaction as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Fulfilled,
    TimedOut,
    Cancelled,
}

enum Slot {
    Open(oneshot::Sender<Response>),
    Closed(TransactionState),
}

struct Entry {
    id: u64,
    slot: Slot,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<ResponseKind, Entry>>,
    next_id: AtomicU64,
}

/// Shared table of outstanding expectations.
///
/// Cheap to clone. The lock is held only for the duration of a single
/// table operation, never across an await.
#[derive(Clone, Default)]
pub struct ResponseRegistry {
    inner: Arc<Inner>,
}

impl ResponseRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ResponseKind, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a transaction for `kind`.
    ///
    /// Fails with `AlreadyOpen` if one is already open. A timed out,
    /// fulfilled or cancelled transaction whose handle is still alive does
    /// not block a new one.
    pub fn open(&self, kind: ResponseKind) -> Result<Transaction> {
        let mut entries = self.entries();
        if let Some(Entry {
            slot: Slot::Open(_),
            ..
        }) = entries.get(&kind)
        {
            return Err(WireError::AlreadyOpen(kind));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        entries.insert(
            kind,
            Entry {
                id,
                slot: Slot::Open(tx),
            },
        );

        Ok(Transaction {
            registry: self.clone(),
            kind,
            id,
            rx: Some(rx),
        })
    }

    /// Complete the open transaction for `response.kind()`.
    ///
    /// Returns `false` and does nothing if none is open, including when the
    /// last one already timed out. Such responses are push candidates.
    pub fn fulfill(&self, response: &Response) -> bool {
        let kind = response.kind();
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(&kind) else {
            return false;
        };
        if !matches!(entry.slot, Slot::Open(_)) {
            return false;
        }

        let Slot::Open(tx) = std::mem::replace(
            &mut entry.slot,
            Slot::Closed(TransactionState::Fulfilled),
        ) else {
            return false;
        };

        if tx.send(response.clone()).is_err() {
            entry.slot = Slot::Closed(TransactionState::Cancelled);
            return false;
        }
        true
    }

    /// Current state of the transaction for `kind`, if one exists.
    pub fn state(&self, kind: ResponseKind) -> Option<TransactionState> {
        self.entries().get(&kind).map(|entry| match entry.slot {
            Slot::Open(_) => TransactionState::Open,
            Slot::Closed(state) => state,
        })
    }

    /// Check whether a transaction for `kind` is open.
    pub fn is_open(&self, kind: ResponseKind) -> bool {
        self.state(kind) == Some(TransactionState::Open)
    }

    /// Cancel every open transaction. Their waiters wake with `Cancelled`.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.entries().values_mut() {
            if matches!(entry.slot, Slot::Open(_)) {
                entry.slot = Slot::Closed(TransactionState::Cancelled);
                cancelled += 1;
            }
        }
        cancelled
    }

    fn mark(&self, kind: ResponseKind, id: u64, state: TransactionState) {
        if let Some(entry) = self.entries().get_mut(&kind) {
            if entry.id == id && matches!(entry.slot, Slot::Open(_)) {
                entry.slot = Slot::Closed(state);
            }
        }
    }

    fn close(&self, kind: ResponseKind, id: u64) {
        let mut entries = self.entries();
        if entries.get(&kind).is_some_and(|entry| entry.id == id) {
            entries.remove(&kind);
        }
    }
}

/// Handle to one outstanding expectation. Removed from the registry on drop.
pub struct Transaction {
    registry: ResponseRegistry,
    kind: ResponseKind,
    id: u64,
    rx: Option<oneshot::Receiver<Response>>,
}

impl Transaction {
    /// The kind this transaction expects.
    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Wait for the response, up to `timeout`.
    ///
    /// On timeout the transaction is marked `TimedOut`; a response arriving
    /// afterwards is not delivered here.
    pub async fn wait(&mut self, timeout: Duration) -> Result<Response> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(WireError::Cancelled(self.kind));
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => {
                self.rx = None;
                Ok(response)
            }
            Ok(Err(_)) => {
                self.rx = None;
                Err(WireError::Cancelled(self.kind))
            }
            Err(_) => {
                self.registry
                    .mark(self.kind, self.id, TransactionState::TimedOut);
                self.rx = None;
                Err(WireError::TimedOut(self.kind))
            }
        }
    }

    /// Abandon the wait and release the transaction.
    pub fn cancel(self) {
        self.registry
            .mark(self.kind, self.id, TransactionState::Cancelled);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.registry.close(self.kind, self.id);
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}
