//! Push subscriptions keyed by response kind.
//!
//! Several handlers may listen to one kind; they are called in
//! registration order. A handler is removed by passing back the same
//! `Arc` that was registered.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::response::{Response, ResponseKind};

/// Callback for unsolicited messages.
///
/// Runs on the receiver task, so it should return quickly. Spawn a task for
/// anything that awaits.
pub trait PushHandler: Send + Sync + 'static {
    fn handle(&self, response: &Response);
}

impl<F> PushHandler for F
where
    F: Fn(&Response) + Send + Sync + 'static,
{
    fn handle(&self, response: &Response) {
        self(response)
    }
}

/// Registered handler, compared by identity.
pub type SharedPushHandler = Arc<dyn PushHandler>;

/// Fan-out table of push handlers.
#[derive(Default)]
pub struct PushSubscriptions {
    handlers: RwLock<HashMap<ResponseKind, Vec<SharedPushHandler>>>,
}

impl PushSubscriptions {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` for `kind`, after any existing ones.
    pub fn subscribe(&self, kind: ResponseKind, handler: SharedPushHandler) {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Remove `handler` from `kind`. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, kind: ResponseKind, handler: &SharedPushHandler) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            handlers.remove(&kind);
        }
        true
    }

    /// Snapshot of the handlers for `kind`, in registration order.
    ///
    /// Returned by value so no lock is held while handlers run.
    pub fn handlers_for(&self, kind: ResponseKind) -> Vec<SharedPushHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of handlers registered for `kind`.
    pub fn count(&self, kind: ResponseKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .map_or(0, Vec::len)
    }
}
