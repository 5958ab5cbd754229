//! Dispatch module - routing inbound messages.
//!
//! Provides:
//! - [`Router`] - decodes frames and delivers them
//! - [`PushSubscriptions`] - fan-out table for unsolicited messages

mod router;
mod subscriptions;

pub use router::{RouteOutcome, Router};
pub use subscriptions::{PushHandler, PushSubscriptions, SharedPushHandler};
