//! Delivery handler abstraction.

use crate::error::DeliveryError;
use crate::message::Message;
use std::fmt;
use std::sync::Arc;

/// Receiving end of a bus subscription.
///
/// The dispatcher calls `deliver` once per routed message, on the
/// dispatcher thread and outside the bus lock. Implementations should
/// hand the message off quickly (e.g. push onto a queue) rather than
/// process it inline.
///
/// # Failure
///
/// Returning `Err` or panicking affects only this handler: the fault is
/// logged and counted, and delivery continues with the remaining handlers.
pub trait Deliver: Send + Sync + 'static {
    /// Accepts one message addressed to (or broadcast to) the subscriber.
    fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError>;
}

/// Handle returned by `MessageBus::subscribe`, used to remove a single
/// handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw sequence number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
