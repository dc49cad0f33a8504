//! Error types for the Agora message bus.

use crate::types::ActorId;
use thiserror::Error;

/// Errors raised by bus lifecycle and construction operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// An actor id was empty or whitespace-only
    #[error("Actor id must not be empty")]
    EmptyActorId,

    /// The dispatcher thread could not be spawned
    #[error("Failed to spawn dispatcher thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The dispatcher thread panicked outside of a handler
    #[error("Dispatcher thread panicked")]
    DispatcherPanicked,

    /// The dispatcher thread terminated while the bus was still running
    #[error("Dispatcher thread exited while the bus was running")]
    DispatcherExited,

    /// The dispatcher did not observe the stop signal in time
    #[error("Dispatcher did not stop within {0}ms")]
    StopTimeout(u64),
}

/// Errors a handler reports while accepting a delivered message.
///
/// These are caught per handler by the dispatcher, logged, and never
/// propagated to the sender.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The receiving mailbox has been dropped
    #[error("Mailbox for {0} is closed")]
    MailboxClosed(ActorId),

    /// The handler refused the message
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    /// Creates a rejection error.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}
