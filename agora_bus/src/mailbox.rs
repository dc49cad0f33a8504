//! Per-actor inbound queue and send façade.
//!
//! A [`Mailbox`] is the only thing actor logic touches: it owns a private
//! FIFO fed by the bus dispatcher and offers `send`/`broadcast` for the
//! outbound side.

use crate::bus::MessageBus;
use crate::error::DeliveryError;
use crate::handler::{Deliver, SubscriptionId};
use crate::message::{InventoryUpdate, Message, Payload, PurchaseRequest, RestockRequest};
use crate::types::ActorId;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Bus handler that pushes deliveries into a mailbox queue.
struct MailboxHandler {
    actor_id: ActorId,
    inbox: Sender<Arc<Message>>,
}

impl Deliver for MailboxHandler {
    fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError> {
        self.inbox
            .send(message)
            .map_err(|_| DeliveryError::MailboxClosed(self.actor_id.clone()))
    }
}

/// An actor's private inbound queue bound to a bus.
pub struct Mailbox {
    actor_id: ActorId,

    bus: Arc<MessageBus>,

    inbox: Receiver<Arc<Message>>,

    /// `None` once cleaned up
    subscription: Option<SubscriptionId>,
}

impl Mailbox {
    /// Creates a mailbox and subscribes it to the bus under `actor_id`.
    pub fn register(bus: Arc<MessageBus>, actor_id: ActorId) -> Self {
        let (tx, rx) = channel::unbounded();
        let handler = Arc::new(MailboxHandler {
            actor_id: actor_id.clone(),
            inbox: tx,
        });
        let subscription = bus.subscribe(actor_id.clone(), handler);

        Self {
            actor_id,
            bus,
            inbox: rx,
            subscription: Some(subscription),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// False after `cleanup()`.
    pub fn is_registered(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stamps a message with this actor as sender and enqueues it.
    /// `recipient = None` broadcasts.
    pub fn send(&self, payload: impl Into<Payload>, recipient: Option<ActorId>) {
        self.bus
            .enqueue(Message::new(self.actor_id.clone(), recipient, payload));
    }

    pub fn send_to(&self, recipient: ActorId, payload: impl Into<Payload>) {
        self.send(payload, Some(recipient));
    }

    pub fn broadcast(&self, payload: impl Into<Payload>) {
        self.send(payload, None);
    }

    /// Broadcasts a purchase request for `quantity` copies of `isbn`.
    pub fn send_purchase_request(&self, isbn: impl Into<String>, quantity: u32) {
        self.broadcast(PurchaseRequest {
            isbn: isbn.into(),
            quantity,
        });
    }

    /// Broadcasts a restock request for `isbn`.
    pub fn send_restock_request(&self, isbn: impl Into<String>, quantity: u32) {
        self.broadcast(RestockRequest {
            isbn: isbn.into(),
            quantity,
        });
    }

    /// Broadcasts the new stock level of `isbn`.
    pub fn send_inventory_update(&self, isbn: impl Into<String>, new_quantity: u32) {
        self.broadcast(InventoryUpdate {
            isbn: isbn.into(),
            new_quantity,
        });
    }

    /// Takes every message currently queued.
    ///
    /// If the queue is empty, waits up to `wait` for the first message and
    /// then collects whatever else is already available without waiting
    /// again. Returns an empty batch if nothing arrives in time.
    pub fn drain(&self, wait: Duration) -> Vec<Arc<Message>> {
        let first = match self.inbox.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) if !wait.is_zero() => match self.inbox.recv_timeout(wait) {
                Ok(message) => message,
                Err(_) => return Vec::new(),
            },
            Err(_) => return Vec::new(),
        };

        let mut batch = vec![first];
        batch.extend(self.inbox.try_iter());
        batch
    }

    /// `drain` without waiting.
    pub fn try_drain(&self) -> Vec<Arc<Message>> {
        self.drain(Duration::ZERO)
    }

    /// Messages queued and not yet drained.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Unsubscribes every handler of this actor id and discards anything
    /// still queued. Later messages to this id are recorded by the bus but
    /// reach no one. Idempotent.
    pub fn cleanup(&mut self) {
        if self.subscription.take().is_none() {
            return;
        }

        self.bus.unsubscribe(&self.actor_id, None);
        let discarded = self.inbox.try_iter().count();
        debug!(actor = %self.actor_id, discarded, "Mailbox cleaned up");
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.cleanup();
    }
}
