//! The actor abstraction driven by the world's step loop.
//!
//! Each tick an actor first handles the messages drained from its mailbox,
//! then acts. The catalog, the RNG and outbound sends are reached only
//! through [`ActorContext`].

use crate::catalog::Catalog;
use crate::error::SimError;
use crate::events::SystemEvent;

use agora_bus::{ActorId, Mailbox, Message, Payload};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Per-call view of the world handed to an actor.
pub struct ActorContext<'a> {
    /// Current tick (1-based)
    pub tick: u64,

    pub catalog: &'a mut Catalog,

    pub rng: &'a mut ChaCha8Rng,

    mailbox: &'a Mailbox,
}

impl<'a> ActorContext<'a> {
    pub fn new(
        tick: u64,
        mailbox: &'a Mailbox,
        catalog: &'a mut Catalog,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            tick,
            catalog,
            rng,
            mailbox,
        }
    }

    /// This actor's id.
    pub fn id(&self) -> &ActorId {
        self.mailbox.id()
    }

    /// Sends a message; `None` broadcasts. Delivered no earlier than the
    /// next tick.
    pub fn send(&self, payload: impl Into<Payload>, recipient: Option<ActorId>) {
        self.mailbox.send(payload, recipient);
    }

    pub fn send_to(&self, recipient: ActorId, payload: impl Into<Payload>) {
        self.mailbox.send_to(recipient, payload);
    }

    pub fn broadcast(&self, payload: impl Into<Payload>) {
        self.mailbox.broadcast(payload);
    }

    pub fn send_inventory_update(&self, isbn: &str, new_quantity: u32) {
        self.mailbox.send_inventory_update(isbn, new_quantity);
    }

    pub fn send_restock_request(&self, isbn: &str, quantity: u32) {
        self.mailbox.send_restock_request(isbn, quantity);
    }
}

/// A participant in the simulation.
pub trait Actor: Send {
    /// Handles one inbound message. Called before `act` in the same tick.
    fn handle_message(&mut self, message: &Message, ctx: &mut ActorContext<'_>) -> Result<(), SimError>;

    /// Takes this tick's autonomous action.
    fn act(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError>;

    /// Reacts to a store-wide event.
    fn apply_event(&mut self, _event: SystemEvent) {}

    /// Snapshot used for metrics and the run summary.
    fn report(&self, catalog: &Catalog) -> ActorReport;
}

// ============================================================================
// REPORTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerReport {
    pub name: String,
    pub budget: f64,
    pub books_purchased: u32,
    pub total_spent: f64,
    pub satisfaction: f64,
    pub shopping_list_size: usize,
}

impl CustomerReport {
    /// Can still afford something.
    pub fn is_active(&self) -> bool {
        self.budget > 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeReport {
    pub name: String,
    pub role: String,
    pub efficiency: f64,
    pub workload: f64,
    pub orders_processed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReport {
    pub title: String,
    pub isbn: String,
    pub price: f64,
    pub sales_count: u32,
    pub popularity: f64,
    pub stock: u32,
    pub demand_trend: i8,
}

/// Typed per-tick snapshot of one actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActorReport {
    Customer(CustomerReport),
    Employee(EmployeeReport),
    Product(ProductReport),
    /// Actors that contribute nothing to metrics
    Other,
}
