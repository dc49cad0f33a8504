//! Agora Message Bus
//!
//! The messaging core of the Agora marketplace simulation: a process-local,
//! best-effort router that decouples actors from one another.
//!
//! # Architecture
//!
//! ```text
//!  Actor ──send()/broadcast()──► Mailbox ──enqueue()──┐
//!                                                     ▼
//!  ┌──────────────────────────── MessageBus ──────────────────────────┐
//!  │  outbound queue (crossbeam, lock-free)                           │
//!  │        │                                                         │
//!  │  ┌─────▼──────────────┐   ┌────────────┐   ┌─────────────────┐   │
//!  │  │ dispatcher thread  │──►│  registry  │   │ history (ring)  │   │
//!  │  └────────────────────┘   └─────┬──────┘   └─────────────────┘   │
//!  └─────────────────────────────────┼────────────────────────────────┘
//!                                    ▼
//!                         Mailbox(es) ──drain()──► Actor (next tick)
//! ```
//!
//! Delivery is asynchronous with respect to the caller: a message sent
//! during one simulation tick is only guaranteed to be visible to its
//! recipient on a later tick. Nothing is durable and nothing is delivered
//! exactly-once.
//!
//! # Example
//!
//! ```ignore
//! use agora_bus::{ActorId, Mailbox, MessageBus, SystemAlert, AlertType};
//!
//! let bus = MessageBus::shared(Default::default());
//! bus.start()?;
//!
//! let manager = Mailbox::register(bus.clone(), ActorId::new("employee_0")?);
//! manager.broadcast(SystemAlert::new(AlertType::Sale, "Spring sale"));
//! ```

mod bus;
mod error;
mod handler;
mod history;
mod mailbox;
mod message;
mod types;

pub use bus::{BusConfig, BusStats, MessageBus};
pub use error::{BusError, DeliveryError};
pub use handler::{Deliver, SubscriptionId};
pub use history::{DeliveryRecord, History, HistoryQuery, DEFAULT_HISTORY_CAPACITY, DEFAULT_QUERY_LIMIT};
pub use mailbox::Mailbox;
pub use message::{
    AlertType, CustomerInquiry, EmployeeAction, InventoryUpdate, Message, OrderCreated,
    OrderProcessed, Payload, PurchaseCompleted, PurchaseRequest, RestockCompleted,
    RestockRequest, SystemAlert,
};
pub use types::{ActorId, MessageKind};
