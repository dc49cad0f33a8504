//! Agora Bookstore Simulation
//!
//! A seeded, tick-driven marketplace of customers, employees and book
//! products that talk to each other only through the [`agora_bus`]
//! message bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── SimWorld ─────────────────────────────┐
//! │  SimContext (tick clock + ChaCha8 RNG)     Catalog (fact store)   │
//! │                                                                   │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐                       │
//! │  │ Customer │   │ Employee │   │ Product  │   ... shuffled/tick   │
//! │  └────┬─────┘   └────┬─────┘   └────┬─────┘                       │
//! │       │ Mailbox      │ Mailbox      │ Mailbox                     │
//! └───────┼──────────────┼──────────────┼─────────────────────────────┘
//!         └──────────────┴──────┬───────┘
//!                        ┌──────▼──────┐
//!                        │ MessageBus  │  (dispatcher thread)
//!                        └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use agora_sim::{SimConfig, SimulationRunner};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     num_customers: 10,
//!     ..Default::default()
//! };
//!
//! let summary = SimulationRunner::new(config).run(100)?;
//! println!("{} books sold", summary.financial_metrics.total_books_sold);
//! ```

pub mod actors;
mod agent;
mod catalog;
mod context;
mod error;
mod events;
mod metrics;
mod runner;
mod world;

pub use agent::{Actor, ActorContext, ActorReport, CustomerReport, EmployeeReport, ProductReport};
pub use catalog::{Book, Catalog, CustomerRecord, FactStore, Order, OrderStatus, Record, Update};
pub use context::SimContext;
pub use error::{CatalogError, SimError};
pub use events::SystemEvent;
pub use metrics::{MetricsSink, TickMetrics, TimeSeries};
pub use runner::{
    CommunicationMetrics, CustomerMetrics, EmployeeMetrics, FinancialMetrics, InventoryMetrics,
    SimulationInfo, SimulationRunner, SimulationSummary,
};
pub use world::{SimConfig, SimWorld};
