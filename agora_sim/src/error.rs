//! Error types for the marketplace simulation.

use agora_bus::{ActorId, BusError};
use thiserror::Error;

/// Errors raised by the catalog fact store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// No record with this id exists
    #[error("Unknown record: {0}")]
    UnknownRecord(String),

    /// The update does not apply to this record type
    #[error("Field {field} does not apply to record {id}")]
    FieldMismatch { id: String, field: &'static str },
}

impl CatalogError {
    pub fn unknown(id: impl Into<String>) -> Self {
        Self::UnknownRecord(id.into())
    }
}

/// Errors surfaced by the simulation world and runner.
#[derive(Debug, Error)]
pub enum SimError {
    /// Bus lifecycle failure (dispatcher died, stop timed out, ...)
    #[error("Message bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// An actor with this id is already registered
    #[error("Duplicate actor: {0}")]
    DuplicateActor(ActorId),
}
