//! Common types for the Agora message bus.

use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an actor registered on the bus.
///
/// Always non-empty. A broadcast is expressed by the absence of a
/// recipient, never by an empty id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActorId(String);

impl ActorId {
    /// Creates an actor id, rejecting empty or whitespace-only strings.
    pub fn new(id: impl Into<String>) -> Result<Self, BusError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BusError::EmptyActorId);
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActorId {
    type Error = BusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActorId> for String {
    fn from(id: ActorId) -> Self {
        id.0
    }
}

impl FromStr for ActorId {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ActorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of message kinds exchanged between actors.
///
/// New kinds are added as new variants; existing variants are never
/// repurposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    PurchaseRequest,
    PurchaseCompleted,
    InventoryUpdate,
    RestockRequest,
    RestockCompleted,
    OrderCreated,
    OrderProcessed,
    CustomerInquiry,
    EmployeeAction,
    SystemAlert,
}

impl MessageKind {
    /// Returns every kind, in declaration order.
    pub fn all() -> [MessageKind; 10] {
        [
            MessageKind::PurchaseRequest,
            MessageKind::PurchaseCompleted,
            MessageKind::InventoryUpdate,
            MessageKind::RestockRequest,
            MessageKind::RestockCompleted,
            MessageKind::OrderCreated,
            MessageKind::OrderProcessed,
            MessageKind::CustomerInquiry,
            MessageKind::EmployeeAction,
            MessageKind::SystemAlert,
        ]
    }

    /// Returns the wire name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::PurchaseRequest => "purchase_request",
            MessageKind::PurchaseCompleted => "purchase_completed",
            MessageKind::InventoryUpdate => "inventory_update",
            MessageKind::RestockRequest => "restock_request",
            MessageKind::RestockCompleted => "restock_completed",
            MessageKind::OrderCreated => "order_created",
            MessageKind::OrderProcessed => "order_processed",
            MessageKind::CustomerInquiry => "customer_inquiry",
            MessageKind::EmployeeAction => "employee_action",
            MessageKind::SystemAlert => "system_alert",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::all()
            .into_iter()
            .find(|kind| kind.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown message kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_rejects_empty() {
        assert!(matches!(ActorId::new(""), Err(BusError::EmptyActorId)));
        assert!(matches!(ActorId::new("   "), Err(BusError::EmptyActorId)));
        assert_eq!(ActorId::new("customer_0").unwrap().as_str(), "customer_0");
    }

    #[test]
    fn test_actor_id_serde_validates() {
        let id: ActorId = serde_json::from_str("\"employee_1\"").unwrap();
        assert_eq!(id.to_string(), "employee_1");

        assert!(serde_json::from_str::<ActorId>("\"\"").is_err());
    }

    #[test]
    fn test_message_kind_names_round_trip() {
        for kind in MessageKind::all() {
            assert_eq!(kind.name().parse::<MessageKind>(), Ok(kind));
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.name())
            );
        }

        assert!("refund_request".parse::<MessageKind>().is_err());
    }
}
