//! Messages exchanged between marketplace actors.
//!
//! A [`Message`] is immutable once constructed. Its kind is derived from
//! the [`Payload`] variant, so the two can never disagree, and every
//! payload field is statically typed per kind.

use crate::types::{ActorId, MessageKind};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// An immutable message routed by the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    sender_id: ActorId,

    /// `None` means broadcast
    #[serde(skip_serializing_if = "Option::is_none", default)]
    recipient_id: Option<ActorId>,

    payload: Payload,

    timestamp: SystemTime,
}

impl Message {
    /// Creates a message stamped with the current wall-clock time.
    pub fn new(sender_id: ActorId, recipient_id: Option<ActorId>, payload: impl Into<Payload>) -> Self {
        Self::at(sender_id, recipient_id, payload, SystemTime::now())
    }

    /// Creates a message with an explicit timestamp.
    pub fn at(
        sender_id: ActorId,
        recipient_id: Option<ActorId>,
        payload: impl Into<Payload>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            sender_id,
            recipient_id,
            payload: payload.into(),
            timestamp,
        }
    }

    /// Creates a point-to-point message.
    pub fn direct(sender_id: ActorId, recipient_id: ActorId, payload: impl Into<Payload>) -> Self {
        Self::new(sender_id, Some(recipient_id), payload)
    }

    /// Creates a broadcast message.
    pub fn broadcast(sender_id: ActorId, payload: impl Into<Payload>) -> Self {
        Self::new(sender_id, None, payload)
    }

    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn sender(&self) -> &ActorId {
        &self.sender_id
    }

    pub fn recipient(&self) -> Option<&ActorId> {
        self.recipient_id.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn is_broadcast(&self) -> bool {
        self.recipient_id.is_none()
    }

    /// True if `actor` sent this message or is its explicit recipient.
    pub fn involves(&self, actor: &ActorId) -> bool {
        &self.sender_id == actor || self.recipient_id.as_ref() == Some(actor)
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Typed message body, one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    PurchaseRequest(PurchaseRequest),
    PurchaseCompleted(PurchaseCompleted),
    InventoryUpdate(InventoryUpdate),
    RestockRequest(RestockRequest),
    RestockCompleted(RestockCompleted),
    OrderCreated(OrderCreated),
    OrderProcessed(OrderProcessed),
    CustomerInquiry(CustomerInquiry),
    EmployeeAction(EmployeeAction),
    SystemAlert(SystemAlert),
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::PurchaseRequest(_) => MessageKind::PurchaseRequest,
            Payload::PurchaseCompleted(_) => MessageKind::PurchaseCompleted,
            Payload::InventoryUpdate(_) => MessageKind::InventoryUpdate,
            Payload::RestockRequest(_) => MessageKind::RestockRequest,
            Payload::RestockCompleted(_) => MessageKind::RestockCompleted,
            Payload::OrderCreated(_) => MessageKind::OrderCreated,
            Payload::OrderProcessed(_) => MessageKind::OrderProcessed,
            Payload::CustomerInquiry(_) => MessageKind::CustomerInquiry,
            Payload::EmployeeAction(_) => MessageKind::EmployeeAction,
            Payload::SystemAlert(_) => MessageKind::SystemAlert,
        }
    }

    /// ISBN the payload refers to, if any.
    pub fn isbn(&self) -> Option<&str> {
        match self {
            Payload::PurchaseRequest(p) => Some(&p.isbn),
            Payload::PurchaseCompleted(p) => Some(&p.isbn),
            Payload::InventoryUpdate(p) => Some(&p.isbn),
            Payload::RestockRequest(p) => Some(&p.isbn),
            Payload::RestockCompleted(p) => Some(&p.isbn),
            Payload::CustomerInquiry(p) => Some(&p.isbn),
            Payload::SystemAlert(p) => p.isbn.as_deref(),
            Payload::OrderCreated(_) | Payload::OrderProcessed(_) | Payload::EmployeeAction(_) => None,
        }
    }
}

macro_rules! payload_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Payload {
                fn from(body: $variant) -> Self {
                    Payload::$variant(body)
                }
            }
        )*
    };
}

payload_from!(
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
);

/// Request to buy copies of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub isbn: String,
    pub quantity: u32,
}

/// A customer finished buying a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseCompleted {
    pub isbn: String,
    pub price: f64,
    pub customer_name: String,
    /// Stock left after the sale
    pub new_inventory: u32,
    pub order_id: String,
}

/// Stock level of a book changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUpdate {
    pub isbn: String,
    pub new_quantity: u32,
}

/// Ask inventory staff to restock a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockRequest {
    pub isbn: String,
    pub quantity: u32,
}

/// An employee restocked a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockCompleted {
    pub isbn: String,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub employee_name: String,
}

/// A new order was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: String,
    pub customer_id: String,
    pub total: f64,
}

/// An employee processed an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProcessed {
    pub order_id: String,
    pub processed_by: String,
    pub employee_role: String,
}

/// A customer is looking at a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInquiry {
    pub action: String,
    pub isbn: String,
    pub customer_budget: f64,
}

/// Free-form employee activity notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeAction {
    pub employee_name: String,
    pub action: String,
}

/// Category of a store-wide alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Sale,
    Promotion,
    NewArrivals,
    PromotionSuggestion,
}

impl AlertType {
    pub fn name(&self) -> &'static str {
        match self {
            AlertType::Sale => "sale",
            AlertType::Promotion => "promotion",
            AlertType::NewArrivals => "new_arrivals",
            AlertType::PromotionSuggestion => "promotion_suggestion",
        }
    }
}

/// Store-wide alert, usually broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAlert {
    #[serde(rename = "type")]
    pub alert: AlertType,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub popularity: Option<f64>,
}

impl SystemAlert {
    /// Creates an alert that is not tied to a specific book.
    pub fn new(alert: AlertType, text: impl Into<String>) -> Self {
        Self {
            alert,
            text: text.into(),
            isbn: None,
            popularity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ActorId {
        ActorId::new(s).unwrap()
    }

    #[test]
    fn test_kind_follows_payload() {
        let msg = Message::direct(
            id("A"),
            id("B"),
            PurchaseRequest { isbn: "X".into(), quantity: 1 },
        );

        assert_eq!(msg.kind(), MessageKind::PurchaseRequest);
        assert_eq!(msg.sender().as_str(), "A");
        assert_eq!(msg.recipient().map(ActorId::as_str), Some("B"));
        assert!(!msg.is_broadcast());
        assert_eq!(msg.payload().isbn(), Some("X"));
    }

    #[test]
    fn test_broadcast_has_no_recipient() {
        let msg = Message::broadcast(id("A"), SystemAlert::new(AlertType::Sale, "sale"));

        assert!(msg.is_broadcast());
        assert!(msg.involves(&id("A")));
        assert!(!msg.involves(&id("B")));
        assert_eq!(msg.kind(), MessageKind::SystemAlert);
    }

    #[test]
    fn test_explicit_timestamp_is_kept() {
        let ts = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_704_067_200);
        let msg = Message::at(id("A"), None, EmployeeAction {
            employee_name: "Alice".into(),
            action: "opened store".into(),
        }, ts);

        assert_eq!(msg.timestamp(), ts);
    }

    #[test]
    fn test_payload_json_carries_kind_tag() {
        let payload: Payload = SystemAlert::new(AlertType::Sale, "Spring sale").into();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["kind"], "system_alert");
        assert_eq!(json["type"], "sale");
        assert!(json.get("isbn").is_none());
    }
}
