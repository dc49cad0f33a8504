//! Bounded record of dispatched messages.

use crate::message::Message;
use crate::types::{ActorId, MessageKind};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

/// Default number of records retained by the bus.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default `HistoryQuery::limit`.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// One dispatched message and how many handlers it was routed to.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub message: Arc<Message>,

    /// Handlers selected at dispatch time (0 for an unknown recipient)
    pub recipients: usize,
}

/// Append-only ring buffer; the oldest record is evicted once full.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<DeliveryRecord>,
    capacity: usize,
}

impl History {
    /// Creates an empty history retaining at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Appends a record, evicting from the front when over capacity.
    pub fn push(&mut self, record: DeliveryRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &DeliveryRecord> {
        self.entries.iter()
    }

    /// Returns a copy of the matching records, most recent first.
    pub fn query(&self, query: &HistoryQuery) -> Vec<DeliveryRecord> {
        let limit = if query.limit == 0 { usize::MAX } else { query.limit };

        self.entries
            .iter()
            .rev()
            .filter(|record| query.matches(&record.message))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Filter for `MessageBus::get_history`. All supplied filters must match.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Sender or explicit recipient
    pub actor: Option<ActorId>,

    pub kind: Option<MessageKind>,

    /// Inclusive lower bound on the message timestamp
    pub since: Option<SystemTime>,

    /// Maximum records returned; 0 means unlimited
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            actor: None,
            kind: None,
            since: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn since(mut self, since: SystemTime) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn matches(&self, message: &Message) -> bool {
        if let Some(actor) = &self.actor {
            if !message.involves(actor) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if message.kind() != kind {
                return false;
            }
        }
        if let Some(since) = self.since {
            if message.timestamp() < since {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{InventoryUpdate, PurchaseRequest};
    use proptest::prelude::*;
    use std::time::Duration;

    fn id(s: &str) -> ActorId {
        ActorId::new(s).unwrap()
    }

    fn record(seq: u32) -> DeliveryRecord {
        let ts = SystemTime::UNIX_EPOCH + Duration::from_secs(seq as u64);
        let message = Message::at(
            id("sender"),
            None,
            InventoryUpdate { isbn: "X".into(), new_quantity: seq },
            ts,
        );
        DeliveryRecord { message: Arc::new(message), recipients: 0 }
    }

    fn quantity(record: &DeliveryRecord) -> u32 {
        match record.message.payload() {
            crate::message::Payload::InventoryUpdate(update) => update.new_quantity,
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = History::with_capacity(3);
        for seq in 0..5 {
            history.push(record(seq));
        }

        let kept: Vec<u32> = history.iter().map(quantity).collect();
        assert_eq!(kept, vec![2, 3, 4]);
    }

    #[test]
    fn test_query_is_most_recent_first() {
        let mut history = History::with_capacity(10);
        for seq in 0..5 {
            history.push(record(seq));
        }

        let latest: Vec<u32> = history
            .query(&HistoryQuery::new().limit(2))
            .iter()
            .map(quantity)
            .collect();
        assert_eq!(latest, vec![4, 3]);

        let all = history.query(&HistoryQuery::new().limit(0));
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_query_filters_combine() {
        let mut history = History::with_capacity(10);
        history.push(record(1));
        history.push(DeliveryRecord {
            message: Arc::new(Message::at(
                id("A"),
                Some(id("B")),
                PurchaseRequest { isbn: "X".into(), quantity: 1 },
                SystemTime::UNIX_EPOCH + Duration::from_secs(10),
            )),
            recipients: 1,
        });
        history.push(record(20));

        let for_b = history.query(&HistoryQuery::new().actor(id("B")));
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].message.sender().as_str(), "A");

        let purchases = history.query(&HistoryQuery::new().kind(MessageKind::PurchaseRequest));
        assert_eq!(purchases.len(), 1);

        let recent = history.query(
            &HistoryQuery::new().since(SystemTime::UNIX_EPOCH + Duration::from_secs(10)),
        );
        assert_eq!(recent.len(), 2);

        let none = history.query(
            &HistoryQuery::new()
                .actor(id("B"))
                .kind(MessageKind::InventoryUpdate),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_default_capacity_keeps_newest_thousand() {
        assert_eq!(DEFAULT_HISTORY_CAPACITY, 1000);

        let mut history = History::with_capacity(DEFAULT_HISTORY_CAPACITY);
        for seq in 0..1250 {
            history.push(record(seq));
        }

        assert_eq!(history.len(), 1000);
        let kept: Vec<u32> = history.iter().map(quantity).collect();
        assert_eq!(kept, (250..1250).collect::<Vec<u32>>());
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut history = History::with_capacity(0);
        history.push(record(1));
        assert!(history.is_empty());
    }

    proptest! {
        #[test]
        fn prop_history_keeps_most_recent(capacity in 1usize..64, inserts in 0u32..200) {
            let mut history = History::with_capacity(capacity);
            for seq in 0..inserts {
                history.push(record(seq));
            }

            let expected_len = (inserts as usize).min(capacity);
            prop_assert_eq!(history.len(), expected_len);

            let kept: Vec<u32> = history.iter().map(quantity).collect();
            let expected: Vec<u32> = (inserts - expected_len as u32..inserts).collect();
            prop_assert_eq!(kept, expected);
        }
    }
}
