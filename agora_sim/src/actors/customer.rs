//! Shoppers: browse the catalog, build a shopping list and buy within budget.

use crate::agent::{Actor, ActorContext, ActorReport, CustomerReport};
use crate::catalog::{Catalog, FactStore, Record, Update};
use crate::error::SimError;
use crate::events::SystemEvent;

use agora_bus::{AlertType, CustomerInquiry, Message, OrderCreated, Payload, PurchaseCompleted};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

/// A book the customer has listed or bought.
#[derive(Debug, Clone, PartialEq)]
struct ListedBook {
    isbn: String,
    title: String,
    price: f64,
}

pub struct Customer {
    name: String,

    /// Id of this customer's record in the catalog
    record_id: String,

    budget: f64,

    shopping_list: Vec<ListedBook>,

    purchased: Vec<ListedBook>,

    browse_probability: f64,

    purchase_probability: f64,

    /// 0.0 to 1.0
    satisfaction: f64,

    visit_count: u64,
}

impl Customer {
    /// Creates a customer. The catalog must already hold a customer record
    /// under `record_id`.
    pub fn new(name: impl Into<String>, record_id: impl Into<String>, budget: f64) -> Self {
        Self {
            name: name.into(),
            record_id: record_id.into(),
            budget,
            shopping_list: Vec::new(),
            purchased: Vec::new(),
            browse_probability: 0.3,
            purchase_probability: 0.4,
            satisfaction: 1.0,
            visit_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn browse_probability(&self) -> f64 {
        self.browse_probability
    }

    pub fn purchase_probability(&self) -> f64 {
        self.purchase_probability
    }

    fn browse(&mut self, ctx: &mut ActorContext<'_>) {
        let books: Vec<_> = ctx.catalog.books().collect();
        let Some(book) = books.choose(&mut *ctx.rng) else {
            return;
        };

        if book.price > self.budget || self.shopping_list.iter().any(|b| b.isbn == book.isbn) {
            return;
        }

        debug!("{} added '{}' to shopping list", self.name, book.title);
        self.shopping_list.push(ListedBook {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            price: book.price,
        });

        ctx.broadcast(CustomerInquiry {
            action: "browsing".to_string(),
            isbn: book.isbn.clone(),
            customer_budget: self.budget,
        });
    }

    fn attempt_purchase(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        if self.shopping_list.is_empty() {
            return Ok(());
        }

        let index = ctx.rng.gen_range(0..self.shopping_list.len());
        let item = &self.shopping_list[index];

        if item.price > self.budget {
            debug!("{} cannot afford '{}'", self.name, item.title);
            self.shopping_list.remove(index);
            return Ok(());
        }

        match ctx.catalog.lookup(&item.isbn) {
            Some(Record::Book(book)) if book.quantity > 0 => {
                self.make_purchase(index, book.quantity, ctx)?;
            }
            Some(Record::Book(_)) => {
                debug!("{} found '{}' out of stock", self.name, item.title);
                self.shopping_list.remove(index);
            }
            _ => {
                self.shopping_list.remove(index);
            }
        }

        Ok(())
    }

    fn make_purchase(
        &mut self,
        index: usize,
        stock: u32,
        ctx: &mut ActorContext<'_>,
    ) -> Result<(), SimError> {
        let item = self.shopping_list[index].clone();
        let new_quantity = stock - 1;
        let new_budget = self.budget - item.price;

        // An unknown customer record fails here, before anything has changed
        let order_id = ctx
            .catalog
            .create_order(&self.record_id, vec![item.isbn.clone()], item.price)?;
        ctx.catalog
            .apply_update(&self.record_id, Update::Budget(new_budget))?;
        ctx.catalog
            .apply_update(&item.isbn, Update::Quantity(new_quantity))?;

        self.shopping_list.remove(index);
        self.budget = new_budget;

        info!(
            "{} purchased '{}' for ${:.2} (remaining budget ${:.2})",
            self.name, item.title, item.price, self.budget
        );

        ctx.broadcast(PurchaseCompleted {
            isbn: item.isbn.clone(),
            price: item.price,
            customer_name: self.name.clone(),
            new_inventory: new_quantity,
            order_id: order_id.clone(),
        });
        ctx.broadcast(OrderCreated {
            order_id,
            customer_id: self.record_id.clone(),
            total: item.price,
        });
        ctx.send_inventory_update(&item.isbn, new_quantity);

        self.satisfaction = (self.satisfaction + 0.1).min(1.0);
        self.purchased.push(item);
        Ok(())
    }

    fn adjust_behavior(&mut self) {
        if self.budget < 20.0 {
            self.purchase_probability *= 0.5;
            self.browse_probability *= 0.8;
        } else if self.budget > 100.0 {
            self.purchase_probability = (self.purchase_probability * 1.2).min(0.6);
            self.browse_probability = (self.browse_probability * 1.1).min(0.5);
        }
    }
}

impl Actor for Customer {
    fn handle_message(&mut self, message: &Message, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        match message.payload() {
            Payload::RestockCompleted(_) => {
                if ctx.rng.gen::<f64>() < 0.3 {
                    self.browse(ctx);
                }
            }
            Payload::SystemAlert(alert) if alert.alert == AlertType::Sale => {
                self.purchase_probability = (self.purchase_probability * 1.5).min(0.8);
                debug!("{} noticed the sale", self.name);
            }
            _ => {}
        }
        Ok(())
    }

    fn act(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        self.visit_count += 1;

        if ctx.rng.gen::<f64>() < self.browse_probability {
            self.browse(ctx);
        }

        if ctx.rng.gen::<f64>() < self.purchase_probability && !self.shopping_list.is_empty() {
            self.attempt_purchase(ctx)?;
        }

        if self.visit_count % 10 == 0 {
            self.adjust_behavior();
        }

        Ok(())
    }

    fn apply_event(&mut self, event: SystemEvent) {
        match event {
            SystemEvent::Sale => {
                self.purchase_probability = (self.purchase_probability * 1.3).min(0.8);
            }
            SystemEvent::NewArrivals => {
                self.browse_probability = (self.browse_probability * 1.2).min(0.6);
            }
            SystemEvent::Maintenance => {}
        }
    }

    fn report(&self, _catalog: &Catalog) -> ActorReport {
        ActorReport::Customer(CustomerReport {
            name: self.name.clone(),
            budget: self.budget,
            books_purchased: self.purchased.len() as u32,
            total_spent: self.purchased.iter().map(|b| b.price).sum(),
            satisfaction: self.satisfaction,
            shopping_list_size: self.shopping_list.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_bus::{ActorId, BusConfig, Mailbox, MessageBus, MessageKind, SystemAlert};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    const FOUNDATION: &str = "978-0-553-29335-0";

    fn setup() -> (std::sync::Arc<MessageBus>, Mailbox, Catalog) {
        let bus = MessageBus::shared(BusConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        });
        let mailbox = Mailbox::register(bus.clone(), ActorId::new("customer_0").unwrap());
        let mut catalog = Catalog::with_sample_data();
        catalog.create_customer("customer_0", "Customer_A", 50.0);
        (bus, mailbox, catalog)
    }

    fn listed(catalog: &Catalog, isbn: &str) -> ListedBook {
        let book = catalog.book(isbn).unwrap();
        ListedBook {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            price: book.price,
        }
    }

    #[test]
    fn test_failed_purchase_keeps_budget_and_list() {
        let (bus, mailbox, mut catalog) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut customer = Customer::new("Customer_B", "customer_missing", 50.0);
        customer.shopping_list.push(listed(&catalog, FOUNDATION));

        let result = {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            customer.attempt_purchase(&mut ctx)
        };

        assert!(result.is_err());
        assert_eq!(customer.budget(), 50.0);
        assert_eq!(customer.shopping_list.len(), 1);
        assert!(customer.purchased.is_empty());
        assert_eq!(catalog.book(FOUNDATION).unwrap().quantity, 20);
        assert_eq!(catalog.order_count(), 0);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_purchase_updates_catalog_and_broadcasts() {
        let (bus, mailbox, mut catalog) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut customer = Customer::new("Customer_A", "customer_0", 50.0);
        customer.shopping_list.push(listed(&catalog, FOUNDATION));

        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            customer.attempt_purchase(&mut ctx).unwrap();
        }

        assert!((customer.budget() - 37.01).abs() < 1e-9);
        assert_eq!(catalog.book(FOUNDATION).unwrap().quantity, 19);
        assert_eq!(catalog.order_count(), 1);
        assert!((catalog.customer("customer_0").unwrap().budget - 37.01).abs() < 1e-9);

        // Queued for the dispatcher, which has not been started
        assert_eq!(bus.pending(), 3);

        match customer.report(&catalog) {
            ActorReport::Customer(report) => {
                assert_eq!(report.books_purchased, 1);
                assert_eq!(report.shopping_list_size, 0);
                assert_eq!(report.satisfaction, 1.0);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_out_of_stock_drops_item() {
        let (bus, mailbox, mut catalog) = setup();
        catalog.apply_update(FOUNDATION, Update::Quantity(0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut customer = Customer::new("Customer_A", "customer_0", 50.0);
        customer.shopping_list.push(listed(&catalog, FOUNDATION));

        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            customer.attempt_purchase(&mut ctx).unwrap();
        }

        assert!(customer.shopping_list.is_empty());
        assert_eq!(customer.budget(), 50.0);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_unaffordable_item_dropped() {
        let (bus, mailbox, mut catalog) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut customer = Customer::new("Customer_A", "customer_0", 5.0);
        customer.shopping_list.push(listed(&catalog, FOUNDATION));

        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            customer.attempt_purchase(&mut ctx).unwrap();
        }

        assert!(customer.shopping_list.is_empty());
        assert_eq!(catalog.book(FOUNDATION).unwrap().quantity, 20);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_sale_alert_and_events_raise_probabilities() {
        let (_bus, mailbox, mut catalog) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut customer = Customer::new("Customer_A", "customer_0", 50.0);

        let alert = Message::broadcast(
            ActorId::new("employee_0").unwrap(),
            SystemAlert::new(AlertType::Sale, "sale"),
        );
        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            customer.handle_message(&alert, &mut ctx).unwrap();
            customer.handle_message(&alert, &mut ctx).unwrap();
        }
        assert!((customer.purchase_probability() - 0.8).abs() < 1e-9);

        customer.apply_event(SystemEvent::NewArrivals);
        assert!((customer.browse_probability() - 0.36).abs() < 1e-9);
        for _ in 0..10 {
            customer.apply_event(SystemEvent::NewArrivals);
        }
        assert!((customer.browse_probability() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_browse_sends_inquiry() {
        let (bus, mailbox, mut catalog) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut customer = Customer::new("Customer_A", "customer_0", 500.0);

        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            customer.browse(&mut ctx);
        }

        // Every book is affordable and the list was empty
        assert_eq!(customer.shopping_list.len(), 1);
        assert_eq!(bus.pending(), 1);

        bus.start().unwrap();
        let listener = Mailbox::register(bus.clone(), ActorId::new("employee_0").unwrap());
        let batch = listener.drain(Duration::from_millis(500));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind(), MessageKind::CustomerInquiry);
        bus.stop().unwrap();
    }
}
