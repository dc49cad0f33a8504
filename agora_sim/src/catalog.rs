//! The bookstore catalog: in-memory fact store for books, customers and
//! orders.
//!
//! Actors consult and mutate shared facts only through [`FactStore`]; the
//! bus never sees them.

use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

/// A book with its inventory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genre: String,

    /// Unit price in dollars
    pub price: f64,

    /// Copies on the shelf
    pub quantity: u32,

    /// Restock when `quantity <= reorder_level`
    pub reorder_level: u32,

    pub last_restocked: Option<SystemTime>,
}

impl Book {
    pub fn needs_restock(&self) -> bool {
        self.quantity <= self.reorder_level
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub budget: f64,
    /// Ids of orders placed by this customer
    pub orders: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub isbns: Vec<String>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: SystemTime,
}

/// Any fact the store can return.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Book(Book),
    Customer(CustomerRecord),
    Order(Order),
}

/// A single-field change to a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update {
    /// Book stock level
    Quantity(u32),
    /// Customer budget
    Budget(f64),
    OrderStatus(OrderStatus),
}

impl Update {
    fn field(&self) -> &'static str {
        match self {
            Update::Quantity(_) => "quantity",
            Update::Budget(_) => "budget",
            Update::OrderStatus(_) => "order_status",
        }
    }
}

/// Lookup and update of domain facts by id (ISBN, customer id or order id).
pub trait FactStore {
    fn lookup(&self, id: &str) -> Option<Record>;

    fn apply_update(&mut self, id: &str, update: Update) -> Result<(), CatalogError>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Books keyed by ISBN
    books: BTreeMap<String, Book>,

    customers: BTreeMap<String, CustomerRecord>,

    orders: BTreeMap<String, Order>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog stocked with the four sample titles.
    pub fn with_sample_data() -> Self {
        let mut catalog = Self::new();
        let now = SystemTime::now();

        let samples = [
            ("978-0-00-711931-7", "Murder on the Orient Express", "Agatha Christie", "Mystery", 15.99, 25, 5),
            ("978-0-553-29335-0", "Foundation", "Isaac Asimov", "Science Fiction", 12.99, 20, 5),
            ("978-0-14-143951-8", "Pride and Prejudice", "Jane Austen", "Romance", 9.99, 30, 8),
            ("978-0-307-74365-9", "The Shining", "Stephen King", "Fiction", 13.99, 15, 5),
        ];

        for (isbn, title, author, genre, price, quantity, reorder_level) in samples {
            catalog.add_book(Book {
                isbn: isbn.to_string(),
                title: title.to_string(),
                author: author.to_string(),
                genre: genre.to_string(),
                price,
                quantity,
                reorder_level,
                last_restocked: Some(now),
            });
        }

        catalog
    }

    /// Adds or replaces a book.
    pub fn add_book(&mut self, book: Book) {
        self.books.insert(book.isbn.clone(), book);
    }

    /// All books, ordered by ISBN.
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn book(&self, isbn: &str) -> Option<&Book> {
        self.books.get(isbn)
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    /// Books at or below their reorder level.
    pub fn restock_needed(&self) -> Vec<&Book> {
        self.books.values().filter(|b| b.needs_restock()).collect()
    }

    /// Copies on the shelf across all titles.
    pub fn total_stock(&self) -> u64 {
        self.books.values().map(|b| b.quantity as u64).sum()
    }

    pub fn create_customer(&mut self, id: impl Into<String>, name: impl Into<String>, budget: f64) {
        let id = id.into();
        self.customers.insert(
            id.clone(),
            CustomerRecord {
                id,
                name: name.into(),
                budget,
                orders: Vec::new(),
            },
        );
    }

    pub fn customer(&self, id: &str) -> Option<&CustomerRecord> {
        self.customers.get(id)
    }

    /// Records a pending order for an existing customer and returns its id.
    pub fn create_order(
        &mut self,
        customer_id: &str,
        isbns: Vec<String>,
        total: f64,
    ) -> Result<String, CatalogError> {
        let customer = self
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| CatalogError::unknown(customer_id))?;

        let order_id = new_order_id();
        customer.orders.push(order_id.clone());
        self.orders.insert(
            order_id.clone(),
            Order {
                id: order_id.clone(),
                customer_id: customer_id.to_string(),
                isbns,
                total,
                status: OrderStatus::Pending,
                created_at: SystemTime::now(),
            },
        );

        Ok(order_id)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Oldest pending order, if any.
    pub fn next_pending_order(&self) -> Option<&Order> {
        self.orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending)
            .min_by_key(|o| o.created_at)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl FactStore for Catalog {
    fn lookup(&self, id: &str) -> Option<Record> {
        if let Some(book) = self.books.get(id) {
            return Some(Record::Book(book.clone()));
        }
        if let Some(customer) = self.customers.get(id) {
            return Some(Record::Customer(customer.clone()));
        }
        self.orders.get(id).cloned().map(Record::Order)
    }

    fn apply_update(&mut self, id: &str, update: Update) -> Result<(), CatalogError> {
        let mismatch = || CatalogError::FieldMismatch {
            id: id.to_string(),
            field: update.field(),
        };

        if let Some(book) = self.books.get_mut(id) {
            let Update::Quantity(quantity) = update else {
                return Err(mismatch());
            };
            if quantity > book.quantity {
                book.last_restocked = Some(SystemTime::now());
            }
            book.quantity = quantity;
            return Ok(());
        }

        if let Some(customer) = self.customers.get_mut(id) {
            let Update::Budget(budget) = update else {
                return Err(mismatch());
            };
            customer.budget = budget;
            return Ok(());
        }

        if let Some(order) = self.orders.get_mut(id) {
            let Update::OrderStatus(status) = update else {
                return Err(mismatch());
            };
            order.status = status;
            return Ok(());
        }

        Err(CatalogError::unknown(id))
    }
}

/// Short random order id, e.g. `order_3f2a9c1d`.
fn new_order_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("order_{}", &id[..8])
}
