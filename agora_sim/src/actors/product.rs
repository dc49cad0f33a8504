//! One actor per catalog title, tracking its popularity and sales.

use crate::agent::{Actor, ActorContext, ActorReport, ProductReport};
use crate::catalog::{Book, Catalog};
use crate::error::SimError;

use agora_bus::{AlertType, Message, Payload, SystemAlert};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandTrend {
    Falling,
    Stable,
    Rising,
}

impl DemandTrend {
    pub fn all() -> [DemandTrend; 3] {
        [DemandTrend::Falling, DemandTrend::Stable, DemandTrend::Rising]
    }

    /// -1, 0 or 1
    pub fn as_i8(&self) -> i8 {
        match self {
            DemandTrend::Falling => -1,
            DemandTrend::Stable => 0,
            DemandTrend::Rising => 1,
        }
    }
}

pub struct Product {
    isbn: String,
    title: String,
    price: f64,
    sales_count: u32,

    /// 0.1 to 1.0 once drifting
    popularity: f64,

    trend: DemandTrend,
}

impl Product {
    pub fn new(book: &Book, popularity: f64, trend: DemandTrend) -> Self {
        Self {
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            price: book.price,
            sales_count: 0,
            popularity,
            trend,
        }
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn popularity(&self) -> f64 {
        self.popularity
    }

    pub fn sales_count(&self) -> u32 {
        self.sales_count
    }

    fn stock(&self, catalog: &Catalog) -> u32 {
        catalog.book(&self.isbn).map(|b| b.quantity).unwrap_or(0)
    }

    fn suggest_promotion(&self, ctx: &mut ActorContext<'_>) {
        if ctx.rng.gen::<f64>() >= 0.1 {
            return;
        }

        info!("Book '{}' suggested for promotion", self.title);
        ctx.broadcast(SystemAlert {
            alert: AlertType::PromotionSuggestion,
            text: "High demand, low stock".to_string(),
            isbn: Some(self.isbn.clone()),
            popularity: Some(self.popularity),
        });
    }
}

impl Actor for Product {
    fn handle_message(&mut self, message: &Message, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        match message.payload() {
            Payload::PurchaseCompleted(purchase) if purchase.isbn == self.isbn => {
                self.sales_count += 1;
                self.popularity = (self.popularity + 0.02).min(1.0);
                debug!("Book '{}' recorded sale #{}", self.title, self.sales_count);
            }
            Payload::InventoryUpdate(update) if update.isbn == self.isbn => {
                if update.new_quantity <= 3 {
                    self.popularity = (self.popularity + 0.01).min(1.0);
                }
                if update.new_quantity == 0 {
                    ctx.send_restock_request(&self.isbn, 20);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn act(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        if ctx.rng.gen::<f64>() < 0.1 {
            match self.trend {
                DemandTrend::Rising => self.popularity = (self.popularity + 0.05).min(1.0),
                DemandTrend::Falling => self.popularity = (self.popularity - 0.02).max(0.1),
                DemandTrend::Stable => {}
            }
        }

        if ctx.rng.gen::<f64>() < 0.05 {
            if let Some(&trend) = DemandTrend::all().choose(&mut *ctx.rng) {
                self.trend = trend;
            }
        }

        if self.stock(ctx.catalog) <= 5 && self.popularity > 0.7 {
            self.suggest_promotion(ctx);
        }

        Ok(())
    }

    fn report(&self, catalog: &Catalog) -> ActorReport {
        ActorReport::Product(ProductReport {
            title: self.title.clone(),
            isbn: self.isbn.clone(),
            price: self.price,
            sales_count: self.sales_count,
            popularity: self.popularity,
            stock: self.stock(catalog),
            demand_trend: self.trend.as_i8(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_bus::{ActorId, InventoryUpdate, Mailbox, MessageBus, PurchaseCompleted};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const FOUNDATION: &str = "978-0-553-29335-0";

    fn foundation(catalog: &Catalog, popularity: f64) -> Product {
        Product::new(catalog.book(FOUNDATION).unwrap(), popularity, DemandTrend::Stable)
    }

    #[test]
    fn test_sales_raise_popularity() {
        let bus = MessageBus::shared(Default::default());
        let mailbox = Mailbox::register(bus.clone(), ActorId::new("book_0").unwrap());
        let mut catalog = Catalog::with_sample_data();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut product = foundation(&catalog, 0.5);
        let customer = ActorId::new("customer_0").unwrap();

        let sale = |isbn: &str| {
            Message::broadcast(
                customer.clone(),
                PurchaseCompleted {
                    isbn: isbn.to_string(),
                    price: 12.99,
                    customer_name: "Customer_A".into(),
                    new_inventory: 19,
                    order_id: "order_1".into(),
                },
            )
        };

        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            product.handle_message(&sale(FOUNDATION), &mut ctx).unwrap();
            product.handle_message(&sale("other"), &mut ctx).unwrap();
        }

        assert_eq!(product.sales_count(), 1);
        assert!((product.popularity() - 0.52).abs() < 1e-9);
    }

    #[test]
    fn test_sold_out_requests_restock() {
        let bus = MessageBus::shared(Default::default());
        let mailbox = Mailbox::register(bus.clone(), ActorId::new("book_0").unwrap());
        let mut catalog = Catalog::with_sample_data();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut product = foundation(&catalog, 0.5);

        let update = Message::broadcast(
            ActorId::new("customer_0").unwrap(),
            InventoryUpdate { isbn: FOUNDATION.into(), new_quantity: 0 },
        );
        {
            let mut ctx = ActorContext::new(1, &mailbox, &mut catalog, &mut rng);
            product.handle_message(&update, &mut ctx).unwrap();
        }

        assert!((product.popularity() - 0.51).abs() < 1e-9);
        assert_eq!(bus.pending(), 1);
    }

    #[test]
    fn test_report_reads_stock_from_catalog() {
        let catalog = Catalog::with_sample_data();
        let product = foundation(&catalog, 0.5);

        match product.report(&catalog) {
            ActorReport::Product(report) => {
                assert_eq!(report.stock, 20);
                assert_eq!(report.demand_trend, 0);
                assert_eq!(report.title, "Foundation");
            }
            other => panic!("unexpected report {:?}", other),
        }
    }
}
