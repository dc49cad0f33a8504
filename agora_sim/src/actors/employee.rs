//! Staff: restock shelves, process orders and announce promotions.

use crate::agent::{Actor, ActorContext, ActorReport, EmployeeReport};
use crate::catalog::{Catalog, FactStore, OrderStatus, Record, Update};
use crate::error::SimError;
use crate::events::SystemEvent;

use agora_bus::{AlertType, Message, OrderProcessed, Payload, RestockCompleted, SystemAlert};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Manager,
    SalesAssociate,
    InventorySpecialist,
}

impl Role {
    /// Hiring order used when populating the store.
    pub fn all() -> [Role; 3] {
        [Role::Manager, Role::SalesAssociate, Role::InventorySpecialist]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::SalesAssociate => "Sales Associate",
            Role::InventorySpecialist => "Inventory Specialist",
        }
    }

    /// Sales associates and managers handle orders.
    pub fn handles_orders(&self) -> bool {
        matches!(self, Role::Manager | Role::SalesAssociate)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Employee {
    name: String,
    role: Role,
    efficiency: f64,

    /// Decays by 0.5 per tick
    workload: f64,
    max_workload: f64,

    /// Copies added per restock
    restock_amount: u32,

    processed_orders: Vec<String>,
}

impl Employee {
    pub fn new(name: impl Into<String>, role: Role, efficiency: f64) -> Self {
        Self {
            name: name.into(),
            role,
            efficiency,
            workload: 0.0,
            max_workload: 10.0,
            restock_amount: 20,
            processed_orders: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn workload(&self) -> f64 {
        self.workload
    }

    fn is_busy(&self) -> bool {
        self.workload >= self.max_workload
    }

    fn check_inventory_levels(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        if self.is_busy() {
            return Ok(());
        }

        let needed: Vec<String> = ctx
            .catalog
            .restock_needed()
            .into_iter()
            .map(|b| b.isbn.clone())
            .collect();

        for isbn in needed {
            if self.is_busy() {
                break;
            }
            self.restock_book(&isbn, ctx)?;
        }
        Ok(())
    }

    fn restock_book(&mut self, isbn: &str, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        if self.is_busy() {
            return Ok(());
        }

        let Some(Record::Book(book)) = ctx.catalog.lookup(isbn) else {
            debug!("{} cannot restock unknown ISBN {}", self.name, isbn);
            return Ok(());
        };

        let old_quantity = book.quantity;
        let new_quantity = old_quantity + self.restock_amount;
        ctx.catalog.apply_update(isbn, Update::Quantity(new_quantity))?;
        self.workload += 2.0;

        info!(
            "{} restocked '{}' from {} to {}",
            self.name, book.title, old_quantity, new_quantity
        );

        ctx.broadcast(RestockCompleted {
            isbn: isbn.to_string(),
            old_quantity,
            new_quantity,
            employee_name: self.name.clone(),
        });
        ctx.send_inventory_update(isbn, new_quantity);
        Ok(())
    }

    fn process_orders(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        if self.is_busy() || ctx.rng.gen::<f64>() >= 0.3 {
            return Ok(());
        }

        let Some(order_id) = ctx.catalog.next_pending_order().map(|o| o.id.clone()) else {
            return Ok(());
        };

        ctx.catalog
            .apply_update(&order_id, Update::OrderStatus(OrderStatus::Processed))?;
        self.workload += 1.0;
        debug!("{} processed order {}", self.name, order_id);

        ctx.broadcast(OrderProcessed {
            order_id: order_id.clone(),
            processed_by: self.name.clone(),
            employee_role: self.role.name().to_string(),
        });
        self.processed_orders.push(order_id);
        Ok(())
    }

    fn manager_actions(&mut self, ctx: &mut ActorContext<'_>) {
        if self.is_busy() || ctx.rng.gen::<f64>() >= 0.1 {
            return;
        }

        let choices = [AlertType::Sale, AlertType::Promotion, AlertType::NewArrivals];
        let Some(&alert) = choices.choose(&mut *ctx.rng) else {
            return;
        };

        info!("Manager {} sent system alert: {}", self.name, alert.name());
        ctx.broadcast(SystemAlert::new(
            alert,
            format!("Manager {} announced a {}", self.name, alert.name()),
        ));
        self.workload += 1.0;
    }
}

impl Actor for Employee {
    fn handle_message(&mut self, message: &Message, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        match message.payload() {
            Payload::RestockRequest(request) if self.role == Role::InventorySpecialist => {
                self.restock_book(&request.isbn, ctx)?;
            }
            Payload::PurchaseCompleted(purchase) if self.role.handles_orders() => {
                debug!("{} acknowledged purchase of {}", self.name, purchase.isbn);
            }
            _ => {}
        }
        Ok(())
    }

    fn act(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
        self.workload = (self.workload - 0.5).max(0.0);

        if self.role == Role::InventorySpecialist && ctx.rng.gen::<f64>() < 0.4 {
            self.check_inventory_levels(ctx)?;
        }

        if self.role.handles_orders() && ctx.rng.gen::<f64>() < 0.3 {
            self.process_orders(ctx)?;
        }

        if self.role == Role::Manager && ctx.rng.gen::<f64>() < 0.2 {
            self.manager_actions(ctx);
        }

        Ok(())
    }

    fn apply_event(&mut self, event: SystemEvent) {
        if event == SystemEvent::Maintenance {
            self.efficiency *= 0.8;
        }
    }

    fn report(&self, _catalog: &Catalog) -> ActorReport {
        ActorReport::Employee(EmployeeReport {
            name: self.name.clone(),
            role: self.role.name().to_string(),
            efficiency: self.efficiency,
            workload: self.workload,
            orders_processed: self.processed_orders.len(),
        })
    }
}
