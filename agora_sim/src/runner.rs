//! Simulation runner - builds a store, runs it and summarizes the result.

use crate::actors;
use crate::agent::{ActorReport, CustomerReport, EmployeeReport, ProductReport};
use crate::catalog::Catalog;
use crate::error::SimError;
use crate::world::{SimConfig, SimWorld};

use agora_bus::MessageBus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::thread;
use std::time::Instant;
use tracing::info;

/// Seed extension for the population RNG stream
const POPULATION_STREAM: u64 = 0x706f70;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationInfo {
    pub seed: u64,
    pub steps_completed: u64,
    pub simulation_time_seconds: f64,
    pub steps_per_second: f64,
    pub actors_total: usize,
    /// "completed" once the world has stopped itself, else "running"
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialMetrics {
    pub total_sales: f64,
    pub total_books_sold: u32,
    pub average_book_price: f64,
    pub purchase_rate_per_step: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerMetrics {
    pub total_customers: usize,
    pub average_satisfaction: f64,
    pub average_budget_remaining: f64,
    /// Share of customers who bought at least one book
    pub engagement_rate: f64,
    pub details: Vec<CustomerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeMetrics {
    pub total_employees: usize,
    pub total_orders_processed: usize,
    pub average_efficiency: f64,
    pub details: Vec<EmployeeReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryMetrics {
    pub total_books: usize,
    pub total_stock_remaining: u64,
    pub average_popularity: f64,
    /// sold / (sold + on shelf)
    pub inventory_turnover: f64,
    pub details: Vec<ProductReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunicationMetrics {
    pub total_messages: u64,
    pub message_kinds: BTreeMap<String, u64>,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub messages_per_step: f64,
}

/// End-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub simulation_info: SimulationInfo,
    pub financial_metrics: FinancialMetrics,
    pub customer_metrics: CustomerMetrics,
    pub employee_metrics: EmployeeMetrics,
    pub inventory_metrics: InventoryMetrics,
    pub communication_metrics: CommunicationMetrics,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl SimulationSummary {
    /// Summarizes a world's current state.
    pub fn collect(world: &SimWorld, elapsed_secs: f64) -> Self {
        let mut customers = Vec::new();
        let mut employees = Vec::new();
        let mut products = Vec::new();
        for (_, report) in world.reports() {
            match report {
                ActorReport::Customer(c) => customers.push(c),
                ActorReport::Employee(e) => employees.push(e),
                ActorReport::Product(p) => products.push(p),
                ActorReport::Other => {}
            }
        }

        let steps = world.tick_count();
        let stats = world.bus().get_stats();

        let total_sales: f64 = customers.iter().map(|c| c.total_spent).sum();
        let total_books_sold: u32 = customers.iter().map(|c| c.books_purchased).sum();
        let total_stock: u64 = products.iter().map(|p| p.stock as u64).sum();

        SimulationSummary {
            simulation_info: SimulationInfo {
                seed: world.config.seed,
                steps_completed: steps,
                simulation_time_seconds: elapsed_secs,
                steps_per_second: ratio(steps as f64, elapsed_secs),
                actors_total: world.actor_count(),
                status: (if world.is_running() { "running" } else { "completed" }).to_string(),
            },
            financial_metrics: FinancialMetrics {
                total_sales,
                total_books_sold,
                average_book_price: ratio(total_sales, total_books_sold as f64),
                purchase_rate_per_step: ratio(total_books_sold as f64, steps as f64),
            },
            customer_metrics: CustomerMetrics {
                total_customers: customers.len(),
                average_satisfaction: mean(customers.iter().map(|c| c.satisfaction)),
                average_budget_remaining: mean(customers.iter().map(|c| c.budget)),
                engagement_rate: ratio(
                    customers.iter().filter(|c| c.books_purchased > 0).count() as f64,
                    customers.len() as f64,
                ),
                details: customers,
            },
            employee_metrics: EmployeeMetrics {
                total_employees: employees.len(),
                total_orders_processed: employees.iter().map(|e| e.orders_processed).sum(),
                average_efficiency: mean(employees.iter().map(|e| e.efficiency)),
                details: employees,
            },
            inventory_metrics: InventoryMetrics {
                total_books: products.len(),
                total_stock_remaining: total_stock,
                average_popularity: mean(products.iter().map(|p| p.popularity)),
                inventory_turnover: ratio(
                    total_books_sold as f64,
                    (total_stock + total_books_sold as u64) as f64,
                ),
                details: products,
            },
            communication_metrics: CommunicationMetrics {
                total_messages: stats.total_messages,
                message_kinds: stats
                    .message_kinds
                    .iter()
                    .map(|(kind, count)| (kind.name().to_string(), *count))
                    .collect(),
                deliveries: stats.deliveries,
                delivery_failures: stats.delivery_failures,
                messages_per_step: ratio(stats.total_messages as f64, steps as f64),
            },
        }
    }
}

/// Runs a full bookstore simulation.
pub struct SimulationRunner {
    config: SimConfig,
}

impl SimulationRunner {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Builds the store, runs up to `steps` ticks and returns the summary.
    /// The bus is shut down whether or not the run succeeds.
    pub fn run(&self, steps: u64) -> Result<SimulationSummary, SimError> {
        let bus = MessageBus::shared(self.config.bus.clone());
        let mut world = SimWorld::new(self.config.clone(), bus, Catalog::with_sample_data());

        let outcome = self.drive(&mut world, steps);
        let shutdown = world.shutdown();

        let summary = outcome?;
        shutdown?;
        Ok(summary)
    }

    fn drive(&self, world: &mut SimWorld, steps: u64) -> Result<SimulationSummary, SimError> {
        let mut rng = world.context.derive_rng(POPULATION_STREAM);
        actors::populate(
            world,
            self.config.num_customers,
            self.config.num_employees,
            &mut rng,
        )?;
        if let Some(event) = self.config.opening_event {
            world.trigger_event(event);
        }
        world.bus().start()?;

        info!(
            seed = self.config.seed,
            actors = world.actor_count(),
            "Starting bookstore simulation for {} steps",
            steps
        );

        let started = Instant::now();
        for _ in 0..steps {
            if !world.is_running() {
                break;
            }
            world.step()?;
            if !self.config.tick_pause.is_zero() {
                thread::sleep(self.config.tick_pause);
            }
        }

        let summary = SimulationSummary::collect(world, started.elapsed().as_secs_f64());
        info!(
            "Simulation finished after {} steps: ${:.2} in sales, {} books sold",
            summary.simulation_info.steps_completed,
            summary.financial_metrics.total_sales,
            summary.financial_metrics.total_books_sold
        );
        Ok(summary)
    }
}
