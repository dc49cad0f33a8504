//! Per-tick metrics folded from actor reports.

use crate::agent::ActorReport;
use crate::catalog::Catalog;

use serde::Serialize;
use std::collections::BTreeMap;

/// Store-wide snapshot taken at the end of a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickMetrics {
    pub tick: u64,

    /// Dollars spent by all customers so far
    pub total_sales: f64,

    pub books_sold: u32,

    /// Mean customer satisfaction (0 with no customers)
    pub avg_satisfaction: f64,

    /// Copies on the shelf across all titles
    pub total_stock: u64,

    /// Titles at or below their reorder level
    pub low_stock_items: usize,

    pub active_customers: usize,

    pub active_employees: usize,

    /// Messages the bus has accepted so far
    pub message_count: u64,
}

impl TickMetrics {
    /// Folds actor reports and catalog state into one snapshot.
    pub fn collect<'a>(
        tick: u64,
        reports: impl IntoIterator<Item = &'a ActorReport>,
        catalog: &Catalog,
        message_count: u64,
    ) -> Self {
        let mut metrics = TickMetrics {
            tick,
            total_stock: catalog.total_stock(),
            low_stock_items: catalog.restock_needed().len(),
            message_count,
            ..Default::default()
        };

        let mut customers = 0usize;
        let mut satisfaction = 0.0;

        for report in reports {
            match report {
                ActorReport::Customer(c) => {
                    customers += 1;
                    satisfaction += c.satisfaction;
                    metrics.total_sales += c.total_spent;
                    metrics.books_sold += c.books_purchased;
                    if c.is_active() {
                        metrics.active_customers += 1;
                    }
                }
                ActorReport::Employee(_) => metrics.active_employees += 1,
                ActorReport::Product(_) | ActorReport::Other => {}
            }
        }

        if customers > 0 {
            metrics.avg_satisfaction = satisfaction / customers as f64;
        }

        metrics
    }
}

/// Consumer of per-tick metrics.
pub trait MetricsSink {
    fn record(&mut self, metrics: &TickMetrics);
}

/// In-memory time series keyed by tick.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    samples: BTreeMap<u64, TickMetrics>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tick: u64) -> Option<&TickMetrics> {
        self.samples.get(&tick)
    }

    pub fn latest(&self) -> Option<&TickMetrics> {
        self.samples.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in tick order.
    pub fn iter(&self) -> impl Iterator<Item = &TickMetrics> {
        self.samples.values()
    }
}

impl MetricsSink for TimeSeries {
    fn record(&mut self, metrics: &TickMetrics) {
        self.samples.insert(metrics.tick, metrics.clone());
    }
}
