//! SimWorld - the tick-driven scheduler.
//!
//! ```text
//!  step():
//!    advance tick ─► shuffle actors ─► for each actor:
//!                                        drain mailbox ─► handle_message*
//!                                        act
//!                 ─► collect TickMetrics ─► sinks
//!                 ─► periodic: system event / health check / status line
//!                 ─► bus.check_health()
//! ```
//!
//! A message sent during tick N is delivered by the bus dispatcher in the
//! background and is picked up by its recipient on tick N+1 or later.

use crate::agent::{Actor, ActorContext, ActorReport};
use crate::catalog::Catalog;
use crate::context::SimContext;
use crate::error::SimError;
use crate::events::SystemEvent;
use crate::metrics::{MetricsSink, TickMetrics, TimeSeries};

use agora_bus::{ActorId, BusConfig, Mailbox, MessageBus};
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    pub num_customers: usize,

    pub num_employees: usize,

    /// The world stops itself after this many ticks (0 = unlimited)
    pub max_ticks: u64,

    /// How long each actor waits on an empty mailbox per tick
    pub drain_wait: Duration,

    /// Real-time pause between ticks when driven by the runner
    pub tick_pause: Duration,

    /// Ticks between system event rolls (0 = never)
    pub event_interval: u64,

    /// Chance that a roll produces an event
    pub event_probability: f64,

    /// Ticks between health checks (0 = never)
    pub health_interval: u64,

    /// Ticks between status log lines (0 = never)
    pub status_interval: u64,

    /// Event applied to every actor before the first tick
    pub opening_event: Option<SystemEvent>,

    pub bus: BusConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_customers: 10,
            num_employees: 3,
            max_ticks: 500,
            drain_wait: Duration::from_millis(10),
            tick_pause: Duration::ZERO,
            event_interval: 20,
            event_probability: 0.1,
            health_interval: 50,
            status_interval: 25,
            opening_event: None,
            bus: BusConfig::default(),
        }
    }
}

/// A registered actor and its mailbox.
struct ActorSlot {
    mailbox: Mailbox,
    actor: Box<dyn Actor>,
}

fn due(tick: u64, interval: u64) -> bool {
    interval > 0 && tick % interval == 0
}

/// The SimWorld - owns the actors, the catalog and the clock.
pub struct SimWorld {
    pub config: SimConfig,

    /// Tick clock and seeded RNG
    pub context: SimContext,

    /// Shared domain facts
    pub catalog: Catalog,

    bus: Arc<MessageBus>,

    /// Registration order; activation order is reshuffled every tick
    slots: Vec<ActorSlot>,

    /// Built-in metrics history
    metrics: TimeSeries,

    /// Additional consumers of per-tick metrics
    sinks: Vec<Box<dyn MetricsSink>>,

    /// Actor ids in the order they ran on the last tick
    last_activation: Vec<ActorId>,

    running: bool,
}

impl SimWorld {
    /// Creates a world on an existing bus. The bus is not started here.
    pub fn new(config: SimConfig, bus: Arc<MessageBus>, catalog: Catalog) -> Self {
        let context = SimContext::new(config.seed);

        Self {
            config,
            context,
            catalog,
            bus,
            slots: Vec::new(),
            metrics: TimeSeries::new(),
            sinks: Vec::new(),
            last_activation: Vec::new(),
            running: true,
        }
    }

    /// Registers an actor and subscribes its mailbox to the bus.
    pub fn add_actor(&mut self, id: ActorId, actor: Box<dyn Actor>) -> Result<(), SimError> {
        if self.slots.iter().any(|s| s.mailbox.id() == &id) {
            return Err(SimError::DuplicateActor(id));
        }

        debug!(actor = %id, "Actor added");
        let mailbox = Mailbox::register(Arc::clone(&self.bus), id);
        self.slots.push(ActorSlot { mailbox, actor });
        Ok(())
    }

    /// Removes an actor and cleans up its mailbox. Messages still queued
    /// for it are discarded.
    pub fn remove_actor(&mut self, id: &ActorId) -> Option<Box<dyn Actor>> {
        let index = self.slots.iter().position(|s| s.mailbox.id() == id)?;
        let ActorSlot { mut mailbox, actor } = self.slots.remove(index);
        mailbox.cleanup();
        debug!(actor = %id, "Actor removed");
        Some(actor)
    }

    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Registered actor ids in registration order.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.slots.iter().map(|s| s.mailbox.id().clone()).collect()
    }

    pub fn actor_count(&self) -> usize {
        self.slots.len()
    }

    pub fn last_activation_order(&self) -> &[ActorId] {
        &self.last_activation
    }

    pub fn tick_count(&self) -> u64 {
        self.context.tick()
    }

    /// False once `max_ticks` is reached or after `shutdown()`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn metrics(&self) -> &TimeSeries {
        &self.metrics
    }

    /// Current report of every actor, in registration order.
    pub fn reports(&self) -> Vec<(ActorId, ActorReport)> {
        self.slots
            .iter()
            .map(|s| (s.mailbox.id().clone(), s.actor.report(&self.catalog)))
            .collect()
    }

    /// Runs one tick.
    pub fn step(&mut self) -> Result<TickMetrics, SimError> {
        let tick = self.context.advance_tick();

        let mut order: Vec<usize> = (0..self.slots.len()).collect();
        order.shuffle(self.context.rng());

        self.last_activation.clear();
        for index in order {
            let ActorSlot { mailbox, actor } = &mut self.slots[index];
            self.last_activation.push(mailbox.id().clone());

            let batch = mailbox.drain(self.config.drain_wait);
            let mut ctx = ActorContext::new(tick, mailbox, &mut self.catalog, self.context.rng());

            for message in &batch {
                if let Err(e) = actor.handle_message(message, &mut ctx) {
                    warn!(actor = %mailbox.id(), kind = %message.kind(), "Message handling failed: {}", e);
                }
            }

            if let Err(e) = actor.act(&mut ctx) {
                warn!(actor = %mailbox.id(), "Action failed: {}", e);
            }
        }

        let reports = self.collect_reports();
        let metrics = TickMetrics::collect(
            tick,
            &reports,
            &self.catalog,
            self.bus.get_stats().total_messages,
        );
        self.metrics.record(&metrics);
        for sink in &mut self.sinks {
            sink.record(&metrics);
        }

        if due(tick, self.config.event_interval) {
            self.roll_system_event();
        }
        if due(tick, self.config.health_interval) {
            self.check_status(&reports);
        }
        if due(tick, self.config.status_interval) {
            log_status(&metrics, &reports);
        }
        if self.config.max_ticks > 0 && tick >= self.config.max_ticks && self.running {
            info!("Reached maximum ticks ({}), stopping", self.config.max_ticks);
            self.running = false;
        }

        self.bus.check_health()?;
        Ok(metrics)
    }

    /// Steps until `ticks` have run or the world stops. Returns the number
    /// of ticks run.
    pub fn run(&mut self, ticks: u64) -> Result<u64, SimError> {
        let mut ran = 0;
        while ran < ticks && self.running {
            self.step()?;
            ran += 1;
        }
        Ok(ran)
    }

    /// Applies a store-wide event to every registered actor now.
    pub fn trigger_event(&mut self, event: SystemEvent) {
        info!("System event: {}", event.description());
        for slot in &mut self.slots {
            slot.actor.apply_event(event);
        }
    }

    /// Cleans up every actor's mailbox and stops the bus.
    pub fn shutdown(&mut self) -> Result<(), SimError> {
        self.running = false;
        for slot in &mut self.slots {
            slot.mailbox.cleanup();
        }
        self.bus.stop()?;
        info!(ticks = self.context.tick(), "Simulation shut down");
        Ok(())
    }

    fn collect_reports(&self) -> Vec<ActorReport> {
        self.slots
            .iter()
            .map(|s| s.actor.report(&self.catalog))
            .collect()
    }

    fn roll_system_event(&mut self) {
        if let Some(event) = SystemEvent::roll(self.context.rng(), self.config.event_probability) {
            self.trigger_event(event);
        }
    }

    /// Warns when the market is running dry.
    fn check_status(&self, reports: &[ActorReport]) {
        let solvent_customers = reports
            .iter()
            .filter(|r| matches!(r, ActorReport::Customer(c) if c.is_active()))
            .count();
        let stocked_products = reports
            .iter()
            .filter(|r| matches!(r, ActorReport::Product(p) if p.stock > 0))
            .count();

        if solvent_customers < 2 {
            warn!(solvent_customers, "Most customers have run out of budget");
        }
        if stocked_products < 2 {
            warn!(stocked_products, "Most books are out of stock");
        }
    }
}

fn log_status(metrics: &TickMetrics, reports: &[ActorReport]) {
    let best_seller = reports
        .iter()
        .filter_map(|r| match r {
            ActorReport::Product(p) if p.sales_count > 0 => Some(p),
            _ => None,
        })
        .max_by_key(|p| p.sales_count);

    info!(
        "Tick {}: sales ${:.2}, {} books sold, satisfaction {:.2}, {} messages",
        metrics.tick,
        metrics.total_sales,
        metrics.books_sold,
        metrics.avg_satisfaction,
        metrics.message_count
    );
    if let Some(best) = best_seller {
        info!("Best seller: '{}' ({} sold)", best.title, best.sales_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_bus::{AlertType, Message, SystemAlert};
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Never sends anything.
    struct Quiet;

    impl Actor for Quiet {
        fn handle_message(&mut self, _: &Message, _: &mut ActorContext<'_>) -> Result<(), SimError> {
            Ok(())
        }

        fn act(&mut self, _: &mut ActorContext<'_>) -> Result<(), SimError> {
            Ok(())
        }

        fn report(&self, _: &Catalog) -> ActorReport {
            ActorReport::Other
        }
    }

    /// Broadcasts once on its first tick and counts what it receives.
    struct Chatty {
        sent: bool,
        received: Arc<AtomicUsize>,
    }

    impl Actor for Chatty {
        fn handle_message(&mut self, _: &Message, _: &mut ActorContext<'_>) -> Result<(), SimError> {
            self.received.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn act(&mut self, ctx: &mut ActorContext<'_>) -> Result<(), SimError> {
            if !self.sent {
                self.sent = true;
                ctx.broadcast(SystemAlert::new(AlertType::Promotion, "hello"));
            }
            Ok(())
        }

        fn report(&self, _: &Catalog) -> ActorReport {
            ActorReport::Other
        }
    }

    fn id(s: &str) -> ActorId {
        ActorId::new(s).unwrap()
    }

    fn test_world(drain_wait: Duration) -> SimWorld {
        let config = SimConfig {
            drain_wait,
            bus: BusConfig {
                poll_interval: Duration::from_millis(5),
                ..Default::default()
            },
            ..Default::default()
        };
        let bus = MessageBus::shared(config.bus.clone());
        SimWorld::new(config, bus, Catalog::with_sample_data())
    }

    #[test]
    fn test_quiet_ticks_produce_no_traffic() {
        let mut world = test_world(Duration::from_millis(1));
        world.bus().start().unwrap();
        for name in ["A", "B", "C"] {
            world.add_actor(id(name), Box::new(Quiet)).unwrap();
        }

        assert_eq!(world.run(50).unwrap(), 50);

        let stats = world.bus().get_stats();
        assert_eq!(stats.history_len, 0);
        assert_eq!(stats.total_messages, 0);
        assert_eq!(world.metrics().len(), 50);
        assert_eq!(world.tick_count(), 50);
        world.shutdown().unwrap();
    }

    #[test]
    fn test_duplicate_actor_rejected() {
        let mut world = test_world(Duration::ZERO);
        world.add_actor(id("A"), Box::new(Quiet)).unwrap();
        assert!(matches!(
            world.add_actor(id("A"), Box::new(Quiet)),
            Err(SimError::DuplicateActor(_))
        ));
        assert_eq!(world.actor_count(), 1);
    }

    #[test]
    fn test_activation_order_is_fair() {
        let mut world = test_world(Duration::ZERO);
        let names = ["A", "B", "C"];
        for name in names {
            world.add_actor(id(name), Box::new(Quiet)).unwrap();
        }

        let mut first: HashMap<ActorId, u32> = HashMap::new();
        for _ in 0..600 {
            world.step().unwrap();
            let order = world.last_activation_order();

            let mut sorted = order.to_vec();
            sorted.sort();
            assert_eq!(sorted, world.actor_ids());

            *first.entry(order[0].clone()).or_default() += 1;
        }

        for name in names {
            let count = first.get(&id(name)).copied().unwrap_or(0);
            assert!((120..=280).contains(&count), "{} ran first {} times", name, count);
        }
    }

    #[test]
    fn test_same_seed_same_order() {
        let orders = |seed: u64| {
            let mut world = test_world(Duration::ZERO);
            world.context = SimContext::new(seed);
            for name in ["A", "B", "C", "D"] {
                world.add_actor(id(name), Box::new(Quiet)).unwrap();
            }
            (0..10)
                .map(|_| {
                    world.step().unwrap();
                    world.last_activation_order().to_vec()
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(orders(7), orders(7));
    }

    #[test]
    fn test_broadcast_between_actors() {
        let mut world = test_world(Duration::from_millis(200));
        world.bus().start().unwrap();

        let received_a = Arc::new(AtomicUsize::new(0));
        let received_b = Arc::new(AtomicUsize::new(0));
        world
            .add_actor(id("A"), Box::new(Chatty { sent: false, received: received_a.clone() }))
            .unwrap();
        world
            .add_actor(id("B"), Box::new(Chatty { sent: true, received: received_b.clone() }))
            .unwrap();

        world.step().unwrap();
        world.step().unwrap();
        world.step().unwrap();

        assert_eq!(received_a.load(Ordering::SeqCst), 0);
        assert_eq!(received_b.load(Ordering::SeqCst), 1);
        world.shutdown().unwrap();
    }

    #[test]
    fn test_remove_actor_cleans_up() {
        let mut world = test_world(Duration::ZERO);
        world.add_actor(id("A"), Box::new(Quiet)).unwrap();
        world.add_actor(id("B"), Box::new(Quiet)).unwrap();

        assert!(world.remove_actor(&id("A")).is_some());
        assert!(world.remove_actor(&id("A")).is_none());
        assert_eq!(world.bus().handler_count(&id("A")), 0);
        assert_eq!(world.actor_ids(), vec![id("B")]);
    }

    #[test]
    fn test_stops_at_max_ticks() {
        let mut world = test_world(Duration::ZERO);
        world.config.max_ticks = 5;
        world.add_actor(id("A"), Box::new(Quiet)).unwrap();

        assert_eq!(world.run(100).unwrap(), 5);
        assert!(!world.is_running());
    }

    #[test]
    fn test_extra_sink_receives_metrics() {
        struct Counter(Arc<AtomicUsize>);
        impl MetricsSink for Counter {
            fn record(&mut self, _: &TickMetrics) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut world = test_world(Duration::ZERO);
        let count = Arc::new(AtomicUsize::new(0));
        world.add_sink(Box::new(Counter(count.clone())));
        world.run(3).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(world.metrics().latest().unwrap().tick, 3);
    }

    #[test]
    fn test_trigger_event_reaches_every_actor() {
        struct EventLog(Arc<AtomicUsize>);
        impl Actor for EventLog {
            fn handle_message(&mut self, _: &Message, _: &mut ActorContext<'_>) -> Result<(), SimError> {
                Ok(())
            }

            fn act(&mut self, _: &mut ActorContext<'_>) -> Result<(), SimError> {
                Ok(())
            }

            fn apply_event(&mut self, event: SystemEvent) {
                if event == SystemEvent::Maintenance {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }

            fn report(&self, _: &Catalog) -> ActorReport {
                ActorReport::Other
            }
        }

        let mut world = test_world(Duration::ZERO);
        let applied = Arc::new(AtomicUsize::new(0));
        for name in ["A", "B", "C"] {
            world.add_actor(id(name), Box::new(EventLog(applied.clone()))).unwrap();
        }

        world.trigger_event("maintenance".parse().unwrap());
        assert_eq!(applied.load(Ordering::SeqCst), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_activation_is_permutation(seed in any::<u64>(), n in 1usize..8) {
            let mut world = test_world(Duration::ZERO);
            world.context = SimContext::new(seed);
            for i in 0..n {
                world.add_actor(id(&format!("actor_{}", i)), Box::new(Quiet)).unwrap();
            }

            for _ in 0..3 {
                world.step().unwrap();
                let mut order = world.last_activation_order().to_vec();
                order.sort();
                let mut expected = world.actor_ids();
                expected.sort();
                prop_assert_eq!(order, expected);
            }
        }
    }
}
