//! Central message router with a background dispatcher thread.
//!
//! # Locking
//!
//! Registry, history and counters share one `parking_lot::Mutex`. The
//! outbound queue is a crossbeam channel outside that lock, so `enqueue`
//! never contends with dispatch. Handlers are invoked from a snapshot
//! taken under the lock and called after it is released, which lets a
//! handler call back into the bus.
//!
//! # Lifecycle
//!
//! ```text
//!   new() ──► Stopped ──start()──► Running ──stop()──► Stopped
//!                ▲                    │
//!                └── enqueue() buffers until the next start()
//! ```

use crate::error::BusError;
use crate::handler::{Deliver, SubscriptionId};
use crate::history::{DeliveryRecord, History, HistoryQuery, DEFAULT_HISTORY_CAPACITY};
use crate::message::Message;
use crate::types::{ActorId, MessageKind};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Configuration for a [`MessageBus`].
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Maximum delivery records kept in history
    pub history_capacity: usize,

    /// How long the dispatcher waits on an empty queue before re-checking
    /// the stop flag
    pub poll_interval: Duration,

    /// Upper bound on how long `stop()` waits for the dispatcher to exit
    pub stop_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            poll_interval: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(1),
        }
    }
}

/// Point-in-time snapshot of bus activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusStats {
    /// Messages dispatched since the bus was created
    pub total_messages: u64,

    /// Number of actor ids with at least one handler
    pub subscribers: usize,

    /// Number of handlers across all ids
    pub handlers: usize,

    /// Messages dispatched per kind
    pub message_kinds: BTreeMap<MessageKind, u64>,

    /// Registered actor ids, sorted
    pub active_actors: Vec<ActorId>,

    /// Records currently retained in history
    pub history_len: usize,

    /// Successful handler invocations
    pub deliveries: u64,

    /// Handler invocations that returned an error or panicked
    pub delivery_failures: u64,

    /// Messages discarded from the outbound queue by `stop()`
    pub dropped_on_stop: u64,

    pub running: bool,
}

struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn Deliver>,
}

#[derive(Default)]
struct Counters {
    total: u64,
    by_kind: BTreeMap<MessageKind, u64>,
    deliveries: u64,
    failures: u64,
    dropped_on_stop: u64,
}

struct BusState {
    registry: BTreeMap<ActorId, Vec<Subscription>>,
    history: History,
    counters: Counters,
}

impl BusState {
    /// Selects handlers for a message: all handlers of the recipient, or
    /// for a broadcast every handler of every id except the sender's.
    fn targets_for(&self, message: &Message) -> Vec<(ActorId, Arc<dyn Deliver>)> {
        match message.recipient() {
            Some(recipient) => self
                .registry
                .get(recipient)
                .map(|subs| {
                    subs.iter()
                        .map(|sub| (recipient.clone(), Arc::clone(&sub.handler)))
                        .collect()
                })
                .unwrap_or_default(),
            None => self
                .registry
                .iter()
                .filter(|(id, _)| *id != message.sender())
                .flat_map(|(id, subs)| {
                    subs.iter().map(move |sub| (id.clone(), Arc::clone(&sub.handler)))
                })
                .collect(),
        }
    }
}

/// State shared between the bus handle and its dispatcher thread.
struct Shared {
    config: BusConfig,
    state: Mutex<BusState>,
    running: AtomicBool,
    next_subscription: AtomicU64,
}

impl Shared {
    fn dispatch(&self, message: Message) {
        let message = Arc::new(message);

        let targets = {
            let mut state = self.state.lock();
            let targets = state.targets_for(&message);
            state.history.push(DeliveryRecord {
                message: Arc::clone(&message),
                recipients: targets.len(),
            });
            state.counters.total += 1;
            *state.counters.by_kind.entry(message.kind()).or_insert(0) += 1;
            targets
        };

        debug!(
            kind = %message.kind(),
            sender = %message.sender(),
            recipients = targets.len(),
            "Dispatching message"
        );

        if targets.is_empty() {
            return;
        }

        let mut delivered = 0u64;
        let mut failed = 0u64;

        for (actor_id, handler) in &targets {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.deliver(Arc::clone(&message))
            }));

            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(actor = %actor_id, kind = %message.kind(), "Error delivering message: {}", e);
                }
                Err(_) => {
                    failed += 1;
                    warn!(actor = %actor_id, kind = %message.kind(), "Handler panicked during delivery");
                }
            }
        }

        let mut state = self.state.lock();
        state.counters.deliveries += delivered;
        state.counters.failures += failed;
    }

    fn record_dropped(&self, dropped: u64) {
        if dropped > 0 {
            let mut state = self.state.lock();
            state.counters.dropped_on_stop += dropped;
        }
    }
}

/// One spawned dispatcher thread and the flag that keeps it alive.
///
/// Every `start()` creates a fresh flag, so a dispatcher that `stop()` gave
/// up on never resumes after a later restart.
struct Dispatcher {
    handle: JoinHandle<()>,
    keep_running: Arc<AtomicBool>,
}

impl Dispatcher {
    fn signal_stop(&self) {
        self.keep_running.store(false, Ordering::Release);
    }

    fn is_current_thread(&self) -> bool {
        self.handle.thread().id() == thread::current().id()
    }

    /// Waits up to `timeout` for the thread to exit, then joins it.
    fn join(self, timeout: Duration) -> Result<(), BusError> {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("Dispatcher did not stop within {:?}, detaching", timeout);
                return Err(BusError::StopTimeout(timeout.as_millis() as u64));
            }
            thread::sleep(Duration::from_millis(2));
        }

        self.handle.join().map_err(|_| {
            error!("Dispatcher thread panicked");
            BusError::DispatcherPanicked
        })
    }
}

fn dispatch_loop(shared: &Shared, outbound: &Receiver<Message>, keep_running: &AtomicBool) {
    debug!("Dispatcher loop started");

    while keep_running.load(Ordering::Acquire) {
        match outbound.recv_timeout(shared.config.poll_interval) {
            // A message taken after the stop signal counts as discarded
            Ok(_) if !keep_running.load(Ordering::Acquire) => {
                shared.record_dropped(1);
                break;
            }
            Ok(message) => shared.dispatch(message),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Outbound queue disconnected, dispatcher exiting");
                break;
            }
        }
    }

    debug!("Dispatcher loop exited");
}

/// Thread-safe router between actors.
///
/// The bus is schema-agnostic: it routes on `recipient_id` and
/// `sender_id` only and never inspects payloads. Construct one per
/// simulation and share it as `Arc<MessageBus>`.
///
/// # Example
///
/// ```
/// use agora_bus::{ActorId, Mailbox, MessageBus, PurchaseRequest};
/// use std::time::Duration;
///
/// let bus = MessageBus::shared(Default::default());
/// bus.start().unwrap();
///
/// let a = Mailbox::register(bus.clone(), ActorId::new("A").unwrap());
/// let b = Mailbox::register(bus.clone(), ActorId::new("B").unwrap());
///
/// a.send_to(b.id().clone(), PurchaseRequest { isbn: "X".into(), quantity: 1 });
/// let batch = b.drain(Duration::from_secs(1));
/// assert_eq!(batch.len(), 1);
///
/// bus.stop().unwrap();
/// ```
pub struct MessageBus {
    shared: Arc<Shared>,

    outbound_tx: Sender<Message>,

    outbound_rx: Receiver<Message>,

    /// Current dispatcher; `Some` while started
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl MessageBus {
    /// Creates a stopped bus.
    pub fn new(config: BusConfig) -> Self {
        let (outbound_tx, outbound_rx) = channel::unbounded();
        let history = History::with_capacity(config.history_capacity);

        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(BusState {
                    registry: BTreeMap::new(),
                    history,
                    counters: Counters::default(),
                }),
                running: AtomicBool::new(false),
                next_subscription: AtomicU64::new(1),
            }),
            outbound_tx,
            outbound_rx,
            dispatcher: Mutex::new(None),
        }
    }

    /// Creates an Arc-wrapped bus for sharing with mailboxes.
    pub fn shared(config: BusConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    /// Launches the dispatcher thread. No-op if already running.
    ///
    /// Messages enqueued while stopped are dispatched once started.
    pub fn start(&self) -> Result<(), BusError> {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return Ok(());
        }

        let keep_running = Arc::new(AtomicBool::new(true));
        let shared = Arc::clone(&self.shared);
        let outbound = self.outbound_rx.clone();
        let flag = Arc::clone(&keep_running);
        let handle = thread::Builder::new()
            .name("agora-dispatcher".to_string())
            .spawn(move || dispatch_loop(&shared, &outbound, &flag))
            .map_err(BusError::Spawn)?;

        self.shared.running.store(true, Ordering::Release);
        *dispatcher = Some(Dispatcher {
            handle,
            keep_running,
        });
        info!("Message bus started");
        Ok(())
    }

    /// Signals the dispatcher to exit and waits up to `stop_timeout`.
    ///
    /// A delivery in progress completes first. Anything still queued is
    /// then discarded, on every path that stopped a dispatcher.
    ///
    /// Called from a handler, `stop()` cannot join its own thread: it
    /// signals the dispatcher, which exits once the handler returns. On
    /// `StopTimeout` the dispatcher is detached the same way and exits
    /// after its current delivery without taking another message.
    pub fn stop(&self) -> Result<(), BusError> {
        let dispatcher = {
            let mut slot = self.dispatcher.lock();
            self.shared.running.store(false, Ordering::Release);
            slot.take()
        };

        let Some(dispatcher) = dispatcher else {
            return Ok(());
        };
        dispatcher.signal_stop();

        let outcome = if dispatcher.is_current_thread() {
            debug!("stop() called from the dispatcher thread, not joining");
            Ok(())
        } else {
            dispatcher.join(self.shared.config.stop_timeout)
        };

        let dropped = self.discard_pending();
        info!(dropped, "Message bus stopped");
        outcome
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Reports a dispatcher that died while the bus is still marked running.
    pub fn check_health(&self) -> Result<(), BusError> {
        let dispatcher = self.dispatcher.lock();
        match dispatcher.as_ref() {
            Some(current) if current.handle.is_finished() && self.is_running() => {
                error!("Dispatcher thread exited unexpectedly");
                Err(BusError::DispatcherExited)
            }
            _ => Ok(()),
        }
    }

    /// Registers a handler for `actor_id`. Handlers of one id are invoked
    /// in registration order.
    pub fn subscribe(&self, actor_id: ActorId, handler: Arc<dyn Deliver>) -> SubscriptionId {
        let id = SubscriptionId::new(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));

        let mut state = self.shared.state.lock();
        debug!(actor = %actor_id, subscription = %id, "Actor subscribed to message bus");
        state
            .registry
            .entry(actor_id)
            .or_default()
            .push(Subscription { id, handler });

        id
    }

    /// Removes one handler, or every handler of the id when `subscription`
    /// is `None`. Returns the number removed.
    pub fn unsubscribe(&self, actor_id: &ActorId, subscription: Option<SubscriptionId>) -> usize {
        let mut state = self.shared.state.lock();

        let removed = match subscription {
            None => state.registry.remove(actor_id).map_or(0, |subs| subs.len()),
            Some(target) => {
                let Some(subs) = state.registry.get_mut(actor_id) else {
                    return 0;
                };
                let before = subs.len();
                subs.retain(|sub| sub.id != target);
                let removed = before - subs.len();
                if subs.is_empty() {
                    state.registry.remove(actor_id);
                }
                removed
            }
        };

        debug!(actor = %actor_id, removed, "Actor unsubscribed from message bus");
        removed
    }

    /// Queues a message for dispatch. Never blocks.
    pub fn enqueue(&self, message: Message) {
        // The bus owns a receiver, so the channel cannot be disconnected here.
        if let Err(err) = self.outbound_tx.send(message) {
            warn!(sender = %err.0.sender(), "Outbound queue closed, dropping message");
        }
    }

    /// Messages waiting in the outbound queue.
    pub fn pending(&self) -> usize {
        self.outbound_rx.len()
    }

    /// Handlers currently registered for `actor_id`.
    pub fn handler_count(&self, actor_id: &ActorId) -> usize {
        let state = self.shared.state.lock();
        state.registry.get(actor_id).map_or(0, Vec::len)
    }

    /// Returns a snapshot of matching history, most recent first.
    pub fn get_history(&self, query: &HistoryQuery) -> Vec<DeliveryRecord> {
        let state = self.shared.state.lock();
        state.history.query(query)
    }

    pub fn get_stats(&self) -> BusStats {
        let state = self.shared.state.lock();

        BusStats {
            total_messages: state.counters.total,
            subscribers: state.registry.len(),
            handlers: state.registry.values().map(Vec::len).sum(),
            message_kinds: state.counters.by_kind.clone(),
            active_actors: state.registry.keys().cloned().collect(),
            history_len: state.history.len(),
            deliveries: state.counters.deliveries,
            delivery_failures: state.counters.failures,
            dropped_on_stop: state.counters.dropped_on_stop,
            running: self.is_running(),
        }
    }

    fn discard_pending(&self) -> u64 {
        let dropped = self.outbound_rx.try_iter().count() as u64;
        self.shared.record_dropped(dropped);
        dropped
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl Drop for MessageBus {
    fn drop(&mut self) {
        // The dispatcher holds its own receiver; the flag lets it exit on
        // the next poll instead of waiting for disconnection.
        self.shared.running.store(false, Ordering::Release);
        if let Some(dispatcher) = self.dispatcher.get_mut().take() {
            dispatcher.signal_stop();
        }
    }
}
