//! # DeferredEventBus — Queued Per-Tick Dispatch
//!
//! [`DeferredEventBus::publish`] never calls a handler. It appends the event to
//! a FIFO queue dedicated to the event's type and returns. Once per simulation
//! step the host calls [`tick`](DeferredEventBus::tick), which drains every
//! queue.
//!
//! ## Queue Storage
//!
//! ```text
//! queues: Vec<Rc<dyn PendingQueue>>      drain order = first-publish order
//!           │
//!           └─► TypedQueue<T> { items: RefCell<VecDeque<T>> }
//! index:  HashMap<TypeId, usize>         event type → slot in `queues`
//! ```
//!
//! One concrete queue exists per event type, created the first time that type
//! is published. Events are stored by value, never boxed individually.
//!
//! ## Draining
//!
//! - Types are drained one at a time, in the order they were first published.
//! - A type's queue is drained until empty. If a handler publishes another
//!   event of the type being drained, it lands at the back of the live queue
//!   and is delivered during the same `tick` (breadth-first).
//! - A handler that publishes a type whose queue was already drained this tick
//!   (or a brand new type) sees that event delivered next tick.
//! - Events with no subscribers are dequeued and discarded.
//!
//! ## Failure Isolation
//!
//! Every handler call is wrapped on its own. A handler that returns an error
//! *or panics* is logged with the event type, and delivery continues with the
//! next handler and the next event.
//!
//! ## Comparison
//!
//! - **bevy_ecs** `Events<T>`: double-buffered per type, readers poll with a
//!   cursor. No callbacks.
//! - Here: callbacks, single buffer, and the drain chases events published
//!   during the drain instead of leaving them for next frame.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::subscribers::{Handler, Subscribers, SubscriptionId};
use crate::error::HandlerResult;

/// Outcome of one or more [`DeferredEventBus::tick`] calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Events dequeued (delivered or discarded for lack of subscribers).
    pub delivered: usize,
    /// Handler invocations that returned an error or panicked.
    pub failures: usize,
}

impl std::ops::AddAssign for TickReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.failures += other.failures;
    }
}

/// Type-erased view of one per-type queue.
trait PendingQueue {
    /// Drain the queue completely, invoking the bus's handlers for each event.
    fn drain(&self, subscribers: &Subscribers) -> TickReport;
    /// Drop pending events without invoking anything.
    fn clear(&self);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

struct TypedQueue<T> {
    items: RefCell<VecDeque<T>>,
}

impl<T: 'static> TypedQueue<T> {
    fn new() -> Self {
        Self {
            items: RefCell::new(VecDeque::new()),
        }
    }

    fn push(&self, event: T) {
        self.items.borrow_mut().push_back(event);
    }
}

impl<T: 'static> PendingQueue for TypedQueue<T> {
    fn drain(&self, subscribers: &Subscribers) -> TickReport {
        let mut report = TickReport::default();
        loop {
            // Release the queue borrow before handlers run; they may publish.
            let next = self.items.borrow_mut().pop_front();
            let Some(event) = next else { break };
            report.delivered += 1;

            let Some(handlers) = subscribers.snapshot::<T>() else {
                continue;
            };
            for (_, handler) in handlers.iter() {
                if !invoke_isolated(handler, &event) {
                    report.failures += 1;
                }
            }
        }
        report
    }

    fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Run one handler, logging instead of propagating errors and panics.
fn invoke_isolated<T: 'static>(handler: &Handler<T>, event: &T) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::error!(target: "troupe::bus", "Error processing event {}: {e}", type_name::<T>());
            false
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "<non-string panic payload>".to_string());
            log::error!(
                target: "troupe::bus",
                "Handler for event {} panicked: {message}",
                type_name::<T>()
            );
            false
        }
    }
}

/// Queued multicast event bus, drained once per tick.
pub struct DeferredEventBus {
    subscribers: Subscribers,
    queues: RefCell<Vec<Rc<dyn PendingQueue>>>,
    index: RefCell<HashMap<TypeId, usize>>,
}

impl DeferredEventBus {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create a bus with room for `capacity` event types in both the
    /// subscription map and the queue map.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Subscribers::with_capacity(capacity),
            queues: RefCell::new(Vec::with_capacity(capacity)),
            index: RefCell::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Subscribe a shared handler to events of type `T`.
    pub fn subscribe<T: 'static>(&self, handler: Handler<T>) -> SubscriptionId {
        self.subscribers.subscribe(handler)
    }

    /// Subscribe a closure to events of type `T`.
    pub fn on<T: 'static>(&self, f: impl Fn(&T) -> HandlerResult + 'static) -> SubscriptionId {
        self.subscribers.subscribe::<T>(Rc::new(f))
    }

    /// Remove a subscription. Returns `false` if it was not subscribed to `T`.
    pub fn unsubscribe<T: 'static>(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe::<T>(id)
    }

    /// Remove one registration of `handler`.
    pub fn unsubscribe_handler<T: 'static>(&self, handler: &Handler<T>) -> bool {
        self.subscribers.unsubscribe_handler(handler)
    }

    /// Number of handlers currently subscribed to `T`.
    pub fn subscriber_count<T: 'static>(&self) -> usize {
        self.subscribers.count::<T>()
    }

    /// Queue `event` for the next drain of its type.
    pub fn publish<T: 'static>(&self, event: T) {
        let queue = self.queue_for::<T>();
        let typed = queue
            .as_any()
            .downcast_ref::<TypedQueue<T>>()
            .expect("queue stored under the wrong TypeId");
        typed.push(event);
    }

    fn queue_for<T: 'static>(&self) -> Rc<dyn PendingQueue> {
        let type_id = TypeId::of::<T>();
        if let Some(&slot) = self.index.borrow().get(&type_id) {
            return self.queues.borrow()[slot].clone();
        }
        let queue: Rc<dyn PendingQueue> = Rc::new(TypedQueue::<T>::new());
        let mut queues = self.queues.borrow_mut();
        self.index.borrow_mut().insert(type_id, queues.len());
        queues.push(queue.clone());
        queue
    }

    /// Number of events waiting across all types.
    pub fn pending(&self) -> usize {
        self.queues.borrow().iter().map(|q| q.len()).sum()
    }

    /// Number of events of type `T` waiting.
    pub fn pending_of<T: 'static>(&self) -> usize {
        let slot = self.index.borrow().get(&TypeId::of::<T>()).copied();
        slot.map_or(0, |slot| self.queues.borrow()[slot].len())
    }

    /// Drain every non-empty queue. Call exactly once per simulation step.
    pub fn tick(&self) -> TickReport {
        // Snapshot so handlers can publish new types without a borrow conflict.
        let queues: Vec<Rc<dyn PendingQueue>> = self.queues.borrow().clone();
        let mut report = TickReport::default();
        for queue in &queues {
            if queue.len() > 0 {
                report += queue.drain(&self.subscribers);
            }
        }
        if report.delivered > 0 {
            log::trace!(
                target: "troupe::bus",
                "Deferred tick delivered {} events ({} handler failures)",
                report.delivered,
                report.failures
            );
        }
        report
    }

    /// Drop all pending events without invoking handlers, and all
    /// subscriptions.
    pub fn clear(&self) {
        self.subscribers.clear();
        let queues = std::mem::take(&mut *self.queues.borrow_mut());
        self.index.borrow_mut().clear();
        for queue in &queues {
            queue.clear();
        }
    }
}

impl Default for DeferredEventBus {
    fn default() -> Self {
        Self::new()
    }
}
