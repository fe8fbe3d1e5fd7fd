//! # EventBus — Synchronous Type-Indexed Dispatch
//!
//! [`EventBus::publish`] calls every handler subscribed to the event's exact
//! type, in subscription order, before it returns. Every actor owns one.
//!
//! ## Re-entrancy
//!
//! The set of handlers is captured when `publish` starts. A handler may
//! subscribe, unsubscribe, or publish again on the same bus; none of that
//! changes which handlers the current call will still invoke.
//!
//! ## Failures
//!
//! The first handler that returns an error stops the publish. Remaining
//! handlers are skipped and the error is returned to the publisher as
//! [`RuntimeError::HandlerFailure`]. This is the opposite of the
//! [`DeferredEventBus`](super::DeferredEventBus), which isolates failures.

use std::any::type_name;
use std::rc::Rc;

use super::subscribers::{Handler, Subscribers, SubscriptionId};
use crate::error::{HandlerResult, RuntimeError};

/// Immediate multicast event bus.
pub struct EventBus {
    subscribers: Subscribers,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create a bus whose subscription map starts with room for `capacity`
    /// event types.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Subscribers::with_capacity(capacity),
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

    /// Invoke every handler of `T` with `event`. A no-op when nobody listens.
    pub fn publish<T: 'static>(&self, event: T) -> Result<(), RuntimeError> {
        let Some(handlers) = self.subscribers.snapshot::<T>() else {
            return Ok(());
        };
        for (_, handler) in handlers.iter() {
            handler(&event).map_err(|source| RuntimeError::HandlerFailure {
                event: type_name::<T>(),
                source,
            })?;
        }
        Ok(())
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.subscribers.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
