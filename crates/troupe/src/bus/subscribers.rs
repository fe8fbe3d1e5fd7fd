//! Type-indexed subscription storage shared by both bus variants.
//!
//! ## Layout
//!
//! ```text
//! map: HashMap<TypeId, Box<dyn Any>>
//!        │
//!        └─► Rc<Vec<(SubscriptionId, Handler<T>)>>   one list per event type
//! ```
//!
//! Each list is an immutable `Rc<Vec<_>>`. Publishing clones the `Rc` (no
//! allocation) and iterates the snapshot. Subscribing or unsubscribing while a
//! snapshot is alive goes through `Rc::make_mut`, which copies the list, so a
//! dispatch in progress never sees handlers added or removed during it.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::HandlerResult;

/// A shared event handler.
///
/// Handlers are `Fn`, not `FnMut`: they may be re-entered when a handler
/// publishes an event of its own type. Keep mutable state in a `Cell` or
/// `RefCell`.
pub type Handler<T> = Rc<dyn Fn(&T) -> HandlerResult>;

/// Identifies one subscription. Subscribing the same handler twice yields two
/// ids, and each has to be unsubscribed on its own.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription({})", self.0)
    }
}

type HandlerList<T> = Rc<Vec<(SubscriptionId, Handler<T>)>>;

pub(crate) struct Subscribers {
    next_id: Cell<u64>,
    map: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

impl Subscribers {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: Cell::new(0),
            map: RefCell::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn subscribe<T: 'static>(&self, handler: Handler<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let mut map = self.map.borrow_mut();
        let list = map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HandlerList::<T>::default()))
            .downcast_mut::<HandlerList<T>>()
            .expect("handler list stored under the wrong TypeId");
        Rc::make_mut(list).push((id, handler));
        id
    }

    /// Remove the subscription with this id. Returns `false` if it wasn't
    /// subscribed to `T`.
    pub fn unsubscribe<T: 'static>(&self, id: SubscriptionId) -> bool {
        self.remove_where::<T>(|(sub, _)| *sub == id)
    }

    /// Remove one registration of `handler` (the most recent one, if it was
    /// subscribed more than once).
    pub fn unsubscribe_handler<T: 'static>(&self, handler: &Handler<T>) -> bool {
        self.remove_where::<T>(|(_, h)| Rc::ptr_eq(h, handler))
    }

    fn remove_where<T: 'static>(
        &self,
        matches: impl Fn(&(SubscriptionId, Handler<T>)) -> bool,
    ) -> bool {
        let type_id = TypeId::of::<T>();
        let mut map = self.map.borrow_mut();
        let Some(list) = map
            .get_mut(&type_id)
            .and_then(|entry| entry.downcast_mut::<HandlerList<T>>())
        else {
            return false;
        };
        let Some(pos) = list.iter().rposition(|entry| matches(entry)) else {
            return false;
        };
        Rc::make_mut(list).remove(pos);
        if list.is_empty() {
            map.remove(&type_id);
        }
        true
    }

    /// The handlers currently registered for `T`, or `None` if there are none.
    pub fn snapshot<T: 'static>(&self) -> Option<HandlerList<T>> {
        self.map
            .borrow()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<HandlerList<T>>())
            .cloned()
    }

    pub fn count<T: 'static>(&self) -> usize {
        self.snapshot::<T>().map_or(0, |list| list.len())
    }

    pub fn clear(&self) {
        self.map.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler<u32> {
        Rc::new(|_: &u32| -> HandlerResult { Ok(()) })
    }

    #[test]
    fn ids_are_unique_per_subscription() {
        let subs = Subscribers::with_capacity(4);
        let handler = noop();
        let a = subs.subscribe(handler.clone());
        let b = subs.subscribe(handler);
        assert_ne!(a, b);
        assert_eq!(subs.count::<u32>(), 2);
    }

    #[test]
    fn removing_last_handler_frees_entry() {
        let subs = Subscribers::with_capacity(4);
        let id = subs.subscribe(noop());
        assert!(subs.unsubscribe::<u32>(id));
        assert!(subs.snapshot::<u32>().is_none());
        assert!(subs.map.borrow().is_empty());
    }

    #[test]
    fn unsubscribe_wrong_type_is_ignored() {
        let subs = Subscribers::with_capacity(4);
        let id = subs.subscribe(noop());
        assert!(!subs.unsubscribe::<i64>(id));
        assert_eq!(subs.count::<u32>(), 1);
    }

    #[test]
    fn unsubscribe_handler_removes_one_instance() {
        let subs = Subscribers::with_capacity(4);
        let handler = noop();
        subs.subscribe(handler.clone());
        subs.subscribe(handler.clone());
        assert!(subs.unsubscribe_handler(&handler));
        assert_eq!(subs.count::<u32>(), 1);
        assert!(subs.unsubscribe_handler(&handler));
        assert!(!subs.unsubscribe_handler(&handler));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes() {
        let subs = Subscribers::with_capacity(4);
        let first = subs.subscribe(noop());
        let snapshot = subs.snapshot::<u32>().unwrap();
        subs.subscribe(noop());
        subs.unsubscribe::<u32>(first);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, first);
        assert_eq!(subs.count::<u32>(), 1);
    }
}
