//! # Observable Values
//!
//! A named value that effect systems (UI bars, shaders, sound) bind to by
//! channel name. Unlike bus events, an observable has a *current* value:
//! subscribing immediately delivers it, and later updates only notify when
//! the value actually changes.
//!
//! ```ignore
//! let charge = Observable::new("battery", 1.0_f32);
//! let _guard = charge.subscribe(|level| println!("charge {level}"));   // prints 1
//! charge.set(0.5);                                                    // prints 0.5
//! charge.set(0.5);                                                    // nothing
//! ```
//!
//! Observers stay subscribed as long as their [`ObserverGuard`] lives.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Observer<T> = Rc<dyn Fn(&T)>;

struct Channel<T> {
    name: String,
    value: RefCell<T>,
    observers: RefCell<Vec<(u64, Observer<T>)>>,
    next_id: Cell<u64>,
}

trait Detach {
    fn detach(&self, id: u64);
}

impl<T> Detach for Channel<T> {
    fn detach(&self, id: u64) {
        self.observers.borrow_mut().retain(|(observer, _)| *observer != id);
    }
}

/// A named value that notifies observers when it changes.
pub struct Observable<T: Clone + PartialEq + 'static> {
    channel: Rc<Channel<T>>,
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            channel: Rc::new(Channel {
                name: name.into(),
                value: RefCell::new(initial),
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Channel name effect systems bind by.
    pub fn name(&self) -> &str {
        &self.channel.name
    }

    pub fn get(&self) -> T {
        self.channel.value.borrow().clone()
    }

    /// Store `value` and notify observers, unless it equals the current one.
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        if *self.channel.value.borrow() == value {
            return false;
        }
        self.set_silently(value);
        self.notify();
        true
    }

    /// Store `value` without notifying anyone.
    pub fn set_silently(&self, value: T) {
        *self.channel.value.borrow_mut() = value;
    }

    /// Push the current value to every observer, changed or not.
    pub fn notify(&self) {
        let value = self.get();
        let observers: Vec<Observer<T>> = self
            .channel
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(&value);
        }
    }

    /// Register `observer` and call it right away with the current value.
    #[must_use = "the observer is removed when the guard is dropped"]
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> ObserverGuard {
        let id = self.channel.next_id.get();
        self.channel.next_id.set(id + 1);
        let observer: Observer<T> = Rc::new(observer);
        self.channel
            .observers
            .borrow_mut()
            .push((id, observer.clone()));
        observer(&self.get());

        let channel: Rc<dyn Detach> = self.channel.clone();
        ObserverGuard {
            channel: Rc::downgrade(&channel),
            id,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.channel.observers.borrow().len()
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("name", &self.channel.name)
            .field("value", &*self.channel.value.borrow())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Keeps an observer subscribed. Dropping it unsubscribes.
pub struct ObserverGuard {
    channel: Weak<dyn Detach>,
    id: u64,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.upgrade() {
            channel.detach(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl Fn(&i32) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v: &i32| sink.borrow_mut().push(*v))
    }

    #[test]
    fn subscribe_pushes_current_value() {
        let health = Observable::new("health", 100);
        let (seen, observer) = recorder();
        let _guard = health.subscribe(observer);
        assert_eq!(*seen.borrow(), [100]);
        assert_eq!(health.name(), "health");
    }

    #[test]
    fn set_notifies_only_on_change() {
        let health = Observable::new("health", 100);
        let (seen, observer) = recorder();
        let _guard = health.subscribe(observer);

        assert!(health.set(80));
        assert!(!health.set(80));
        assert!(health.set(60));
        assert_eq!(*seen.borrow(), [100, 80, 60]);
    }

    #[test]
    fn silent_set_and_forced_notify() {
        let health = Observable::new("health", 100);
        let (seen, observer) = recorder();
        let _guard = health.subscribe(observer);

        health.set_silently(5);
        assert_eq!(health.get(), 5);
        assert_eq!(*seen.borrow(), [100]);

        health.notify();
        health.notify();
        assert_eq!(*seen.borrow(), [100, 5, 5]);
    }

    #[test]
    fn dropping_guard_unsubscribes() {
        let health = Observable::new("health", 1);
        let (seen, observer) = recorder();
        let guard = health.subscribe(observer);
        assert_eq!(health.observer_count(), 1);

        drop(guard);
        assert_eq!(health.observer_count(), 0);
        health.set(2);
        assert_eq!(*seen.borrow(), [1]);
    }

    #[test]
    fn guard_outliving_observable_is_harmless() {
        let (_seen, observer) = recorder();
        let guard = {
            let health = Observable::new("health", 1);
            health.subscribe(observer)
        };
        drop(guard);
    }

    #[test]
    fn observer_may_set_during_notify() {
        let level = Rc::new(Observable::new("level", 0));
        let weak = Rc::downgrade(&level);
        let _guard = level.subscribe(move |v: &i32| {
            if *v > 10 {
                if let Some(level) = weak.upgrade() {
                    level.set(10);
                }
            }
        });

        level.set(15);
        assert_eq!(level.get(), 10);
    }
}
