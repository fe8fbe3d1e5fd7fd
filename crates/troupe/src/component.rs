//! # Components — Behavior Units Attached to an Actor
//!
//! A component is any `'static` type implementing [`Component`]. The stage
//! drives every component through the same lifecycle:
//!
//! ```text
//! ActorBuilder::build()
//!   1. attach(actor)     for every component, in insertion order
//!   2. register          all components go into the actor's registry
//!   3. start(actor)      for every component, in insertion order
//!
//! Stage::destroy(id)
//!   4. teardown(actor)   for every component, in reverse order
//! ```
//!
//! `start` is the injection point: by then every component of the actor is
//! attached and registered, so [`DependencyInjector`](crate::inject::DependencyInjector)
//! can resolve anything the actor provides. Don't resolve in `attach`.
//!
//! Components keep a non-owning link back to their actor with [`ActorLink`].

use std::any::Any;
use std::cell::OnceCell;
use std::rc::{Rc, Weak};

use crate::actor::Actor;
use crate::capability::Capabilities;

/// A behavior unit attached to exactly one actor.
pub trait Component: Any {
    /// Called once, right after the component is bound to `actor`.
    fn attach(&self, _actor: &Rc<Actor>) {}

    /// Publish capabilities beyond the component's own concrete type.
    ///
    /// ```ignore
    /// fn expose(this: &Rc<Self>, caps: &mut Capabilities<'_>) {
    ///     caps.provide::<dyn Health>(this.clone());
    /// }
    /// ```
    fn expose(_this: &Rc<Self>, _caps: &mut Capabilities<'_>)
    where
        Self: Sized,
    {
    }

    /// Called once every component of the actor is attached and registered.
    fn start(&self, _actor: &Rc<Actor>) {}

    /// Called when the actor is destroyed. Unsubscribe everything subscribed
    /// in `start`.
    fn teardown(&self, _actor: &Actor) {}

    /// Type name used in log entries.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A component's non-owning back-reference to its actor. Set once.
#[derive(Default)]
pub struct ActorLink {
    actor: OnceCell<Weak<Actor>>,
}

impl ActorLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to `actor`. Returns `false` if the link was already bound.
    pub fn bind(&self, actor: &Rc<Actor>) -> bool {
        self.actor.set(Rc::downgrade(actor)).is_ok()
    }

    /// The actor, if bound and still alive.
    pub fn get(&self) -> Option<Rc<Actor>> {
        self.actor
            .get()
            .and_then(Weak::upgrade)
            .filter(|actor| actor.is_alive())
    }

    pub fn is_bound(&self) -> bool {
        self.actor.get().is_some()
    }
}
