//! # Actor — Composition Root and Ownership Chain
//!
//! An [`Actor`] owns one [`EventBus`], one [`CapabilityRegistry`] and the
//! components attached to it. It may also point at a single direct **owner**,
//! another actor, forming a chain:
//!
//! ```text
//! player ──owns──▶ vehicle ──owns──▶ turret
//!   (root)            │                  │
//!                     │ relay on          │ relay on
//!                     ▼ player's bus      ▼ vehicle's bus
//!              AnyOwnerChanged      AnyOwnerChanged
//! ```
//!
//! ## Ownership state machine
//!
//! ```text
//!            set_owner(x)                 set_owner(y)
//! Unowned ─────────────────▶ Owned(x) ─────────────────▶ Owned(y)
//!    ▲                          │
//!    └──────── remove_owner ────┘      remove_owner on Unowned: no-op
//! ```
//!
//! Every transition runs the same rewiring, in this order:
//!
//! 1. publish [`OwnerChanged`] on this actor's bus,
//! 2. unsubscribe this actor's relay from the previous owner's bus,
//! 3. subscribe the relay to the new owner's [`AnyOwnerChanged`],
//! 4. publish [`AnyOwnerChanged`], then exactly one of [`Owned`] or
//!    [`Unowned`], on this actor's bus.
//!
//! Step 4 on the owner triggers the relays of every actor beneath it, so a
//! change anywhere in a chain reaches every descendant. A descendant whose
//! listeners fail is logged and skipped; its siblings still hear the change.
//!
//! Propagation recurses once per chain level, so chains are expected to be a
//! few levels deep (player, vehicle, turret), not thousands.
//!
//! ## Liveness
//!
//! Owners are held as `Weak<Actor>` and an actor stays allocated while any
//! `Rc` to it exists. "Alive" means *not destroyed*: once
//! [`Stage::destroy`](crate::stage::Stage::destroy) runs, the actor reports
//! `is_alive() == false` and stops counting as anybody's owner.
//!
//! Cycles are not rejected here. Callers that can create them check
//! [`Actor::is_owned_by`] first.

mod authority;
pub mod events;
mod id;

use std::cell::{Cell, Ref, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

pub use authority::{LocalAuthority, OwnershipAuthority, SharedAuthority};
pub use events::{AnyOwnerChanged, Owned, OwnerChanged, Unowned, WantsToGiveBackOwnership};
pub use id::ActorId;
pub(crate) use id::ActorAllocator;

use crate::bus::{EventBus, SubscriptionId};
use crate::capability::{CapabilityRegistry, Registration};
use crate::component::Component;
use crate::error::{AuthorityAction, RuntimeError};
use crate::math::Transform;

/// Where an actor sits in the ownership state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipState {
    Unowned,
    Owned(ActorId),
}

/// The subscription an actor keeps on its owner's bus.
struct Relay {
    owner: Weak<Actor>,
    subscription: SubscriptionId,
}

/// A composition root: components, a bus, a registry and an owner link.
pub struct Actor {
    id: ActorId,
    uuid: RefCell<String>,
    bus: EventBus,
    registry: RefCell<CapabilityRegistry>,
    components: RefCell<Vec<Rc<dyn Component>>>,
    owner: RefCell<Option<Weak<Actor>>>,
    relay: RefCell<Option<Relay>>,
    authority: Rc<dyn OwnershipAuthority>,
    transform: Cell<Transform>,
    self_ref: Weak<Actor>,
    alive: Cell<bool>,
}

impl Actor {
    pub(crate) fn new(
        id: ActorId,
        uuid: String,
        capacity: usize,
        authority: Rc<dyn OwnershipAuthority>,
        transform: Transform,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            id,
            uuid: RefCell::new(uuid),
            bus: EventBus::with_capacity(capacity),
            registry: RefCell::new(CapabilityRegistry::with_capacity(capacity)),
            components: RefCell::new(Vec::new()),
            owner: RefCell::new(None),
            relay: RefCell::new(None),
            authority,
            transform: Cell::new(transform),
            self_ref: self_ref.clone(),
            alive: Cell::new(true),
        })
    }

    /// Bind, register and start `parts`, in that order.
    pub(crate) fn assemble(self: &Rc<Self>, parts: Vec<(Rc<dyn Component>, Registration)>) {
        let mut seen = HashSet::new();
        let (components, registrations): (Vec<_>, Vec<_>) = parts
            .into_iter()
            .filter(|(component, registration)| {
                let fresh = seen.insert(Rc::as_ptr(component) as *const () as usize);
                if !fresh {
                    log::warn!(
                        target: "troupe::actor",
                        "Component `{}` added twice to actor `{}`; keeping the first",
                        registration.type_name(),
                        self.uuid()
                    );
                }
                fresh
            })
            .unzip();

        self.components.borrow_mut().clone_from(&components);
        for component in &components {
            component.attach(self);
        }
        let registered = self.registry.borrow_mut().register(registrations);
        log::debug!(
            target: "troupe::actor",
            "Actor `{}` ({}) registered {registered} components, {} capabilities",
            self.uuid(),
            self.id,
            self.registry.borrow().capability_count()
        );
        for component in &components {
            component.start(self);
        }
    }

    // ── Identity ──────────────────────────────────────────────────────

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn uuid(&self) -> String {
        self.uuid.borrow().clone()
    }

    /// Replace the uuid if the authority allows it. Best done right after
    /// spawning, before anything has looked the actor up by uuid.
    pub fn try_change_uuid(&self, uuid: impl Into<String>) -> Result<(), RuntimeError> {
        self.ensure_alive()?;
        self.ensure_permitted(AuthorityAction::ChangeUuid)?;
        let uuid = uuid.into();
        log::debug!(target: "troupe::actor", "Actor {} uuid `{}` -> `{uuid}`", self.id, self.uuid());
        *self.uuid.borrow_mut() = uuid;
        Ok(())
    }

    /// Two actors identify the same thing when their uuids match.
    pub fn same_identity(&self, other: &Actor) -> bool {
        *self.uuid.borrow() == *other.uuid.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    // ── Parts ─────────────────────────────────────────────────────────

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn registry(&self) -> Ref<'_, CapabilityRegistry> {
        self.registry.borrow()
    }

    /// Shorthand for `registry().resolve::<C>()`.
    pub fn resolve<C: ?Sized + 'static>(&self) -> Option<Rc<C>> {
        self.registry.borrow().resolve::<C>()
    }

    pub fn component_count(&self) -> usize {
        self.components.borrow().len()
    }

    pub fn transform(&self) -> Transform {
        self.transform.get()
    }

    pub fn set_transform(&self, transform: Transform) {
        self.transform.set(transform);
    }

    // ── Ownership ─────────────────────────────────────────────────────

    /// The direct owner, if set and not destroyed.
    pub fn owner(&self) -> Option<Rc<Actor>> {
        self.owner
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|owner| owner.is_alive())
    }

    pub fn ownership_state(&self) -> OwnershipState {
        match self.owner() {
            Some(owner) => OwnershipState::Owned(owner.id),
            None => OwnershipState::Unowned,
        }
    }

    /// Make `new_owner` this actor's direct owner.
    ///
    /// Fails with [`RuntimeError::NotPermitted`] without touching any state
    /// when the authority refuses. Setting the current owner again still
    /// runs the full rewiring.
    pub fn set_owner(&self, new_owner: &Rc<Actor>) -> Result<(), RuntimeError> {
        self.ensure_alive()?;
        self.ensure_permitted(AuthorityAction::SetOwner)?;
        if !new_owner.is_alive() {
            return Err(RuntimeError::StaleActor(new_owner.id));
        }

        let previous = self.owner();
        *self.owner.borrow_mut() = Some(Rc::downgrade(new_owner));
        log::debug!(
            target: "troupe::actor",
            "Actor `{}` now owned by `{}`",
            self.uuid(),
            new_owner.uuid()
        );
        self.on_owner_did_change(previous.as_ref(), Some(new_owner))
    }

    /// Drop the direct owner. A no-op, with no events, when there is none.
    ///
    /// An owner that has been destroyed already counts as none: the stale
    /// link is cleared silently.
    pub fn remove_owner(&self) -> Result<(), RuntimeError> {
        self.ensure_alive()?;
        self.ensure_permitted(AuthorityAction::RemoveOwner)?;
        let Some(previous) = self.owner() else {
            self.owner.borrow_mut().take();
            self.detach_relay();
            return Ok(());
        };

        self.owner.borrow_mut().take();
        log::debug!(target: "troupe::actor", "Actor `{}` is now unowned", self.uuid());
        self.on_owner_did_change(Some(&previous), None)
    }

    /// Ask a listener (usually [`PossessionTransfer`](crate::possession::PossessionTransfer))
    /// to hand ownership back to whoever held it before.
    pub fn give_back_ownership(&self) -> Result<(), RuntimeError> {
        if self.bus.subscriber_count::<WantsToGiveBackOwnership>() == 0 {
            log::debug!(
                target: "troupe::actor",
                "Actor `{}` wants to give back ownership but nobody is listening",
                self.uuid()
            );
        }
        self.bus.publish(WantsToGiveBackOwnership { actor: self.id })
    }

    /// `true` when `other` appears anywhere above this actor in its chain.
    pub fn is_owned_by(&self, other: &Actor) -> bool {
        self.owner_chain().iter().any(|owner| owner.id == other.id)
    }

    /// Owners from the direct one up to the root. Stops early if the chain
    /// loops back on itself.
    pub fn owner_chain(&self) -> Vec<Rc<Actor>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([self.id]);
        let mut cursor = self.owner();
        while let Some(owner) = cursor {
            if !visited.insert(owner.id) {
                break;
            }
            cursor = owner.owner();
            chain.push(owner);
        }
        chain
    }

    fn on_owner_did_change(
        &self,
        previous: Option<&Rc<Actor>>,
        next: Option<&Rc<Actor>>,
    ) -> Result<(), RuntimeError> {
        let notified = self.bus.publish(OwnerChanged {
            actor: self.id,
            previous: previous.map(|owner| owner.id),
            next: next.map(|owner| owner.id),
        });

        self.detach_relay();
        if let Some(next) = next.filter(|next| next.is_alive()) {
            self.attach_relay(next);
        }

        let propagated = self.propagate_owner_change(self.id);
        notified.and(propagated)
    }

    fn detach_relay(&self) {
        let Some(relay) = self.relay.borrow_mut().take() else {
            return;
        };
        if let Some(owner) = relay.owner.upgrade().filter(|owner| owner.is_alive()) {
            owner.bus.unsubscribe::<AnyOwnerChanged>(relay.subscription);
        }
    }

    fn attach_relay(&self, owner: &Rc<Actor>) {
        let child = self.self_ref.clone();
        // A failing descendant must not stop delivery to its siblings.
        let subscription = owner.bus.on(move |event: &AnyOwnerChanged| {
            let Some(child) = child.upgrade().filter(|child| child.is_alive()) else {
                return Ok(());
            };
            if let Err(err) = child.propagate_owner_change(event.origin) {
                log::error!(
                    target: "troupe::actor",
                    "Owner change from {} failed on `{}`: {err}",
                    event.origin,
                    child.uuid()
                );
            }
            Ok(())
        });
        *self.relay.borrow_mut() = Some(Relay {
            owner: Rc::downgrade(owner),
            subscription,
        });
    }

    fn propagate_owner_change(&self, origin: ActorId) -> Result<(), RuntimeError> {
        let any = self.bus.publish(AnyOwnerChanged {
            actor: self.id,
            origin,
        });
        let state = match self.owner() {
            Some(owner) => self.bus.publish(Owned {
                actor: self.id,
                owner: owner.id,
            }),
            None => self.bus.publish(Unowned { actor: self.id }),
        };
        any.and(state)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────

    /// Tear everything down. The actor already reports `is_alive() == false`
    /// while its components' `teardown` hooks run.
    pub(crate) fn destroy(&self) {
        if !self.alive.replace(false) {
            return;
        }
        let components = std::mem::take(&mut *self.components.borrow_mut());
        for component in components.iter().rev() {
            log::trace!(target: "troupe::actor", "Tearing down `{}`", component.type_name());
            component.teardown(self);
        }
        self.detach_relay();
        self.owner.borrow_mut().take();
        self.bus.clear();
        self.registry.borrow_mut().clear();
        log::debug!(target: "troupe::actor", "Actor `{}` ({}) destroyed", self.uuid(), self.id);
    }

    fn ensure_alive(&self) -> Result<(), RuntimeError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(RuntimeError::StaleActor(self.id))
        }
    }

    fn ensure_permitted(&self, action: AuthorityAction) -> Result<(), RuntimeError> {
        if self.authority.permits(self, action) {
            return Ok(());
        }
        log::warn!(
            target: "troupe::actor",
            "Not permitted to {action} on actor `{}` ({})",
            self.uuid(),
            self.id
        );
        Err(RuntimeError::NotPermitted {
            actor: self.uuid(),
            action,
        })
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("uuid", &*self.uuid.borrow())
            .field("owner", &self.owner().map(|owner| owner.id))
            .field("alive", &self.alive.get())
            .finish()
    }
}
