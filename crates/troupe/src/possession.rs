//! # Possession Transfer
//!
//! Push/pop ownership for things a player can temporarily take over, like a
//! vehicle that is entered and later exited:
//!
//! ```text
//! garage ──owns──▶ car                    before
//! player ──owns──▶ car                    transfer_to(player), garage remembered
//! garage ──owns──▶ car                    car.give_back_ownership()
//! ```
//!
//! The component answers [`WantsToGiveBackOwnership`] on its actor's bus. It
//! is the only component that knows who owned the actor before the transfer,
//! so an actor may have at most one: only the first `PossessionTransfer`
//! registered on an actor responds, later ones stay inactive and log a warning.
//! Other listeners of the same event do not count.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::actor::{Actor, WantsToGiveBackOwnership};
use crate::bus::SubscriptionId;
use crate::component::{ActorLink, Component};
use crate::error::{HandlerResult, RuntimeError};

#[derive(Default)]
struct Remembered {
    previous: RefCell<Option<Weak<Actor>>>,
    interactor: RefCell<Option<Weak<Actor>>>,
}

/// Hands an actor to an interactor and back again.
#[derive(Default)]
pub struct PossessionTransfer {
    actor: ActorLink,
    remembered: Rc<Remembered>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl PossessionTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `interactor` the owner of this component's actor, remembering
    /// the current owner for [`restore`](Self::restore).
    ///
    /// Returns `Ok(false)` without changing anything when the interactor is
    /// destroyed, or when it is the actor itself or one of the actor's
    /// descendants.
    pub fn transfer_to(&self, interactor: &Rc<Actor>) -> Result<bool, RuntimeError> {
        let Some(actor) = self.actor.get() else {
            return Ok(false);
        };
        if !interactor.is_alive() {
            return Ok(false);
        }
        if Rc::ptr_eq(interactor, &actor) || interactor.is_owned_by(&actor) {
            log::warn!(
                target: "troupe::possession",
                "Refusing to give `{}` to `{}`: it would own itself",
                actor.uuid(),
                interactor.uuid()
            );
            return Ok(false);
        }

        let previous = actor.owner();
        actor.set_owner(interactor)?;
        *self.remembered.previous.borrow_mut() = previous.as_ref().map(Rc::downgrade);
        *self.remembered.interactor.borrow_mut() = Some(Rc::downgrade(interactor));
        Ok(true)
    }

    /// Hand the actor back to whoever owned it before the last transfer, or
    /// leave it unowned if that owner is gone.
    pub fn restore(&self) -> Result<(), RuntimeError> {
        match self.actor.get() {
            Some(actor) => restore(&actor, &self.remembered),
            None => Ok(()),
        }
    }

    /// The interactor of the last successful transfer, while it is alive.
    pub fn last_interactor(&self) -> Option<Rc<Actor>> {
        upgrade(&self.remembered.interactor.borrow())
    }

    /// `true` when this component answers give-back requests.
    pub fn is_responding(&self) -> bool {
        self.subscription.get().is_some()
    }
}

fn upgrade(slot: &Option<Weak<Actor>>) -> Option<Rc<Actor>> {
    slot.as_ref()
        .and_then(Weak::upgrade)
        .filter(|actor| actor.is_alive())
}

fn restore(actor: &Rc<Actor>, remembered: &Remembered) -> Result<(), RuntimeError> {
    let previous = upgrade(&remembered.previous.borrow_mut().take());
    remembered.interactor.borrow_mut().take();
    match previous {
        Some(previous) if !previous.is_owned_by(actor) => actor.set_owner(&previous),
        _ => actor.remove_owner(),
    }
}

impl Component for PossessionTransfer {
    fn attach(&self, actor: &Rc<Actor>) {
        self.actor.bind(actor);
    }

    fn start(&self, actor: &Rc<Actor>) {
        let first = actor.resolve::<PossessionTransfer>();
        if !first.is_some_and(|first| std::ptr::eq(Rc::as_ptr(&first), self)) {
            log::warn!(
                target: "troupe::possession",
                "Actor `{}` already has a give-back responder; this one stays inactive",
                actor.uuid()
            );
            return;
        }

        let weak = Rc::downgrade(actor);
        let remembered = self.remembered.clone();
        let id = actor
            .events()
            .on(move |_: &WantsToGiveBackOwnership| -> HandlerResult {
                if let Some(actor) = weak.upgrade().filter(|actor| actor.is_alive()) {
                    restore(&actor, &remembered)?;
                }
                Ok(())
            });
        self.subscription.set(Some(id));
    }

    fn teardown(&self, actor: &Actor) {
        if let Some(id) = self.subscription.take() {
            actor.events().unsubscribe::<WantsToGiveBackOwnership>(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{OwnershipState, SharedAuthority};
    use crate::stage::Stage;

    #[test]
    fn enter_and_exit_unowned_vehicle() {
        let stage = Stage::default();
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage.spawn("car").with_shared(transfer.clone()).build();
        let player = stage.spawn("player").build();

        assert!(transfer.transfer_to(&player).unwrap());
        assert_eq!(car.ownership_state(), OwnershipState::Owned(player.id()));
        assert!(Rc::ptr_eq(&transfer.last_interactor().unwrap(), &player));

        car.give_back_ownership().unwrap();
        assert_eq!(car.ownership_state(), OwnershipState::Unowned);
        assert!(transfer.last_interactor().is_none());
    }

    #[test]
    fn give_back_restores_previous_owner() {
        let stage = Stage::default();
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage.spawn("car").with_shared(transfer.clone()).build();
        let garage = stage.spawn("garage").build();
        let player = stage.spawn("player").build();
        car.set_owner(&garage).unwrap();

        transfer.transfer_to(&player).unwrap();
        assert_eq!(car.ownership_state(), OwnershipState::Owned(player.id()));

        car.give_back_ownership().unwrap();
        assert_eq!(car.ownership_state(), OwnershipState::Owned(garage.id()));
    }

    #[test]
    fn destroyed_previous_owner_leaves_unowned() {
        let stage = Stage::default();
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage.spawn("car").with_shared(transfer.clone()).build();
        let garage = stage.spawn("garage").build();
        let player = stage.spawn("player").build();
        car.set_owner(&garage).unwrap();
        transfer.transfer_to(&player).unwrap();

        stage.destroy(garage.id());
        transfer.restore().unwrap();
        assert_eq!(car.ownership_state(), OwnershipState::Unowned);
    }

    #[test]
    fn refuses_dead_interactor_and_cycles() {
        let stage = Stage::default();
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage.spawn("car").with_shared(transfer.clone()).build();
        let trailer = stage.spawn("trailer").build();
        trailer.set_owner(&car).unwrap();

        assert!(!transfer.transfer_to(&car).unwrap());
        assert!(!transfer.transfer_to(&trailer).unwrap());

        let ghost = stage.spawn("ghost").build();
        stage.destroy(ghost.id());
        assert!(!transfer.transfer_to(&ghost).unwrap());
        assert_eq!(car.ownership_state(), OwnershipState::Unowned);
    }

    #[test]
    fn refused_authority_keeps_memory_untouched() {
        let stage = Stage::default();
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage
            .spawn("car")
            .with_shared(transfer.clone())
            .authority(Rc::new(SharedAuthority::new(false)))
            .build();
        let player = stage.spawn("player").build();

        assert!(matches!(
            transfer.transfer_to(&player),
            Err(RuntimeError::NotPermitted { .. })
        ));
        assert!(transfer.last_interactor().is_none());
        assert_eq!(car.ownership_state(), OwnershipState::Unowned);
    }

    #[test]
    fn second_responder_stays_inactive() {
        let stage = Stage::default();
        let first = Rc::new(PossessionTransfer::new());
        let second = Rc::new(PossessionTransfer::new());
        let car = stage
            .spawn("car")
            .with_shared(first.clone())
            .with_shared(second.clone())
            .build();

        assert!(first.is_responding());
        assert!(!second.is_responding());
        assert_eq!(car.events().subscriber_count::<WantsToGiveBackOwnership>(), 1);
    }

    #[test]
    fn unrelated_listener_does_not_silence_responder() {
        #[derive(Default)]
        struct Audit {
            requests: Rc<Cell<u32>>,
        }

        impl Component for Audit {
            fn start(&self, actor: &Rc<Actor>) {
                let requests = self.requests.clone();
                actor.events().on(move |_: &WantsToGiveBackOwnership| -> HandlerResult {
                    requests.set(requests.get() + 1);
                    Ok(())
                });
            }
        }

        let stage = Stage::default();
        let audit = Rc::new(Audit::default());
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage
            .spawn("car")
            .with_shared(audit.clone())
            .with_shared(transfer.clone())
            .build();
        let player = stage.spawn("player").build();
        assert!(transfer.is_responding());

        transfer.transfer_to(&player).unwrap();
        car.give_back_ownership().unwrap();
        assert_eq!(audit.requests.get(), 1);
        assert_eq!(car.ownership_state(), OwnershipState::Unowned);
    }

    #[test]
    fn teardown_unsubscribes() {
        let stage = Stage::default();
        let transfer = Rc::new(PossessionTransfer::new());
        let car = stage.spawn("car").with_shared(transfer.clone()).build();
        assert!(transfer.is_responding());

        stage.destroy(car.id());
        assert!(!transfer.is_responding());
        assert!(transfer.restore().is_ok());
    }
}
