//! Who may change an actor's owner or identity.
//!
//! Every actor carries one [`OwnershipAuthority`]. The default,
//! [`LocalAuthority`], allows everything; a networked build swaps in an
//! authority that only allows changes on the simulating peer.

use std::cell::Cell;

use super::Actor;
use crate::error::AuthorityAction;

/// Gatekeeper consulted before `set_owner`, `remove_owner` and uuid changes.
pub trait OwnershipAuthority {
    fn permits(&self, actor: &Actor, action: AuthorityAction) -> bool;
}

/// Allows every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalAuthority;

impl OwnershipAuthority for LocalAuthority {
    fn permits(&self, _actor: &Actor, _action: AuthorityAction) -> bool {
        true
    }
}

/// Authority that can be granted or revoked at runtime, e.g. when a peer
/// gains or loses control of an actor.
#[derive(Debug)]
pub struct SharedAuthority {
    granted: Cell<bool>,
}

impl SharedAuthority {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: Cell::new(granted),
        }
    }

    pub fn grant(&self) {
        self.granted.set(true);
    }

    pub fn revoke(&self) {
        self.granted.set(false);
    }

    pub fn is_granted(&self) -> bool {
        self.granted.get()
    }
}

impl OwnershipAuthority for SharedAuthority {
    fn permits(&self, _actor: &Actor, _action: AuthorityAction) -> bool {
        self.granted.get()
    }
}

impl<F> OwnershipAuthority for F
where
    F: Fn(&Actor, AuthorityAction) -> bool,
{
    fn permits(&self, actor: &Actor, action: AuthorityAction) -> bool {
        self(actor, action)
    }
}
