//! Ownership notifications published on an actor's own [`EventBus`](crate::bus::EventBus).
//!
//! For a chain `A <- B <- C` (C owned by B, B owned by A), re-parenting B
//! publishes on B's bus:
//!
//! ```text
//! OwnerChanged { actor: B, previous, next }
//! AnyOwnerChanged { actor: B, origin: B }
//! Owned { actor: B, owner } | Unowned { actor: B }
//! ```
//!
//! and then, through the relay C keeps on B's bus, on C's bus:
//!
//! ```text
//! AnyOwnerChanged { actor: C, origin: B }
//! Owned { actor: C, owner: B }
//! ```
//!
//! `Owned`/`Unowned` carry the actor's *direct* owner state, which for C has
//! not changed; listeners use them to re-evaluate anything that depends on
//! the chain above.

use super::ActorId;

/// The direct owner of `actor` changed from `previous` to `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerChanged {
    pub actor: ActorId,
    pub previous: Option<ActorId>,
    pub next: Option<ActorId>,
}

/// Some link in `actor`'s owner chain changed. `origin` is the actor whose
/// direct owner changed; equal to `actor` for a direct change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyOwnerChanged {
    pub actor: ActorId,
    pub origin: ActorId,
}

/// Published after a chain change while `actor` has an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owned {
    pub actor: ActorId,
    pub owner: ActorId,
}

/// Published after a chain change while `actor` has no owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unowned {
    pub actor: ActorId,
}

/// `actor` asks whoever handed it over to take ownership back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WantsToGiveBackOwnership {
    pub actor: ActorId,
}
