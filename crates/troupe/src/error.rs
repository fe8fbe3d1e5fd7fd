//! Error types shared across the runtime.
//!
//! Four kinds of failure exist, each handled its own way:
//!
//! - **NotPermitted**: an ownership or identity change refused by the actor's
//!   [`OwnershipAuthority`](crate::actor::OwnershipAuthority). Recoverable; the
//!   caller decides whether to retry.
//! - **MissingDependency**: a required capability was absent at injection
//!   time. Logged and reported, the component stays partially initialized.
//! - **HandlerFailure**: a subscriber returned an error. The immediate
//!   [`EventBus`](crate::bus::EventBus) hands it back to the publisher, the
//!   [`DeferredEventBus`](crate::bus::DeferredEventBus) logs it and keeps
//!   draining.
//! - **DuplicateRegistration**: never an error value. Registries return
//!   `false` so bulk loading can skip and continue.

use std::fmt;

use crate::actor::ActorId;

/// The error type handlers return. Anything implementing `std::error::Error`
/// converts into it, so handlers can use `?`.
pub type HandlerError = Box<dyn std::error::Error>;

/// Result of a single handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// What an actor's authority was asked to allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityAction {
    SetOwner,
    RemoveOwner,
    ChangeUuid,
}

impl fmt::Display for AuthorityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityAction::SetOwner => f.write_str("set owner"),
            AuthorityAction::RemoveOwner => f.write_str("remove owner"),
            AuthorityAction::ChangeUuid => f.write_str("change uuid"),
        }
    }
}

/// A required capability that could not be resolved during injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    /// Type name of the capability that was requested.
    pub capability: &'static str,
    /// Type name of the component that requested it.
    pub component: &'static str,
    /// Uuid of the actor whose registry was searched.
    pub actor: String,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "required dependency `{}` missing for `{}` on actor `{}`",
            self.capability, self.component, self.actor
        )
    }
}

impl std::error::Error for MissingDependency {}

/// Errors surfaced by the runtime core.
#[derive(Debug)]
pub enum RuntimeError {
    /// The actor's authority refused the transition.
    NotPermitted { actor: String, action: AuthorityAction },
    /// A required capability was absent during injection.
    MissingDependency(MissingDependency),
    /// A subscriber failed while handling an event.
    HandlerFailure {
        event: &'static str,
        source: HandlerError,
    },
    /// The handle refers to an actor that has been destroyed.
    StaleActor(ActorId),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NotPermitted { actor, action } => {
                write!(f, "not permitted to {action} on actor `{actor}`")
            }
            RuntimeError::MissingDependency(missing) => write!(f, "{missing}"),
            RuntimeError::HandlerFailure { event, source } => {
                write!(f, "handler for `{event}` failed: {source}")
            }
            RuntimeError::StaleActor(id) => write!(f, "actor {id} is no longer alive"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::MissingDependency(missing) => Some(missing),
            RuntimeError::HandlerFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<MissingDependency> for RuntimeError {
    fn from(missing: MissingDependency) -> Self {
        RuntimeError::MissingDependency(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_permitted_names_actor_and_action() {
        let err = RuntimeError::NotPermitted {
            actor: "vehicle-1".into(),
            action: AuthorityAction::SetOwner,
        };
        assert_eq!(err.to_string(), "not permitted to set owner on actor `vehicle-1`");
    }

    #[test]
    fn handler_failure_exposes_source() {
        let err = RuntimeError::HandlerFailure {
            event: "Damage",
            source: "boom".into(),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
        assert!(err.to_string().contains("`Damage`"));
    }
}
