//! The common items, in one import: `use troupe::prelude::*`.

pub use crate::actor::{
    Actor, ActorId, AnyOwnerChanged, LocalAuthority, OwnerChanged, Owned, OwnershipAuthority,
    OwnershipState, SharedAuthority, Unowned, WantsToGiveBackOwnership,
};
pub use crate::bus::{DeferredEventBus, EventBus, Handler, SubscriptionId, TickReport};
pub use crate::capability::{Capabilities, CapabilityRegistry};
pub use crate::component::{ActorLink, Component};
pub use crate::config::{RuntimeConfig, TickOrder};
pub use crate::error::{AuthorityAction, HandlerError, HandlerResult, MissingDependency, RuntimeError};
pub use crate::inject::{Binding, DependencyInjector, Inject, Injectable, InjectionReport};
pub use crate::items::ItemRegistry;
pub use crate::logging::init_logger;
pub use crate::math::{Quat, Transform, Vec3};
pub use crate::observable::{Observable, ObserverGuard};
pub use crate::possession::PossessionTransfer;
pub use crate::stage::{ActorBuilder, Stage};
pub use crate::time::Time;
