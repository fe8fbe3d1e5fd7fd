//! # Troupe — Actors, Components, and Event Buses
//!
//! A single-threaded composition runtime for real-time simulations.
//! Components attached to an [`Actor`](actor::Actor) talk through type-indexed
//! events instead of direct references, and actors form ownership chains
//! (a player owning a vehicle owning a turret) whose changes reach every
//! actor beneath the change.
//!
//! Start with `use troupe::prelude::*` and build a [`Stage`](stage::Stage).
//!
//! ```text
//! Stage ──▶ Actor ──┬── EventBus            immediate, per actor
//!                   ├── CapabilityRegistry  component lookup by type
//!                   ├── components          attach → register → start
//!                   └── owner (Weak)        ownership chain
//!       └─▶ DeferredEventBus                queued, drained by Stage::tick
//! ```

pub mod actor;
pub mod bus;
pub mod capability;
pub mod component;
pub mod config;
pub mod error;
pub mod inject;
pub mod items;
pub mod logging;
pub mod math;
pub mod observable;
pub mod possession;
pub mod prelude;
pub mod stage;
pub mod time;
