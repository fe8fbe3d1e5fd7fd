//! # Event Buses
//!
//! Components talk through events instead of holding references to each
//! other. An event is any `'static` type; its Rust type is its identity, so
//! two `Damage` values are interchangeable to the bus whatever they carry.
//!
//! ## Module Overview
//!
//! - [`immediate`]: [`EventBus`], synchronous dispatch. One per actor.
//! - [`deferred`]: [`DeferredEventBus`], per-type FIFO queues drained once
//!   per tick. The stage owns the global one.
//! - `subscribers`: the type-indexed handler map both variants share.
//!
//! Both buses take `&self` everywhere so handlers can subscribe, unsubscribe,
//! and publish while a dispatch is running. Neither is `Sync`; all dispatch
//! happens on the simulation thread.

pub mod deferred;
pub mod immediate;
mod subscribers;

pub use deferred::{DeferredEventBus, TickReport};
pub use immediate::EventBus;
pub use subscribers::{Handler, SubscriptionId};
