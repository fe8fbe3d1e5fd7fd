//! # Stage — The Root Composition Context
//!
//! A [`Stage`] is built explicitly and passed by reference to whatever needs
//! it. It owns:
//!
//! ```text
//! Stage
//!   ├── events: Rc<DeferredEventBus>       global, ticked every step
//!   ├── local_buses: Vec<Weak<..>>         actor-local deferred buses
//!   ├── services: CapabilityRegistry       ItemRegistry + host services
//!   ├── actors: Vec<Option<Rc<Actor>>>     indexed by ActorId::index
//!   ├── ids: ActorAllocator                generational handles
//!   └── time: Time
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let stage = Stage::new(RuntimeConfig::default());
//! let car = stage
//!     .spawn("car")
//!     .with(Engine::default())
//!     .with(PossessionTransfer::new())
//!     .at(Transform::from_xyz(0.0, 0.0, 5.0))
//!     .build();
//!
//! loop {
//!     stage.tick(Duration::from_millis(16));
//! }
//! ```
//!
//! Dropping the stage destroys every actor still on it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::actor::{Actor, ActorAllocator, ActorId, LocalAuthority, OwnershipAuthority};
use crate::bus::{DeferredEventBus, TickReport};
use crate::capability::{CapabilityRegistry, Registration};
use crate::component::Component;
use crate::config::{RuntimeConfig, TickOrder};
use crate::items::ItemRegistry;
use crate::math::Transform;
use crate::time::Time;

/// Owns every actor and the global deferred bus.
pub struct Stage {
    config: RuntimeConfig,
    events: Rc<DeferredEventBus>,
    local_buses: RefCell<Vec<Weak<DeferredEventBus>>>,
    services: RefCell<CapabilityRegistry>,
    items: Rc<ItemRegistry>,
    actors: RefCell<Vec<Option<Rc<Actor>>>>,
    ids: RefCell<ActorAllocator>,
    time: Cell<Time>,
}

impl Stage {
    pub fn new(config: RuntimeConfig) -> Self {
        let items = Rc::new(ItemRegistry::new());
        let mut services = CapabilityRegistry::new();
        services.provide(items.clone());

        log::info!(
            target: "troupe::stage",
            "Stage created (bus capacity {}, {:?})",
            config.bus_capacity,
            config.tick_order
        );
        Self {
            events: Rc::new(DeferredEventBus::with_capacity(config.bus_capacity)),
            local_buses: RefCell::new(Vec::new()),
            services: RefCell::new(services),
            items,
            actors: RefCell::new(Vec::new()),
            ids: RefCell::new(ActorAllocator::new()),
            time: Cell::new(Time::default()),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ── Actors ────────────────────────────────────────────────────────

    /// Start assembling an actor with the given uuid.
    pub fn spawn(&self, uuid: impl Into<String>) -> ActorBuilder<'_> {
        ActorBuilder {
            stage: self,
            uuid: uuid.into(),
            parts: Vec::new(),
            transform: Transform::IDENTITY,
            authority: Rc::new(LocalAuthority),
        }
    }

    fn insert(&self, builder: ActorBuilder<'_>) -> Rc<Actor> {
        let id = self.ids.borrow_mut().allocate();
        let actor = Actor::new(
            id,
            builder.uuid,
            self.config.bus_capacity,
            builder.authority,
            builder.transform,
        );

        {
            let mut actors = self.actors.borrow_mut();
            let slot = id.index() as usize;
            if actors.len() <= slot {
                actors.resize(slot + 1, None);
            }
            actors[slot] = Some(actor.clone());
        }

        actor.assemble(builder.parts);
        log::debug!(
            target: "troupe::stage",
            "Spawned actor `{}` ({id}) with {} components",
            actor.uuid(),
            actor.component_count()
        );
        actor
    }

    /// Tear down the actor behind `id` and retire the handle. Returns `false`
    /// for stale handles.
    pub fn destroy(&self, id: ActorId) -> bool {
        if !self.ids.borrow().is_current(id) {
            return false;
        }
        let actor = self
            .actors
            .borrow_mut()
            .get_mut(id.index() as usize)
            .and_then(Option::take);
        self.ids.borrow_mut().release(id);

        match actor {
            Some(actor) => {
                actor.destroy();
                true
            }
            None => false,
        }
    }

    /// The actor behind `id`, unless it was destroyed.
    pub fn actor(&self, id: ActorId) -> Option<Rc<Actor>> {
        if !self.ids.borrow().is_current(id) {
            return None;
        }
        self.actors.borrow().get(id.index() as usize)?.clone()
    }

    /// First live actor whose uuid is `uuid`.
    pub fn find(&self, uuid: &str) -> Option<Rc<Actor>> {
        self.actors
            .borrow()
            .iter()
            .flatten()
            .find(|actor| actor.uuid() == uuid)
            .cloned()
    }

    /// Every live actor, in slot order.
    pub fn actors(&self) -> Vec<Rc<Actor>> {
        self.actors.borrow().iter().flatten().cloned().collect()
    }

    pub fn actor_count(&self) -> usize {
        self.ids.borrow().live()
    }

    // ── Services ──────────────────────────────────────────────────────

    /// Make `service` available through [`service`](Self::service).
    pub fn provide_service<S: ?Sized + 'static>(&self, service: Rc<S>) {
        self.services.borrow_mut().provide(service);
    }

    pub fn service<S: ?Sized + 'static>(&self) -> Option<Rc<S>> {
        self.services.borrow().resolve::<S>()
    }

    pub fn items(&self) -> &Rc<ItemRegistry> {
        &self.items
    }

    // ── Ticking ───────────────────────────────────────────────────────

    /// The global deferred bus.
    pub fn events(&self) -> &Rc<DeferredEventBus> {
        &self.events
    }

    /// Tick `bus` along with the global one from now on. The stage only
    /// keeps a weak reference; dropping the bus unregisters it.
    pub fn add_deferred_bus(&self, bus: &Rc<DeferredEventBus>) {
        self.local_buses.borrow_mut().push(Rc::downgrade(bus));
    }

    /// Create an actor-local deferred bus already registered for ticking.
    pub fn create_deferred_bus(&self) -> Rc<DeferredEventBus> {
        let bus = Rc::new(DeferredEventBus::with_capacity(self.config.bus_capacity));
        self.add_deferred_bus(&bus);
        bus
    }

    /// Advance time by `delta`, then tick every deferred bus exactly once in
    /// the configured [`TickOrder`].
    pub fn tick(&self, delta: Duration) -> TickReport {
        let mut time = self.time.get();
        time.advance(delta);
        self.time.set(time);

        let local: Vec<Rc<DeferredEventBus>> = {
            let mut buses = self.local_buses.borrow_mut();
            buses.retain(|bus| bus.strong_count() > 0);
            buses.iter().filter_map(Weak::upgrade).collect()
        };

        let mut report = TickReport::default();
        match self.config.tick_order {
            TickOrder::GlobalFirst => {
                report += self.events.tick();
                for bus in &local {
                    report += bus.tick();
                }
            }
            TickOrder::LocalFirst => {
                for bus in &local {
                    report += bus.tick();
                }
                report += self.events.tick();
            }
        }

        if report.failures > 0 {
            log::warn!(
                target: "troupe::stage",
                "Tick {}: {} handler failures across {} events",
                time.tick_count(),
                report.failures,
                report.delivered
            );
        }
        report
    }

    pub fn time(&self) -> Time {
        self.time.get()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        let ids: Vec<ActorId> = self.actors().iter().map(|actor| actor.id()).collect();
        for id in ids {
            self.destroy(id);
        }
        self.events.clear();
        log::debug!(target: "troupe::stage", "Stage dropped");
    }
}

/// Collects the parts of an actor. Created by [`Stage::spawn`].
pub struct ActorBuilder<'s> {
    stage: &'s Stage,
    uuid: String,
    parts: Vec<(Rc<dyn Component>, Registration)>,
    transform: Transform,
    authority: Rc<dyn OwnershipAuthority>,
}

impl ActorBuilder<'_> {
    /// Add a component the actor will own.
    pub fn with<C: Component>(self, component: C) -> Self {
        self.with_shared(Rc::new(component))
    }

    /// Add a component the caller keeps a handle to.
    pub fn with_shared<C: Component>(mut self, component: Rc<C>) -> Self {
        let registration = Registration::of(&component);
        let component: Rc<dyn Component> = component;
        self.parts.push((component, registration));
        self
    }

    pub fn at(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Replace the default [`LocalAuthority`].
    pub fn authority(mut self, authority: Rc<dyn OwnershipAuthority>) -> Self {
        self.authority = authority;
        self
    }

    /// Attach, register and start every component, then return the actor.
    pub fn build(self) -> Rc<Actor> {
        self.stage.insert(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Component for Recorder {
        fn attach(&self, actor: &Rc<Actor>) {
            self.log.borrow_mut().push(format!("attach {}", self.name));
            assert!(actor.resolve::<Recorder>().is_none());
        }

        fn start(&self, actor: &Rc<Actor>) {
            self.log.borrow_mut().push(format!("start {}", self.name));
            assert_eq!(actor.registry().resolve_all::<Recorder>().len(), 2);
        }

        fn teardown(&self, _actor: &Actor) {
            self.log.borrow_mut().push(format!("teardown {}", self.name));
        }
    }

    fn recorders(log: &Rc<RefCell<Vec<String>>>) -> (Recorder, Recorder) {
        (
            Recorder { name: "a", log: log.clone() },
            Recorder { name: "b", log: log.clone() },
        )
    }

    #[test]
    fn lifecycle_order() {
        let stage = Stage::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = recorders(&log);
        let actor = stage.spawn("dummy").with(a).with(b).build();

        assert_eq!(*log.borrow(), ["attach a", "attach b", "start a", "start b"]);

        log.borrow_mut().clear();
        assert!(stage.destroy(actor.id()));
        assert_eq!(*log.borrow(), ["teardown b", "teardown a"]);
        assert!(!actor.is_alive());
    }

    #[test]
    fn stale_handles_resolve_to_none() {
        let stage = Stage::default();
        let first = stage.spawn("first").build();
        let id = first.id();
        assert!(stage.destroy(id));
        assert!(!stage.destroy(id));

        let second = stage.spawn("second").build();
        assert_eq!(second.id().index(), id.index());
        assert!(stage.actor(id).is_none());
        assert!(Rc::ptr_eq(&stage.actor(second.id()).unwrap(), &second));
        assert_eq!(stage.actor_count(), 1);
    }

    #[test]
    fn find_by_uuid() {
        let stage = Stage::default();
        let hero = stage.spawn("hero").build();
        stage.spawn("villain").build();

        assert!(Rc::ptr_eq(&stage.find("hero").unwrap(), &hero));
        hero.try_change_uuid("legend").unwrap();
        assert!(stage.find("hero").is_none());
        assert!(stage.find("legend").is_some());
    }

    #[test]
    fn destroy_clears_bus_and_registry() {
        let stage = Stage::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = recorders(&log);
        let actor = stage.spawn("dummy").with(a).with(b).build();
        actor.events().on(|_: &u32| -> HandlerResult { Ok(()) });

        stage.destroy(actor.id());
        assert_eq!(actor.events().subscriber_count::<u32>(), 0);
        assert_eq!(actor.registry().capability_count(), 0);
        assert_eq!(actor.component_count(), 0);
    }

    #[test]
    fn dropping_stage_destroys_actors() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let actor = {
            let stage = Stage::default();
            let (a, b) = recorders(&log);
            stage.spawn("dummy").with(a).with(b).build()
        };
        assert!(!actor.is_alive());
        assert!(log.borrow().contains(&"teardown a".to_string()));
    }

    #[test]
    fn services_and_items() {
        let stage = Stage::default();
        assert!(stage.service::<ItemRegistry>().is_some());

        stage.provide_service(Rc::new(String::from("matchmaking")));
        assert_eq!(stage.service::<String>().unwrap().as_str(), "matchmaking");

        let key = stage.spawn("key").build();
        assert!(stage.items().register_item("Key", key));
        assert!(stage.service::<ItemRegistry>().unwrap().contains("key"));
    }

    #[test]
    fn tick_order_global_first() {
        let stage = Stage::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let local = stage.create_deferred_bus();

        let o = order.clone();
        stage.events().on(move |_: &u8| -> HandlerResult {
            o.borrow_mut().push("global");
            Ok(())
        });
        let o = order.clone();
        local.on(move |_: &u8| -> HandlerResult {
            o.borrow_mut().push("local");
            Ok(())
        });

        local.publish(1u8);
        stage.events().publish(1u8);
        let report = stage.tick(Duration::from_millis(16));

        assert_eq!(*order.borrow(), ["global", "local"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(stage.time().tick_count(), 1);
    }

    #[test]
    fn tick_order_local_first() {
        let config = RuntimeConfig {
            tick_order: TickOrder::LocalFirst,
            ..RuntimeConfig::default()
        };
        let stage = Stage::new(config);
        let order = Rc::new(RefCell::new(Vec::new()));
        let local = stage.create_deferred_bus();

        let o = order.clone();
        stage.events().on(move |_: &u8| -> HandlerResult {
            o.borrow_mut().push("global");
            Ok(())
        });
        let o = order.clone();
        local.on(move |_: &u8| -> HandlerResult {
            o.borrow_mut().push("local");
            Ok(())
        });

        stage.events().publish(1u8);
        local.publish(1u8);
        stage.tick(Duration::from_millis(16));
        assert_eq!(*order.borrow(), ["local", "global"]);
    }

    #[test]
    fn dropped_local_bus_is_forgotten() {
        let stage = Stage::default();
        let local = stage.create_deferred_bus();
        local.publish(5u8);
        drop(local);

        let report = stage.tick(Duration::from_millis(10));
        assert_eq!(report, TickReport::default());
        assert!(stage.local_buses.borrow().is_empty());
    }

    #[test]
    fn tick_counts_failures() {
        let stage = Stage::default();
        stage
            .events()
            .on(|_: &u8| -> HandlerResult { Err("bad".into()) });
        stage.events().publish(1u8);
        stage.events().publish(2u8);

        let report = stage.tick(Duration::from_millis(16));
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures, 2);
    }

    #[test]
    fn transform_from_builder() {
        let stage = Stage::default();
        let tower = stage.spawn("tower").at(Transform::from_xyz(1.0, 2.0, 3.0)).build();
        assert_eq!(tower.transform().translation, crate::math::Vec3::new(1.0, 2.0, 3.0));
    }
}
