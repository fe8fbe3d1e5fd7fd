//! # Dependency Injection
//!
//! A component declares what it needs as [`Inject`] fields plus a binding
//! table, then calls [`DependencyInjector::inject`] from
//! [`Component::start`](crate::component::Component::start):
//!
//! ```ignore
//! struct Steering {
//!     engine: Inject<dyn Engine>,
//!     horn: Inject<Horn>,
//! }
//!
//! impl Injectable for Steering {
//!     fn bindings(&self) -> Vec<Binding<'_>> {
//!         vec![Binding::required(&self.engine), Binding::optional(&self.horn)]
//!     }
//! }
//!
//! impl Component for Steering {
//!     fn start(&self, actor: &Rc<Actor>) {
//!         DependencyInjector::inject(self, actor);
//!     }
//! }
//! ```
//!
//! Each binding is resolved against the actor's
//! [`CapabilityRegistry`](crate::capability::CapabilityRegistry). A required
//! binding that can't be resolved is logged and reported as a
//! [`MissingDependency`]; an optional one is left empty silently. Either way
//! the remaining bindings are still resolved.
//!
//! Injection runs when it is called and never again on its own. Slots that
//! were filled keep their value.

use std::any::type_name;
use std::cell::OnceCell;
use std::rc::Rc;

use crate::actor::Actor;
use crate::capability::CapabilityRegistry;
use crate::error::MissingDependency;

/// A slot filled from the actor's registry.
pub struct Inject<C: ?Sized + 'static> {
    slot: OnceCell<Rc<C>>,
}

impl<C: ?Sized + 'static> Inject<C> {
    pub const fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// The injected instance, if resolution succeeded.
    pub fn get(&self) -> Option<&Rc<C>> {
        self.slot.get()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<C: ?Sized + 'static> Default for Inject<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of an [`Inject`] field.
pub trait Slot {
    /// Type name of the capability this slot wants.
    fn capability(&self) -> &'static str;
    /// Try to fill the slot. Returns `true` if it holds a value afterwards.
    fn fill(&self, registry: &CapabilityRegistry) -> bool;
}

impl<C: ?Sized + 'static> Slot for Inject<C> {
    fn capability(&self) -> &'static str {
        type_name::<C>()
    }

    fn fill(&self, registry: &CapabilityRegistry) -> bool {
        if self.slot.get().is_some() {
            return true;
        }
        match registry.resolve::<C>() {
            Some(instance) => self.slot.set(instance).is_ok(),
            None => false,
        }
    }
}

/// One row of a component's binding table.
pub struct Binding<'a> {
    slot: &'a dyn Slot,
    required: bool,
}

impl<'a> Binding<'a> {
    /// Missing capability is a configuration error.
    pub fn required(slot: &'a dyn Slot) -> Self {
        Self {
            slot,
            required: true,
        }
    }

    /// Missing capability leaves the slot empty.
    pub fn optional(slot: &'a dyn Slot) -> Self {
        Self {
            slot,
            required: false,
        }
    }
}

/// A component that declares its dependencies.
pub trait Injectable {
    fn bindings(&self) -> Vec<Binding<'_>>;
}

/// What one [`DependencyInjector::inject`] call did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InjectionReport {
    /// Bindings that hold a value afterwards.
    pub bound: usize,
    /// Optional bindings left empty.
    pub skipped: usize,
    /// Required bindings left empty.
    pub missing: Vec<MissingDependency>,
}

impl InjectionReport {
    /// `true` when every required binding was satisfied.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Resolves binding tables against an actor's registry.
pub struct DependencyInjector;

impl DependencyInjector {
    /// Fill every slot `component` declares from `actor`'s registry.
    pub fn inject<T: Injectable>(component: &T, actor: &Actor) -> InjectionReport {
        Self::inject_named(component, type_name::<T>(), actor)
    }

    /// Like [`inject`](Self::inject) for callers that only have a trait
    /// object and supply the component's type name themselves.
    pub fn inject_named(
        component: &dyn Injectable,
        component_name: &'static str,
        actor: &Actor,
    ) -> InjectionReport {
        let registry = actor.registry();
        let mut report = InjectionReport::default();

        for binding in component.bindings() {
            if binding.slot.fill(&registry) {
                report.bound += 1;
            } else if binding.required {
                let missing = MissingDependency {
                    capability: binding.slot.capability(),
                    component: component_name,
                    actor: actor.uuid(),
                };
                log::error!(target: "troupe::inject", "{missing}");
                report.missing.push(missing);
            } else {
                log::debug!(
                    target: "troupe::inject",
                    "Optional dependency `{}` absent for `{}` on actor `{}`",
                    binding.slot.capability(),
                    component_name,
                    actor.uuid()
                );
                report.skipped += 1;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::component::Component;
    use crate::stage::Stage;

    trait Engine {
        fn power(&self) -> u32;
    }

    struct Motor(u32);

    impl Engine for Motor {
        fn power(&self) -> u32 {
            self.0
        }
    }

    impl Component for Motor {
        fn expose(this: &Rc<Self>, caps: &mut crate::capability::Capabilities<'_>) {
            caps.provide::<dyn Engine>(this.clone());
        }
    }

    struct Horn;

    impl Component for Horn {}

    #[derive(Default)]
    struct Steering {
        engine: Inject<dyn Engine>,
        horn: Inject<Horn>,
        starts: Cell<u32>,
        report: std::cell::RefCell<Option<InjectionReport>>,
    }

    impl Injectable for Steering {
        fn bindings(&self) -> Vec<Binding<'_>> {
            vec![Binding::required(&self.engine), Binding::optional(&self.horn)]
        }
    }

    impl Component for Steering {
        fn start(&self, actor: &Rc<Actor>) {
            self.starts.set(self.starts.get() + 1);
            *self.report.borrow_mut() = Some(DependencyInjector::inject(self, actor));
        }
    }

    #[test]
    fn resolves_required_and_optional() {
        let stage = Stage::default();
        let steering = Rc::new(Steering::default());
        stage
            .spawn("car")
            .with(Motor(300))
            .with(Horn)
            .with_shared(steering.clone())
            .build();

        assert_eq!(steering.engine.get().unwrap().power(), 300);
        assert!(steering.horn.is_bound());
        let report = steering.report.borrow().clone().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.bound, 2);
    }

    #[test]
    fn component_order_does_not_matter() {
        // Steering is added before the motor it depends on.
        let stage = Stage::default();
        let steering = Rc::new(Steering::default());
        stage
            .spawn("car")
            .with_shared(steering.clone())
            .with(Motor(120))
            .build();

        assert_eq!(steering.engine.get().unwrap().power(), 120);
        assert_eq!(steering.starts.get(), 1);
    }

    #[test]
    fn missing_required_is_reported_and_left_unset() {
        let stage = Stage::default();
        let steering = Rc::new(Steering::default());
        stage.spawn("trailer").with_shared(steering.clone()).build();

        assert!(!steering.engine.is_bound());
        let report = steering.report.borrow().clone().unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.missing.len(), 1);
        let missing = &report.missing[0];
        assert_eq!(missing.capability, type_name::<dyn Engine>());
        assert_eq!(missing.component, type_name::<Steering>());
        assert_eq!(missing.actor, "trailer");
    }

    #[test]
    fn missing_optional_is_silent() {
        let stage = Stage::default();
        let steering = Rc::new(Steering::default());
        stage
            .spawn("quiet-car")
            .with(Motor(90))
            .with_shared(steering.clone())
            .build();

        assert!(!steering.horn.is_bound());
        let report = steering.report.borrow().clone().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn filled_slots_survive_reinjection() {
        let stage = Stage::default();
        let steering = Rc::new(Steering::default());
        let car = stage
            .spawn("car")
            .with(Motor(50))
            .with_shared(steering.clone())
            .build();

        let first = steering.engine.get().unwrap().clone();
        let report = DependencyInjector::inject(steering.as_ref(), &car);
        assert!(report.is_complete());
        assert!(Rc::ptr_eq(steering.engine.get().unwrap(), &first));
    }
}
