//! # Capability Registry — Type-Keyed Component Lookup
//!
//! Every actor owns a [`CapabilityRegistry`]. When the actor is assembled, each
//! component is recorded under its own concrete type plus every capability it
//! chooses to expose (usually trait objects such as `dyn Health`). Other
//! components then ask for a capability by type instead of holding direct
//! references.
//!
//! ## Layout
//!
//! ```text
//! entries: HashMap<TypeId, Vec<Box<dyn Any>>>
//!            key   = TypeId of the capability (`Health`, `dyn Health`, ...)
//!            value = one `Rc<C>` per provider, in registration order
//! ```
//!
//! `resolve::<C>()` returns the first provider. Registration is append-only;
//! entries live as long as the actor.

use std::any::{Any, TypeId, type_name};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::component::Component;

/// A component waiting to be recorded in a registry.
///
/// Built with [`Registration::of`], which captures the component's concrete
/// type so the registry can store it under that type and call
/// [`Component::expose`].
pub struct Registration {
    identity: usize,
    type_name: &'static str,
    provide: Box<dyn FnOnce(&mut Capabilities<'_>)>,
}

impl Registration {
    pub fn of<C: Component>(component: &Rc<C>) -> Self {
        let component = component.clone();
        Self {
            identity: Rc::as_ptr(&component) as *const () as usize,
            type_name: type_name::<C>(),
            provide: Box::new(move |caps| {
                caps.provide::<C>(component.clone());
                C::expose(&component, caps);
            }),
        }
    }

    /// Type name of the component being registered.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Handed to [`Component::expose`] so a component can publish extra
/// capabilities.
pub struct Capabilities<'a> {
    registry: &'a mut CapabilityRegistry,
}

impl Capabilities<'_> {
    /// Record `instance` as a provider of capability `C`.
    pub fn provide<C: ?Sized + 'static>(&mut self, instance: Rc<C>) -> &mut Self {
        self.registry.provide(instance);
        self
    }
}

/// Maps capability types to the instances providing them.
pub struct CapabilityRegistry {
    entries: HashMap<TypeId, Vec<Box<dyn Any>>>,
    names: HashMap<TypeId, &'static str>,
    /// Identities of registered components, to refuse double registration.
    registered: HashSet<usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            names: HashMap::with_capacity(capacity),
            registered: HashSet::new(),
        }
    }

    /// Record a sequence of components. Returns how many were newly
    /// registered; duplicates are skipped.
    pub fn register(&mut self, components: impl IntoIterator<Item = Registration>) -> usize {
        components
            .into_iter()
            .map(|registration| self.register_one(registration))
            .filter(|added| *added)
            .count()
    }

    /// Record one component. Returns `false` if that exact instance was
    /// already registered.
    pub fn register_one(&mut self, registration: Registration) -> bool {
        if !self.registered.insert(registration.identity) {
            log::warn!(
                target: "troupe::capability",
                "Component `{}` is already registered; skipping",
                registration.type_name
            );
            return false;
        }
        let mut caps = Capabilities { registry: self };
        (registration.provide)(&mut caps);
        true
    }

    /// Record `instance` as a provider of `C` directly, without a component.
    /// Used for services.
    pub fn provide<C: ?Sized + 'static>(&mut self, instance: Rc<C>) {
        let type_id = TypeId::of::<C>();
        self.names.entry(type_id).or_insert_with(type_name::<C>);
        self.entries
            .entry(type_id)
            .or_default()
            .push(Box::new(instance));
    }

    /// The first provider of `C`, or `None` if nothing provides it.
    pub fn resolve<C: ?Sized + 'static>(&self) -> Option<Rc<C>> {
        self.entries
            .get(&TypeId::of::<C>())?
            .first()?
            .downcast_ref::<Rc<C>>()
            .cloned()
    }

    /// Every provider of `C`, in registration order.
    pub fn resolve_all<C: ?Sized + 'static>(&self) -> Vec<Rc<C>> {
        self.entries
            .get(&TypeId::of::<C>())
            .map(|providers| {
                providers
                    .iter()
                    .filter_map(|p| p.downcast_ref::<Rc<C>>().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains<C: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    /// Number of distinct capability types recorded.
    pub fn capability_count(&self) -> usize {
        self.entries.len()
    }

    /// Type names of every recorded capability, sorted.
    pub fn capability_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.names.values().copied().collect();
        names.sort_unstable();
        names
    }

    /// Drop everything. Only called when the owning actor is torn down.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.names.clear();
        self.registered.clear();
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
