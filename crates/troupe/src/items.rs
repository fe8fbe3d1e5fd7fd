//! Item lookup service.
//!
//! Loaded items (pickups, vehicles, props) are themselves actors. The
//! [`ItemRegistry`] maps a case-insensitive item id to the actor that
//! represents it, so gameplay code can ask for `"Sword"` without knowing how
//! the item was loaded. Every [`Stage`](crate::stage::Stage) provides one as a
//! service.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::actor::Actor;

/// Case-insensitive item id to actor map, in registration order.
#[derive(Default)]
pub struct ItemRegistry {
    index: RefCell<HashMap<String, usize>>,
    items: RefCell<Vec<(String, Rc<Actor>)>>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `actor` under `id`. Returns `false`, keeping the existing
    /// entry, when the id is already taken.
    pub fn register_item(&self, id: &str, actor: Rc<Actor>) -> bool {
        let key = id.to_lowercase();
        let mut index = self.index.borrow_mut();
        if index.contains_key(&key) {
            log::warn!(
                target: "troupe::items",
                "Item `{id}` is already registered; skipping actor `{}`",
                actor.uuid()
            );
            return false;
        }
        let mut items = self.items.borrow_mut();
        index.insert(key, items.len());
        items.push((id.to_string(), actor));
        true
    }

    /// The actor registered for `id`, in any letter case.
    pub fn get(&self, id: &str) -> Option<Rc<Actor>> {
        let found = self
            .index
            .borrow()
            .get(&id.to_lowercase())
            .map(|&slot| self.items.borrow()[slot].1.clone());
        if found.is_none() {
            log::warn!(target: "troupe::items", "No item registered with id `{id}`");
        }
        found
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.borrow().contains_key(&id.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids as they were registered, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.items.borrow().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    #[test]
    fn lookup_ignores_case() {
        let stage = Stage::default();
        let items = ItemRegistry::new();
        let sword = stage.spawn("item-sword").build();
        assert!(items.register_item("Sword", sword.clone()));

        assert!(Rc::ptr_eq(&items.get("sword").unwrap(), &sword));
        assert!(Rc::ptr_eq(&items.get("SWORD").unwrap(), &sword));
        assert!(items.get("shield").is_none());
    }

    #[test]
    fn duplicate_id_is_refused() {
        let stage = Stage::default();
        let items = ItemRegistry::new();
        let first = stage.spawn("a").build();
        let second = stage.spawn("b").build();

        assert!(items.register_item("Potion", first.clone()));
        assert!(!items.register_item("potion", second));
        assert_eq!(items.len(), 1);
        assert!(Rc::ptr_eq(&items.get("Potion").unwrap(), &first));
    }

    #[test]
    fn ids_keep_registration_order() {
        let stage = Stage::default();
        let items = ItemRegistry::new();
        for id in ["Torch", "Axe", "Rope"] {
            items.register_item(id, stage.spawn(id).build());
        }
        assert_eq!(items.ids(), ["Torch", "Axe", "Rope"]);
        assert!(items.contains("axe"));
    }
}
