//! Generational actor handles.
//!
//! An [`ActorId`] is a slot index plus a generation. Destroying an actor bumps
//! its slot's generation, so an id kept around after destruction no longer
//! matches anything the [`Stage`](crate::stage::Stage) hands out:
//!
//! ```text
//! spawn "car"     -> ActorId 3v0
//! destroy 3v0     -> slot 3 generation becomes 1
//! spawn "boat"    -> ActorId 3v1
//! stage.actor(3v0) -> None
//! ```

use std::fmt;

/// Stable handle to an actor on a [`Stage`](crate::stage::Stage).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ActorId {
    /// Slot index. Shared by every actor that ever lived in the slot.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out [`ActorId`]s and recycles destroyed slots.
#[derive(Debug, Default)]
pub(crate) struct ActorAllocator {
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl ActorAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ActorId {
        match self.free.pop() {
            Some(index) => ActorId {
                index,
                generation: self.generations[index as usize],
            },
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                ActorId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Retire `id`. Returns `false` for ids that were already retired.
    pub fn release(&mut self, id: ActorId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.generations[id.index as usize] += 1;
        self.free.push(id.index);
        true
    }

    pub fn is_current(&self, id: ActorId) -> bool {
        self.generations
            .get(id.index as usize)
            .is_some_and(|generation| *generation == id.generation)
    }

    pub fn live(&self) -> usize {
        self.generations.len() - self.free.len()
    }
}
