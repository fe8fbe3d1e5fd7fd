//! Placement data carried by every actor.
//!
//! Actors store a [`Transform`] so components that care about placement
//! (cameras, footsteps, vehicles) read one value. Nothing here does any
//! math on it; the glam types are re-exported so callers need no direct
//! dependency.

pub use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Where an actor stands, which way it faces, and how large it is.
///
/// Serializes as plain arrays so spawn points can live in JSON level files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Placement of a freshly spawned actor with no explicit [`at`](crate::stage::ActorBuilder::at).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
