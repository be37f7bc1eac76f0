use super::PhysicsSystem;
use crate::model::{Camera, Scene};

/// The three pieces of mutable state every frame touches.
pub struct SceneContext {
    pub physics: PhysicsSystem,
    pub scene: Scene,
    pub camera: Camera,
}

impl SceneContext {
    pub fn new(physics: PhysicsSystem, scene: Scene, camera: Camera) -> Self {
        Self { physics, scene, camera }
    }
}
