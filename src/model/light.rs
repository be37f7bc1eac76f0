use glam::Vec3;

use super::{MeshId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Falloff radius; 0 means unbounded.
    pub range: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: [f32; 3], intensity: f32, range: f32) -> Self {
        Self { position, color, intensity, range }
    }
}

/// Keeps a light on top of a mesh. Holds ids only, never the mesh itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightFollow {
    pub light: LightId,
    pub target: Option<MeshId>,
}

impl LightFollow {
    pub fn new(light: LightId, target: Option<MeshId>) -> Self {
        Self { light, target }
    }

    /// Copy the target mesh position onto the light. Returns whether anything moved.
    pub fn update(&self, scene: &mut Scene) -> bool {
        let Some(position) = self.target.and_then(|id| scene.mesh(id)).map(|m| m.position) else {
            return false;
        };
        match scene.light_mut(self.light) {
            Some(light) => {
                light.position = position;
                true
            }
            None => false,
        }
    }
}
