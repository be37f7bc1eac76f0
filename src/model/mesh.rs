use glam::{Quat, Vec3};

/// Index of a mesh inside its [`Scene`](super::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

}

/// A renderable node: a colored box with a world transform.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub position: Vec3,
    pub orientation: Quat,
    /// Half size of the box in local space.
    pub half_extents: Vec3,
    pub color: [f32; 4],
}

impl MeshNode {
    pub fn new(name: impl Into<String>, position: Vec3, half_extents: Vec3, color: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            position,
            orientation: Quat::IDENTITY,
            half_extents,
            color,
        }
    }

    /// World-space bounds of the rotated box.
    pub fn bounding_box(&self) -> Aabb {
        let rot = glam::Mat3::from_quat(self.orientation);
        // Extent of a rotated box along each world axis is |R| * h.
        let extent = Vec3::new(
            rot.row(0).abs().dot(self.half_extents),
            rot.row(1).abs().dot(self.half_extents),
            rot.row(2).abs().dot(self.half_extents),
        );
        Aabb { min: self.position - extent, max: self.position + extent }
    }
}
