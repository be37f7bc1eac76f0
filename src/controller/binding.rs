use rapier3d::prelude::RigidBodyHandle;

use super::PhysicsSystem;
use crate::model::{MeshId, Scene};

/// Pairs one rigid body with one mesh. Transforms flow body → mesh only.
///
/// Either side may be unset (e.g. the mesh has not finished loading); the
/// binding is then inert.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyMeshBinding {
    pub body: Option<RigidBodyHandle>,
    pub mesh: Option<MeshId>,
}

impl BodyMeshBinding {
    pub fn new(body: RigidBodyHandle, mesh: MeshId) -> Self {
        Self { body: Some(body), mesh: Some(mesh) }
    }

    /// Overwrite the mesh transform with the body transform.
    ///
    /// Returns false, touching nothing, when either side is unset or stale.
    pub fn sync(&self, physics: &PhysicsSystem, scene: &mut Scene) -> bool {
        let (Some(body), Some(mesh)) = (self.body, self.mesh) else {
            return false;
        };
        let Some((position, orientation)) = physics.body_transform(body) else {
            return false;
        };
        match scene.mesh_mut(mesh) {
            Some(node) => {
                node.position = position;
                node.orientation = orientation;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::physics::{BodyDesc, BoxShape};
    use crate::model::MeshNode;
    use glam::{Quat, Vec3};

    fn world_with_body() -> (PhysicsSystem, RigidBodyHandle) {
        let mut physics = PhysicsSystem::new(Vec3::new(0.0, -10.0, 0.0));
        let body = physics
            .add_body(BodyDesc {
                position: Vec3::new(0.0, 1.0, 0.0),
                orientation: Quat::from_rotation_z(0.3),
                shape: BoxShape::new(Vec3::splat(0.2)).unwrap(),
                mass: 1.0,
            })
            .unwrap();
        (physics, body)
    }

    #[test]
    fn sync_copies_body_transform_onto_mesh() {
        let (mut physics, body) = world_with_body();
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(MeshNode::new("dragon", Vec3::new(9.0, 9.0, 9.0), Vec3::splat(0.2), [1.0; 4]));
        let binding = BodyMeshBinding::new(body, mesh);

        physics.step(0.01);
        assert!(binding.sync(&physics, &mut scene));

        let (position, orientation) = physics.body_transform(body).unwrap();
        let node = scene.mesh(mesh).unwrap();
        assert_eq!(node.position, position);
        assert_eq!(node.orientation, orientation);
    }

    #[test]
    fn sync_is_idempotent_without_a_step() {
        let (mut physics, body) = world_with_body();
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(MeshNode::new("dragon", Vec3::ZERO, Vec3::splat(0.2), [1.0; 4]));
        let binding = BodyMeshBinding::new(body, mesh);

        physics.step(0.01);
        binding.sync(&physics, &mut scene);
        let first = scene.mesh(mesh).unwrap().clone();
        binding.sync(&physics, &mut scene);
        assert_eq!(scene.mesh(mesh).unwrap(), &first);
    }

    #[test]
    fn sync_never_writes_back_to_body() {
        let (physics, body) = world_with_body();
        let mut scene = Scene::default();
        let mesh = scene.add_mesh(MeshNode::new("dragon", Vec3::ZERO, Vec3::splat(0.2), [1.0; 4]));
        let before = physics.body_transform(body);

        scene.mesh_mut(mesh).unwrap().position = Vec3::new(5.0, 5.0, 5.0);
        BodyMeshBinding::new(body, mesh).sync(&physics, &mut scene);
        assert_eq!(physics.body_transform(body), before);
    }

    #[test]
    fn inactive_bindings_touch_nothing() {
        let (physics, body) = world_with_body();
        let mut scene = Scene::default();
        let original = MeshNode::new("dragon", Vec3::new(4.0, 4.0, 4.0), Vec3::splat(0.2), [1.0; 4]);
        let mesh = scene.add_mesh(original.clone());

        let unset = [
            BodyMeshBinding::default(),
            BodyMeshBinding { body: Some(body), mesh: None },
            BodyMeshBinding { body: None, mesh: Some(mesh) },
            BodyMeshBinding { body: Some(body), mesh: Some(MeshId(99)) },
        ];
        for binding in unset {
            assert!(!binding.sync(&physics, &mut scene));
        }
        assert_eq!(scene.mesh(mesh).unwrap(), &original);
    }

    #[test]
    fn stale_body_handle_is_inert() {
        let (physics, _) = world_with_body();
        // Second handle of another world has no counterpart in `physics`.
        let (mut other_world, _) = world_with_body();
        let other_body = other_world
            .add_body(BodyDesc {
                position: Vec3::ZERO,
                orientation: Quat::IDENTITY,
                shape: BoxShape::new(Vec3::ONE).unwrap(),
                mass: 0.0,
            })
            .unwrap();

        let mut scene = Scene::default();
        let mesh = scene.add_mesh(MeshNode::new("dragon", Vec3::ONE, Vec3::ONE, [1.0; 4]));
        assert!(!BodyMeshBinding::new(other_body, mesh).sync(&physics, &mut scene));
        assert_eq!(scene.mesh(mesh).unwrap().position, Vec3::ONE);
    }
}
