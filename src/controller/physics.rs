//! Fixed-step rigid-body simulation backed by rapier3d.
//!
//! The rest of the crate speaks glam; conversion to rapier's nalgebra types
//! happens only inside this module.

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use crate::error::{Result, SceneError};
use crate::model::{Aabb, MeshNode};

/// Box collision shape, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    half_extents: Vec3,
}

impl BoxShape {
    pub fn new(half_extents: Vec3) -> Result<Self> {
        let valid = half_extents.is_finite() && half_extents.min_element() > 0.0;
        if !valid {
            return Err(SceneError::InvalidShape {
                x: half_extents.x,
                y: half_extents.y,
                z: half_extents.z,
            });
        }
        Ok(Self { half_extents })
    }

    /// Size a box from a bounding box query, scaled by `scale`.
    pub fn from_bounds(bounds: &Aabb, scale: f32) -> Result<Self> {
        Self::new(bounds.size() * 0.5 * scale)
    }

    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }
}

/// Everything needed to register one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec3,
    pub orientation: Quat,
    pub shape: BoxShape,
    /// 0 makes the body immovable.
    pub mass: f32,
}

/// The physics world: body/collider sets plus the rapier pipeline state.
pub struct PhysicsSystem {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    simulated_time: f64,
    steps: u64,
}

impl PhysicsSystem {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            simulated_time: 0.0,
            steps: 0,
        }
    }

    /// Advance every body by exactly `fixed_delta` seconds.
    pub fn step(&mut self, fixed_delta: f32) {
        self.integration_parameters.dt = fixed_delta;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.simulated_time += fixed_delta as f64;
        self.steps += 1;
    }

    /// Total simulated seconds since the world was created.
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn add_body(&mut self, desc: BodyDesc) -> Result<RigidBodyHandle> {
        if !desc.mass.is_finite() || desc.mass < 0.0 {
            return Err(SceneError::InvalidMass(desc.mass));
        }

        let pose = Isometry::from_parts(
            Translation3::from(to_vector(desc.position)),
            to_rotation(desc.orientation),
        );
        let builder = if desc.mass == 0.0 {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let handle = self.bodies.insert(builder.pose(pose).build());

        let h = desc.shape.half_extents();
        let mut collider = ColliderBuilder::cuboid(h.x, h.y, h.z);
        if desc.mass > 0.0 {
            collider = collider.mass(desc.mass);
        }
        self.colliders.insert_with_parent(collider.build(), handle, &mut self.bodies);

        tracing::debug!(?handle, mass = desc.mass, half_extents = ?h, "added body");
        Ok(handle)
    }

    /// Register a body that starts where `mesh` currently is.
    pub fn add_physics_for(&mut self, mesh: &MeshNode, shape: BoxShape, mass: f32) -> Result<RigidBodyHandle> {
        self.add_body(BodyDesc {
            position: mesh.position,
            orientation: mesh.orientation,
            shape,
            mass,
        })
    }

    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies
            .get(handle)
            .map(|body| (from_vector(body.translation()), from_rotation(body.rotation())))
    }

    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|body| body.is_dynamic())
    }

    /// Teleport a body. Returns false for unknown handles.
    pub fn set_body_position(&mut self, handle: RigidBodyHandle, position: Vec3) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_translation(to_vector(position), true);
                true
            }
            None => false,
        }
    }

    /// Shift a body by `delta`, returning its new position.
    pub fn translate_body(&mut self, handle: RigidBodyHandle, delta: Vec3) -> Option<Vec3> {
        let (position, _) = self.body_transform(handle)?;
        let moved = position + delta;
        self.set_body_position(handle, moved).then_some(moved)
    }
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(r: &UnitQuaternion<Real>) -> Quat {
    let c = r.quaternion().coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}
