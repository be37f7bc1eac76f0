use glam::{EulerRot, Quat, Vec3};

use super::input::{InputState, KeyBindings};
use crate::model::Camera;

/// Which writer may move the camera this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraOwner {
    FreeLook,
    Tour,
}

/// First-person fly camera: keys translate, pointer motion turns.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self { move_speed: 8.0, mouse_sensitivity: 0.002 }
    }
}

impl CameraController {
    pub fn new(move_speed: f32, mouse_sensitivity: f32) -> Self {
        Self { move_speed, mouse_sensitivity }
    }

    /// Yaw and pitch of the camera's viewing direction, ignoring roll.
    pub fn yaw_pitch(camera: &Camera) -> (f32, f32) {
        let f = camera.forward();
        ((-f.x).atan2(-f.z), f.y.clamp(-1.0, 1.0).asin())
    }

    /// Apply mouse look delta to camera. A zero delta leaves the rotation untouched.
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let (yaw, pitch) = Self::yaw_pitch(camera);
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        let yaw = yaw - dx * self.mouse_sensitivity;
        let pitch = (pitch - dy * self.mouse_sensitivity).clamp(-limit, limit);
        camera.set_orientation(Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0));
    }

    /// Update camera position based on pressed keys
    pub fn update_movement(&self, camera: &mut Camera, input: &InputState, bindings: &KeyBindings, dt: f32) {
        let forward = camera.forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();

        let mut cam_move = Vec3::ZERO;
        if bindings.is_moving_forward(input) {
            cam_move += forward;
        }
        if bindings.is_moving_backward(input) {
            cam_move -= forward;
        }
        if bindings.is_moving_right(input) {
            cam_move += right;
        }
        if bindings.is_moving_left(input) {
            cam_move -= right;
        }
        if bindings.is_moving_up(input) {
            cam_move += Vec3::Y;
        }
        if bindings.is_moving_down(input) {
            cam_move -= Vec3::Y;
        }

        if cam_move.length_squared() > 0.0 {
            camera.position += cam_move.normalize() * self.move_speed * dt;
        }
    }

    /// One free-look frame: consume the pending look delta, then move.
    pub fn update(&self, camera: &mut Camera, input: &mut InputState, bindings: &KeyBindings, dt: f32) {
        let (dx, dy) = input.consume_look();
        self.apply_look(camera, dx, dy);
        self.update_movement(camera, input, bindings, dt);
    }
}
