use glam::Vec3;
use serde::Deserialize;

/// One stop of the camera tour.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
    #[serde(default = "default_position_duration")]
    pub position_duration: f32,
    #[serde(default = "default_rotation_duration")]
    pub rotation_duration: f32,
}

fn default_position_duration() -> f32 {
    2.0
}

fn default_rotation_duration() -> f32 {
    2.2
}

impl CameraPose {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self {
            position,
            rotation,
            position_duration: default_position_duration(),
            rotation_duration: default_rotation_duration(),
        }
    }

    /// The garden tour: five viewpoints around the diorama, pose 0 is the overhead shot.
    pub fn default_tour() -> Vec<CameraPose> {
        vec![
            CameraPose::new(Vec3::new(-11.782711, 39.84331, -15.713715), Vec3::new(-1.5, 0.2, 1.8)),
            CameraPose::new(Vec3::new(-10.701407, 10.548127, -5.09355), Vec3::new(0.3, -3.0, 0.0)),
            CameraPose::new(Vec3::new(34.088818, 2.440012, -4.166807), Vec3::new(0.1, 2.0, 0.0)),
            CameraPose::new(Vec3::new(29.535408, 6.285267, 32.686733), Vec3::new(-0.3, 0.0, 0.0)),
            CameraPose::new(Vec3::new(-2.8652415, 17.706057, 60.0), Vec3::new(-0.5, 0.0, 0.0)),
        ]
    }
}

/// Index of the pose the tour currently targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TourState(pub usize);

impl TourState {
    pub fn index(self) -> usize {
        self.0
    }

    /// Successor state in a cycle of `len` poses.
    pub fn next(self, len: usize) -> Self {
        TourState((self.0 + 1) % len.max(1))
    }
}
