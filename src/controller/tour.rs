use glam::Vec3;

use crate::error::{Result, SceneError};
use crate::model::{Camera, CameraPose, Easing, TourState, Tween};

/// Cycles the camera through a fixed ring of poses, one step per advance.
///
/// Position and rotation animate on independent tweens. A new advance
/// retargets from wherever the camera currently is, so rapid clicks chain
/// smoothly instead of snapping back to an earlier origin.
#[derive(Debug, Clone)]
pub struct CameraTourController {
    poses: Vec<CameraPose>,
    state: TourState,
    easing: Easing,
    position: Option<Tween>,
    rotation: Option<Tween>,
}

impl CameraTourController {
    pub fn new(poses: Vec<CameraPose>, easing: Easing) -> Result<Self> {
        if poses.is_empty() {
            return Err(SceneError::EmptyTour);
        }
        Ok(Self { poses, state: TourState::default(), easing, position: None, rotation: None })
    }

    pub fn state(&self) -> TourState {
        self.state
    }

    pub fn poses(&self) -> &[CameraPose] {
        &self.poses
    }

    /// Step to the next pose and start animating towards it. Returns the new target.
    pub fn advance(&mut self, camera: &Camera, now: f64) -> CameraPose {
        self.state = self.state.next(self.poses.len());
        let target = self.poses[self.state.index()];

        let from_position = Self::current(self.position.as_ref(), camera.position, now);
        let from_rotation = Self::current(self.rotation.as_ref(), camera.rotation, now);
        self.position = Some(Tween::new(from_position, target.position, now, target.position_duration, self.easing));
        self.rotation = Some(Tween::new(from_rotation, target.rotation, now, target.rotation_duration, self.easing));

        target
    }

    fn current(tween: Option<&Tween>, fallback: Vec3, now: f64) -> Vec3 {
        match tween {
            Some(t) if !t.is_finished(now) => t.sample(now),
            _ => fallback,
        }
    }

    /// Write the animated pose onto the camera. Returns false when nothing is in flight.
    ///
    /// Finished tweens land exactly on their target once and are then dropped.
    pub fn update(&mut self, camera: &mut Camera, now: f64) -> bool {
        let mut wrote = false;
        if let Some(tween) = self.position {
            camera.position = tween.sample(now);
            if tween.is_finished(now) {
                self.position = None;
            }
            wrote = true;
        }
        if let Some(tween) = self.rotation {
            camera.rotation = tween.sample(now);
            if tween.is_finished(now) {
                self.rotation = None;
            }
            wrote = true;
        }
        wrote
    }

    pub fn is_animating(&self, now: f64) -> bool {
        [self.position, self.rotation].iter().flatten().any(|t| !t.is_finished(now))
    }
}
