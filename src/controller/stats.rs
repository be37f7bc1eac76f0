use glam::Vec3;

use super::CameraOwner;

/// Counters handed to the renderer after each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub frame_ms: f32,
    pub fps: f32,
    pub physics_steps: u64,
    pub simulated_time: f64,
    pub tour_index: usize,
    pub camera_owner: CameraOwner,
    pub readiness: &'static str,
    /// Playback time of the running animation clip.
    pub clip_time: Option<f32>,
    pub tracked_position: Option<Vec3>,
}

/// Frame time plus an FPS figure averaged over roughly one second.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frames: u64,
    last_frame_ms: f32,
    fps: f32,
    window_frames: u32,
    window_secs: f32,
}

impl FrameStats {
    const WINDOW_SECS: f32 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, dt: f32) {
        self.frames += 1;
        self.last_frame_ms = dt * 1000.0;
        self.window_frames += 1;
        self.window_secs += dt;
        if self.window_secs >= Self::WINDOW_SECS {
            self.fps = self.window_frames as f32 / self.window_secs;
            self.window_frames = 0;
            self.window_secs = 0.0;
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame_ms(&self) -> f32 {
        self.last_frame_ms
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_settles_after_a_full_window() {
        let mut stats = FrameStats::new();
        for _ in 0..59 {
            stats.record(1.0 / 60.0);
        }
        assert_eq!(stats.fps(), 0.0);
        stats.record(1.0 / 60.0);
        stats.record(1.0 / 60.0);
        assert!((stats.fps() - 60.0).abs() < 1.5, "fps {}", stats.fps());
        assert_eq!(stats.frames(), 61);
        assert!((stats.last_frame_ms() - 16.666).abs() < 0.01);
    }
}
