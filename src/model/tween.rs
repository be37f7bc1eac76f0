use glam::Vec3;
use serde::Deserialize;

/// Easing curves for camera transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// Quadratic ease-out, fast start and gentle landing.
    #[default]
    QuadOut,
    QuadInOut,
    CubicOut,
}

impl Easing {
    /// Map linear progress `t` in [0, 1] onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// A single eased transition of a 3-vector over wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub from: Vec3,
    pub to: Vec3,
    /// Wall-clock start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f32,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: Vec3, to: Vec3, start: f64, duration: f32, easing: Easing) -> Self {
        Self { from, to, start, duration: duration.max(0.0), easing }
    }

    /// Linear progress at `now`, clamped to [0, 1].
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (((now - self.start) / self.duration as f64) as f32).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now: f64) -> Vec3 {
        let t = self.progress(now);
        if t >= 1.0 {
            return self.to;
        }
        self.from.lerp(self.to, self.easing.apply(t))
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints_are_fixed() {
        for easing in [Easing::Linear, Easing::QuadOut, Easing::QuadInOut, Easing::CubicOut] {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
        }
    }

    #[test]
    fn quad_out_leads_linear() {
        assert!(Easing::QuadOut.apply(0.25) > 0.25);
        assert!((Easing::QuadOut.apply(0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn tween_reaches_target_after_duration() {
        let tween = Tween::new(Vec3::ZERO, Vec3::new(2.0, 4.0, -6.0), 10.0, 2.0, Easing::QuadOut);
        assert_eq!(tween.sample(9.0), Vec3::ZERO);
        assert_eq!(tween.sample(12.0), Vec3::new(2.0, 4.0, -6.0));
        assert!(tween.is_finished(12.5));
        assert!(!tween.is_finished(11.0));

        let mid = tween.sample(11.0);
        assert!((mid.x - 1.5).abs() < 1e-5);
    }

    #[test]
    fn zero_duration_jumps_to_target() {
        let tween = Tween::new(Vec3::ZERO, Vec3::ONE, 0.0, 0.0, Easing::Linear);
        assert_eq!(tween.sample(0.0), Vec3::ONE);
        assert!(tween.is_finished(0.0));
    }
}
