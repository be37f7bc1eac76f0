use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::error::{Result, SceneError};
use crate::model::{CameraPose, Easing, Keyframe};

/// Top-level configuration, usually loaded from `diorama.toml`.
///
/// Every section is optional; missing fields fall back to the reference scene.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub physics: PhysicsConfig,
    pub input: InputConfig,
    pub tour: TourConfig,
    pub camera: CameraConfig,
    pub free_look: FreeLookConfig,
    pub lighting: LightingConfig,
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Simulation step in seconds, independent of the frame rate.
    pub fixed_delta: f32,
    pub gravity: Vec3,
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.fixed_delta.is_finite() || self.fixed_delta <= 0.0 {
            return Err(SceneError::InvalidTimestep(self.fixed_delta));
        }
        Ok(())
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self { fixed_delta: 1.0 / 100.0, gravity: Vec3::new(0.0, -10.0, 0.0) }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Distance a tracked body moves per arrow key press.
    pub nudge_step: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { nudge_step: 0.1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    pub easing: Easing,
    pub poses: Vec<CameraPose>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self { easing: Easing::default(), poses: CameraPose::default_tour() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            z_near: 0.1,
            z_far: 1000.0,
            position: Vec3::new(0.0, 0.0, 5.0),
            rotation: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FreeLookConfig {
    /// Units per second.
    pub movement_speed: f32,
    /// Radians per pixel of pointer motion.
    pub look_sensitivity: f32,
}

impl Default for FreeLookConfig {
    fn default() -> Self {
        Self { movement_speed: 8.0, look_sensitivity: 0.002 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    pub position: Vec3,
    #[serde(default = "white")]
    pub color: [f32; 3],
    pub intensity: f32,
    #[serde(default)]
    pub range: f32,
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: [f32; 3],
    pub ambient_intensity: f32,
    pub point_lights: Vec<LightConfig>,
    /// Light glued to the first prop marked `light_follow`.
    pub follow_light: Option<LightConfig>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: white(),
            ambient_intensity: 0.6,
            point_lights: vec![
                LightConfig { position: Vec3::new(0.0, 1000.0, 0.0), color: white(), intensity: 0.5, range: 0.0 },
                LightConfig { position: Vec3::new(0.0, 2.0, 0.0), color: white(), intensity: 0.5, range: 0.0 },
            ],
            follow_light: Some(LightConfig { position: Vec3::ZERO, color: white(), intensity: 1.0, range: 0.1 }),
        }
    }
}

/// A box in the scene, optionally backed by a rigid body.
#[derive(Debug, Clone, Deserialize)]
pub struct PropConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    pub half_extents: Vec3,
    #[serde(default = "grey")]
    pub color: [f32; 4],
    /// `None` keeps the prop purely visual; 0 makes it static.
    #[serde(default)]
    pub mass: Option<f32>,
    /// Collider half-extents as a fraction of the bounding box half size.
    #[serde(default = "unit_scale")]
    pub collider_scale: f32,
    /// Arrow keys nudge this prop's body.
    #[serde(default)]
    pub tracked: bool,
    #[serde(default)]
    pub light_follow: bool,
}

fn grey() -> [f32; 4] {
    [0.7, 0.7, 0.7, 1.0]
}

fn unit_scale() -> f32 {
    1.0
}

/// A looping translation track applied to one visual prop.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipConfig {
    pub name: String,
    pub duration: f32,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: [f32; 3],
    pub props: Vec<PropConfig>,
    pub clips: Vec<ClipConfig>,
    pub autoplay_clip: Option<String>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: [0.53, 0.72, 0.92],
            props: vec![
                PropConfig {
                    name: "garden".into(),
                    position: Vec3::ZERO,
                    half_extents: Vec3::new(1.5, 0.1, 3.0),
                    color: [0.35, 0.6, 0.3, 1.0],
                    mass: Some(0.0),
                    collider_scale: 1.0,
                    tracked: false,
                    light_follow: false,
                },
                PropConfig {
                    name: "dragon".into(),
                    position: Vec3::new(0.0, 1.0, 0.0),
                    half_extents: Vec3::new(0.1, 0.18, 0.06),
                    color: [0.8, 0.25, 0.2, 1.0],
                    mass: Some(1.0),
                    collider_scale: 1.0,
                    tracked: true,
                    light_follow: true,
                },
                PropConfig {
                    name: "butterfly".into(),
                    position: Vec3::new(0.4, 0.6, 0.5),
                    half_extents: Vec3::new(0.05, 0.01, 0.04),
                    color: [0.95, 0.8, 0.2, 1.0],
                    mass: None,
                    collider_scale: 1.0,
                    tracked: false,
                    light_follow: false,
                },
            ],
            clips: vec![ClipConfig {
                name: "The Life".into(),
                duration: 10.0,
                target: Some("butterfly".into()),
                keyframes: vec![
                    Keyframe { time: 0.0, offset: Vec3::ZERO },
                    Keyframe { time: 2.5, offset: Vec3::new(-0.4, 0.3, -0.3) },
                    Keyframe { time: 5.0, offset: Vec3::new(-0.8, 0.1, -1.0) },
                    Keyframe { time: 7.5, offset: Vec3::new(-0.4, 0.4, -0.6) },
                    Keyframe { time: 10.0, offset: Vec3::ZERO },
                ],
            }],
            autoplay_clip: Some("The Life".into()),
        }
    }
}

impl AppConfig {
    pub fn from_toml(src: &str, path: &Path) -> Result<Self> {
        let config: Self =
            toml::from_str(src).map_err(|source| SceneError::ConfigParse { path: path.to_path_buf(), source })?;
        config.physics.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| SceneError::ConfigRead { path: path.to_path_buf(), source })?;
        Self::from_toml(&content, path)
    }
}

/// Load a config file, falling back to the reference scene when it is missing or broken.
pub fn load_or_default(path: &Path) -> AppConfig {
    match AppConfig::load(path) {
        Ok(config) => {
            tracing::info!(
                path = %path.display(),
                props = config.scene.props.len(),
                poses = config.tour.poses.len(),
                "loaded config"
            );
            config
        }
        Err(e) => {
            tracing::warn!("no usable config ({e}), using defaults");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_scene() {
        let config = AppConfig::default();
        assert_eq!(config.physics.fixed_delta, 0.01);
        assert_eq!(config.physics.gravity, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(config.input.nudge_step, 0.1);
        assert_eq!(config.tour.poses.len(), 5);
        assert_eq!(config.tour.easing, Easing::QuadOut);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let src = r#"
            [physics]
            fixed_delta = 0.02

            [tour]
            easing = "linear"

            [[tour.poses]]
            position = [0.0, 1.0, 2.0]
            rotation = [0.0, 0.5, 0.0]
            position_duration = 1.0

            [[tour.poses]]
            position = [3.0, 1.0, 2.0]
            rotation = [0.0, 0.0, 0.0]
        "#;
        let config = AppConfig::from_toml(src, Path::new("test.toml")).unwrap();
        assert_eq!(config.physics.fixed_delta, 0.02);
        assert_eq!(config.physics.gravity, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(config.tour.easing, Easing::Linear);
        assert_eq!(config.tour.poses.len(), 2);
        assert_eq!(config.tour.poses[0].position_duration, 1.0);
        assert_eq!(config.tour.poses[1].rotation_duration, 2.2);
        assert_eq!(config.scene.props.len(), 3);
    }

    #[test]
    fn props_parse_with_optional_physics() {
        let src = r#"
            [scene]
            background = [0.0, 0.0, 0.0]

            [[scene.props]]
            name = "crate"
            position = [0.0, 4.0, 0.0]
            half_extents = [0.5, 0.5, 0.5]
            mass = 2.0
            tracked = true

            [[scene.props]]
            name = "sign"
            half_extents = [0.1, 1.0, 0.1]
        "#;
        let config = AppConfig::from_toml(src, Path::new("test.toml")).unwrap();
        let props = &config.scene.props;
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].mass, Some(2.0));
        assert!(props[0].tracked);
        assert_eq!(props[1].mass, None);
        assert_eq!(props[1].collider_scale, 1.0);
        assert_eq!(config.scene.clips.len(), 1);
    }

    #[test]
    fn shipped_sample_matches_builtin_tour() {
        let src = include_str!("../diorama.toml");
        let config = AppConfig::from_toml(src, Path::new("diorama.toml")).unwrap();
        let builtin = CameraPose::default_tour();
        assert_eq!(config.tour.poses.len(), builtin.len());
        for (parsed, expected) in config.tour.poses.iter().zip(&builtin) {
            assert!(parsed.position.abs_diff_eq(expected.position, 1e-5));
            assert!(parsed.rotation.abs_diff_eq(expected.rotation, 1e-6));
            assert_eq!(parsed.position_duration, expected.position_duration);
        }
        assert_eq!(config.lighting.point_lights.len(), 2);
        assert_eq!(config.lighting.follow_light.map(|l| l.range), Some(0.1));
    }

    #[test]
    fn non_positive_step_is_rejected() {
        for step in ["0.0", "-0.01", "nan"] {
            let src = format!("[physics]\nfixed_delta = {step}");
            let err = AppConfig::from_toml(&src, Path::new("step.toml")).unwrap_err();
            assert!(matches!(err, SceneError::InvalidTimestep(_)), "{step}: {err}");
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("/definitely/not/here/diorama.toml"));
        assert_eq!(config.tour.poses.len(), 5);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = AppConfig::from_toml("[physics]\nfixed_delta = \"fast\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, SceneError::ConfigParse { .. }));
    }
}
