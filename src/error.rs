use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building the scene, the physics world, or the tour.
///
/// All of these are caller errors: they surface at construction time and
/// are never retried.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("box half-extents must be finite and positive, got [{x}, {y}, {z}]")]
    InvalidShape { x: f32, y: f32, z: f32 },

    #[error("body mass must be finite and non-negative, got {0}")]
    InvalidMass(f32),

    #[error("physics step must be finite and positive, got {0} s")]
    InvalidTimestep(f32),

    #[error("camera tour needs at least one pose")]
    EmptyTour,

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, SceneError>;
