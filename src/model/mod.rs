// MODEL: scene data, camera, and tour poses
pub mod camera;
pub mod light;
pub mod mesh;
pub mod pose;
pub mod scene;
pub mod tween;

pub use camera::Camera;
pub use light::{LightFollow, LightId, PointLight};
pub use mesh::{Aabb, MeshId, MeshNode};
pub use pose::{CameraPose, TourState};
pub use scene::{AnimationClip, ClipPlayback, Keyframe, Scene};
pub use tween::{Easing, Tween};
