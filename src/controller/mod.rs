// CONTROLLER: simulation, input routing, camera writers, and the frame loop
pub mod binding;
pub mod camera_controller;
pub mod context;
pub mod frame_loop;
pub mod input;
pub mod physics;
pub mod stats;
pub mod tour;

pub use binding::BodyMeshBinding;
pub use camera_controller::{CameraController, CameraOwner};
pub use context::SceneContext;
pub use frame_loop::FrameLoopContext;
pub use input::{InputAction, InputDispatcher, InputEvent, InputState, KeyBindings};
pub use physics::PhysicsSystem;
pub use stats::{FrameReport, FrameStats};
pub use tour::CameraTourController;
