// VIEW: Rendering and graphics
pub mod gpu_init;
pub mod render;

pub use gpu_init::{GpuContext, GpuInitError};
pub use render::{RenderError, Renderer, WgpuRenderer};
