use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use clap::Parser;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window},
};

use diorama::{
    assets::AssetLoader,
    config,
    controller::{input::native::key_code_to_dom, FrameLoopContext, InputEvent},
    logging,
    view::{GpuContext, WgpuRenderer},
};

#[derive(Debug, Parser)]
#[command(name = "diorama", about = "Interactive physics diorama with a click-driven camera tour")]
struct Cli {
    /// Scene and tuning config; the built-in scene is used when missing
    #[arg(long, default_value = "diorama.toml")]
    config: PathBuf,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,
}

fn set_pointer_lock(window: &Window, locked: bool) {
    if locked {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(e) = grabbed {
            tracing::warn!("cursor grab unavailable: {e}");
        }
        window.set_cursor_visible(false);
    } else {
        let _ = window.set_cursor_grab(CursorGrabMode::None);
        window.set_cursor_visible(true);
    }
}

#[allow(deprecated)]
fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = config::load_or_default(&cli.config);

    let event_loop = EventLoop::new().context("creating event loop")?;
    let window_attributes = Window::default_attributes()
        .with_title("Diorama")
        .with_inner_size(winit::dpi::PhysicalSize::new(cli.width, cli.height));
    let window = Arc::new(event_loop.create_window(window_attributes).context("creating window")?);

    let size = window.inner_size();
    let (width, height) = (size.width.max(1), size.height.max(1));
    let gpu = pollster::block_on(GpuContext::new_native(window.clone(), width, height))?;
    let mut renderer = WgpuRenderer::new(gpu, window.scale_factor() as f32);

    let loader = AssetLoader::spawn(config.scene.clone());
    let mut frame_loop = FrameLoopContext::new(&config, width, height, loader)?;

    let started = Instant::now();
    let mut pointer_locked = false;

    event_loop.run(move |event, elwt| {
        let now = started.elapsed().as_secs_f64();
        match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(physical_size) => {
                    frame_loop.resize(physical_size.width, physical_size.height, &mut renderer);
                }
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    renderer.set_pixels_per_point(*scale_factor as f32);
                }
                WindowEvent::Focused(false) => {
                    frame_loop.handle_input(InputEvent::FocusLost, now);
                }
                WindowEvent::KeyboardInput { event: KeyEvent { state, physical_key, .. }, .. } => {
                    let PhysicalKey::Code(code) = physical_key else { return };
                    let Some(dom) = key_code_to_dom(*code) else { return };
                    match state {
                        ElementState::Pressed => {
                            if dom == frame_loop.key_bindings().release_pointer && pointer_locked {
                                pointer_locked = false;
                                set_pointer_lock(&window, false);
                                frame_loop.handle_input(InputEvent::PointerLockChanged { locked: false }, now);
                            }
                            frame_loop.handle_input(InputEvent::KeyDown(dom), now);
                        }
                        ElementState::Released => {
                            frame_loop.handle_input(InputEvent::KeyUp(dom), now);
                        }
                    }
                }
                WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                    ElementState::Pressed => {
                        if !pointer_locked {
                            pointer_locked = true;
                            set_pointer_lock(&window, true);
                            frame_loop.handle_input(InputEvent::PointerLockChanged { locked: true }, now);
                        }
                    }
                    ElementState::Released => {
                        frame_loop.handle_input(InputEvent::PointerUp, now);
                    }
                },
                WindowEvent::RedrawRequested => {
                    if let Err(e) = frame_loop.tick(now, &mut renderer) {
                        tracing::error!("render failed, exiting: {e}");
                        elwt.exit();
                    }
                }
                _ => {}
            },
            Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
                frame_loop.handle_input(InputEvent::PointerMove { dx: delta.0 as f32, dy: delta.1 as f32 }, now);
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
