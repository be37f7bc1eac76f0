/// Platform-agnostic input handling
use std::collections::HashSet;

use glam::Vec3;
use rapier3d::prelude::RigidBodyHandle;

use super::{CameraTourController, SceneContext};

/// DOM-style key codes. Native hosts translate their key events to these.
pub mod key {
    pub const ARROW_LEFT: u32 = 37;
    pub const ARROW_UP: u32 = 38;
    pub const ARROW_RIGHT: u32 = 39;
    pub const ARROW_DOWN: u32 = 40;
    pub const ESCAPE: u32 = 27;
    pub const A: u32 = 65;
    pub const D: u32 = 68;
    pub const F: u32 = 70;
    pub const R: u32 = 82;
    pub const S: u32 = 83;
    pub const W: u32 = 87;
}

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(u32),
    KeyUp(u32),
    PointerMove { dx: f32, dy: f32 },
    PointerUp,
    FocusLost,
    PointerLockChanged { locked: bool },
}

/// Held keys and accumulated pointer motion, read by the free-look controller.
#[derive(Debug, Default)]
pub struct InputState {
    pub pressed_keys: HashSet<u32>,
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => {
                self.pressed_keys.insert(*code);
            }
            InputEvent::KeyUp(code) => {
                self.pressed_keys.remove(code);
            }
            InputEvent::PointerMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
            }
            InputEvent::FocusLost => {
                self.clear_keys();
                self.look_delta = (0.0, 0.0);
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
            }
            InputEvent::PointerUp => {}
        }
    }

    pub fn is_key_pressed(&self, code: u32) -> bool {
        self.pressed_keys.contains(&code)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.look_delta)
    }
}

/// One of the four nudge axes bound to the arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Left,
    Right,
    Forward,
    Back,
}

impl NudgeDirection {
    pub fn from_key_code(code: u32) -> Option<Self> {
        match code {
            key::ARROW_LEFT => Some(Self::Left),
            key::ARROW_RIGHT => Some(Self::Right),
            key::ARROW_UP => Some(Self::Forward),
            key::ARROW_DOWN => Some(Self::Back),
            _ => None,
        }
    }

    /// Unit offset; up/down move along Z, not Y.
    pub fn axis(self) -> Vec3 {
        match self {
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
            Self::Forward => Vec3::NEG_Z,
            Self::Back => Vec3::Z,
        }
    }
}

/// Free-look key mapping
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: u32,
    pub backward: u32,
    pub left: u32,
    pub right: u32,
    pub up: u32,
    pub down: u32,
    pub release_pointer: u32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: key::W,
            backward: key::S,
            left: key::A,
            right: key::D,
            up: key::R,
            down: key::F,
            release_pointer: key::ESCAPE,
        }
    }
}

impl KeyBindings {
    pub fn is_moving_forward(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.forward)
    }

    pub fn is_moving_backward(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.backward)
    }

    pub fn is_moving_left(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.left)
    }

    pub fn is_moving_right(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.right)
    }

    pub fn is_moving_up(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.up)
    }

    pub fn is_moving_down(&self, input: &InputState) -> bool {
        input.is_key_pressed(self.down)
    }
}

/// What a discrete input event asks the scene to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    Nudge(Vec3),
    AdvanceTour,
}

/// Routes discrete events either to the tracked body or to the camera tour.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    pub nudge_step: f32,
}

impl InputDispatcher {
    pub fn new(nudge_step: f32) -> Self {
        Self { nudge_step }
    }

    pub fn route(&self, event: &InputEvent) -> Option<InputAction> {
        match event {
            InputEvent::KeyDown(code) => {
                NudgeDirection::from_key_code(*code).map(|dir| InputAction::Nudge(dir.axis() * self.nudge_step))
            }
            InputEvent::PointerUp => Some(InputAction::AdvanceTour),
            _ => None,
        }
    }

    /// Apply an event. Nudges without a tracked body are dropped silently.
    pub fn dispatch(
        &self,
        event: &InputEvent,
        ctx: &mut SceneContext,
        tracked: Option<RigidBodyHandle>,
        tour: &mut CameraTourController,
        now: f64,
    ) -> Option<InputAction> {
        let action = self.route(event)?;
        match action {
            InputAction::Nudge(delta) => {
                let moved = tracked.and_then(|body| ctx.physics.translate_body(body, delta));
                tracing::debug!(?delta, ?moved, "nudge");
            }
            InputAction::AdvanceTour => {
                let target = tour.advance(&ctx.camera, now);
                tracing::debug!(state = tour.state().index(), position = ?target.position, "tour advance");
            }
        }
        Some(action)
    }
}

pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    #[allow(deprecated)]
    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.key_code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }

    pub fn mouse_move_to_input(dx: f32, dy: f32) -> InputEvent {
        InputEvent::PointerMove { dx, dy }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use winit::keyboard::KeyCode;

    /// Translate a physical key to its DOM key code.
    pub fn key_code_to_dom(code: KeyCode) -> Option<u32> {
        let dom = match code {
            KeyCode::ArrowLeft => 37,
            KeyCode::ArrowUp => 38,
            KeyCode::ArrowRight => 39,
            KeyCode::ArrowDown => 40,
            KeyCode::Escape => 27,
            KeyCode::Space => 32,
            KeyCode::Enter => 13,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => 16,
            KeyCode::ControlLeft | KeyCode::ControlRight => 17,
            KeyCode::Digit0 => 48,
            KeyCode::Digit1 => 49,
            KeyCode::Digit2 => 50,
            KeyCode::Digit3 => 51,
            KeyCode::Digit4 => 52,
            KeyCode::Digit5 => 53,
            KeyCode::Digit6 => 54,
            KeyCode::Digit7 => 55,
            KeyCode::Digit8 => 56,
            KeyCode::Digit9 => 57,
            KeyCode::KeyA => 65,
            KeyCode::KeyB => 66,
            KeyCode::KeyC => 67,
            KeyCode::KeyD => 68,
            KeyCode::KeyE => 69,
            KeyCode::KeyF => 70,
            KeyCode::KeyG => 71,
            KeyCode::KeyH => 72,
            KeyCode::KeyI => 73,
            KeyCode::KeyJ => 74,
            KeyCode::KeyK => 75,
            KeyCode::KeyL => 76,
            KeyCode::KeyM => 77,
            KeyCode::KeyN => 78,
            KeyCode::KeyO => 79,
            KeyCode::KeyP => 80,
            KeyCode::KeyQ => 81,
            KeyCode::KeyR => 82,
            KeyCode::KeyS => 83,
            KeyCode::KeyT => 84,
            KeyCode::KeyU => 85,
            KeyCode::KeyV => 86,
            KeyCode::KeyW => 87,
            KeyCode::KeyX => 88,
            KeyCode::KeyY => 89,
            KeyCode::KeyZ => 90,
            _ => return None,
        };
        Some(dom)
    }

}
