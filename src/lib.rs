pub mod assets;
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use config::AppConfig;
pub use error::{Result, SceneError};

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use controller::input::{key, wasm as web_input};
#[cfg(target_arch = "wasm32")]
use controller::{FrameLoopContext, InputEvent};
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, WgpuRenderer};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> std::result::Result<(), JsValue> {
    logging::init();
    let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
    let (width, height) = window_size(&window);
    let (document, canvas) = init_canvas(&window, width, height)?;
    setup_app(&window, &document, &canvas, width, height).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
    width: u32,
    height: u32,
) -> std::result::Result<(), JsValue> {
    let gpu = GpuContext::new(canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
    let renderer = Rc::new(RefCell::new(WgpuRenderer::new(gpu, window.device_pixel_ratio() as f32)));

    // No filesystem in the browser: the reference scene is built in.
    let config = AppConfig::default();
    let loader = assets::AssetLoader::spawn(config.scene.clone());
    let frame_loop = FrameLoopContext::new(&config, width, height, loader)
        .map_err(|e| js_error(format!("scene setup failed: {e}")))?;
    let frame_loop = Rc::new(RefCell::new(frame_loop));

    setup_input_listeners(document, window, canvas, frame_loop.clone())?;

    let f = RcCellCallback::new(window.clone(), {
        let window = window.clone();
        let canvas = canvas.clone();
        move || {
            let (w, h) = window_size(&window);
            let mut renderer = renderer.borrow_mut();
            let mut frame_loop = frame_loop.borrow_mut();
            if (w, h) != renderer.size() {
                canvas.set_width(w);
                canvas.set_height(h);
                frame_loop.resize(w, h, &mut *renderer);
            }
            match frame_loop.tick(now_secs(&window), &mut *renderer) {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!("render failed, stopping frame loop: {e}");
                    false
                }
            }
        }
    });
    f.start();

    Ok(())
}

/// Forward DOM events to the frame loop as platform-independent input
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    frame_loop: Rc<RefCell<FrameLoopContext>>,
) -> std::result::Result<(), JsValue> {
    // Keyboard down
    {
        let frame_loop = frame_loop.clone();
        let window = window.clone();
        let document_for_exit = document.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let event = web_input::keyboard_event_to_input(&e, true);
            if let InputEvent::KeyDown(code) = event {
                if code == key::ESCAPE {
                    document_for_exit.exit_pointer_lock();
                }
                if matches!(code, key::ARROW_LEFT | key::ARROW_UP | key::ARROW_RIGHT | key::ARROW_DOWN) {
                    e.prevent_default();
                }
            }
            frame_loop.borrow_mut().handle_input(event, now_secs(&window));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let frame_loop = frame_loop.clone();
        let window = window.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let event = web_input::keyboard_event_to_input(&e, false);
            frame_loop.borrow_mut().handle_input(event, now_secs(&window));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss and tab switches release held keys
    let focus_targets: [(&web_sys::EventTarget, &str); 2] =
        [(window.as_ref(), "blur"), (document.as_ref(), "visibilitychange")];
    for (target, name) in focus_targets {
        let frame_loop = frame_loop.clone();
        let window = window.clone();
        let lost = Closure::wrap(Box::new(move |_e: Event| {
            frame_loop.borrow_mut().handle_input(InputEvent::FocusLost, now_secs(&window));
        }) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(name, lost.as_ref().unchecked_ref())?;
        lost.forget();
    }

    // Pointer lock change
    {
        let frame_loop = frame_loop.clone();
        let window = window.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            frame_loop
                .borrow_mut()
                .handle_input(InputEvent::PointerLockChanged { locked }, now_secs(&window));
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Canvas press enters pointer lock
    {
        let canvas_lock = canvas.clone();
        let mousedown = Closure::wrap(Box::new(move |_e: MouseEvent| {
            canvas_lock.request_pointer_lock();
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }

    // Mouse move
    {
        let frame_loop = frame_loop.clone();
        let window = window.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let event = web_input::mouse_move_to_input(e.movement_x() as f32, e.movement_y() as f32);
            frame_loop.borrow_mut().handle_input(event, now_secs(&window));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse up advances the camera tour
    {
        let window_for_time = window.clone();
        let mouseup = Closure::wrap(Box::new(move |_e: MouseEvent| {
            frame_loop
                .borrow_mut()
                .handle_input(InputEvent::PointerUp, now_secs(&window_for_time));
        }) as Box<dyn FnMut(MouseEvent)>);
        window.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
        mouseup.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn init_canvas(window: &Window, width: u32, height: u32) -> std::result::Result<(Document, HtmlCanvasElement), JsValue> {
    let document = window.document().ok_or_else(|| js_error("no document on window"))?;
    let body = document.body().ok_or_else(|| js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    canvas_el.set_width(width);
    canvas_el.set_height(height);
    body.append_child(&canvas_el)?;
    Ok((document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
    let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
    ((w as u32).max(1), (h as u32).max(1))
}

/// Wall-clock seconds from the page's performance timer.
#[cfg(target_arch = "wasm32")]
fn now_secs(window: &Window) -> f64 {
    window.performance().map(|p| p.now() / 1000.0).unwrap_or(0.0)
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// requestAnimationFrame loop; stops once the callback returns false.
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut() -> bool>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            if !inner.borrow_mut().as_mut()() {
                return;
            }
            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!("requestAnimationFrame failed: {e:?}");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            if let Err(e) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                tracing::error!("requestAnimationFrame failed: {e:?}");
            }
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}
