/// meshmend web - mount a mesh inspector into a page container
///
/// `mount` fetches the asset, runs the ingestion pipeline and wires a canvas,
/// five repair buttons and a log panel into the container. Each container is
/// initialized once; mounting again is a no-op until `unmount`.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, MouseEvent, WheelEvent};

use meshmend_core::{InitStatus, LoadFailure, Registry, RepairOp, Session};

mod canvas;
mod dom;
mod fetch;

use canvas::CanvasRenderer;
use dom::Panel;

/// Radians of orbit per dragged pixel.
const DRAG_SPEED: f32 = 0.01;
/// Dolly factor per wheel notch.
const WHEEL_ZOOM: f32 = 0.9;
/// Diagnostics entries shown in the log panel.
const LOG_ENTRIES: usize = 12;

type Listener = Closure<dyn FnMut(Event)>;

/// A mounted container's state.
enum Viewer {
    /// Waiting on the fetch started by mount number `mount`.
    Loading { panel: Panel, mount: u64 },
    /// Fatal load error; no render loop runs.
    Failed(Panel),
    Ready(Box<Live>),
}

impl Viewer {
    fn panel(&self) -> &Panel {
        match self {
            Viewer::Loading { panel, .. } | Viewer::Failed(panel) => panel,
            Viewer::Ready(live) => &live.panel,
        }
    }

    fn is_loading(&self, mount: u64) -> bool {
        matches!(self, Viewer::Loading { mount: m, .. } if *m == mount)
    }
}

/// Event handlers attached to a viewer's elements; dropping them detaches them.
#[derive(Default)]
struct Listeners(Vec<(web_sys::EventTarget, &'static str, Listener)>);

impl Listeners {
    fn listen(
        &mut self,
        target: &web_sys::EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let listener: Listener = Closure::new(handler);
        target.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())?;
        self.0.push((target.clone(), event, listener));
        Ok(())
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        for (target, event, listener) in &self.0 {
            let _ = target
                .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
        }
    }
}

struct Live {
    mount: u64,
    session: Session,
    renderer: CanvasRenderer,
    panel: Panel,
    drag: Option<(i32, i32)>,
    _listeners: Listeners,
}

impl Live {
    fn redraw_if_dirty(&mut self) {
        if self.session.take_dirty() {
            self.renderer.render(self.session.geometry(), self.session.view());
            self.panel.show_status(&self.session.status_lines(LOG_ENTRIES));
        }
    }
}

thread_local! {
    static VIEWERS: RefCell<Registry<Viewer>> = RefCell::new(Registry::new());
    static NEXT_MOUNT: Cell<u64> = const { Cell::new(0) };
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("meshmend: logger already set"));
    }
}

/// Mount a viewer for `src` into the element with id `container_id`.
#[wasm_bindgen]
pub async fn mount(container_id: String, src: String) -> Result<(), JsValue> {
    mount_with_options(container_id, src, None, None).await
}

/// Like `mount`, with an explicit canvas size.
#[wasm_bindgen(js_name = mountWithOptions)]
pub async fn mount_with_options(
    container_id: String,
    src: String,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<(), JsValue> {
    if VIEWERS.with(|v| v.borrow().contains(&container_id)) {
        info!("'{container_id}' already mounted");
        return Ok(());
    }

    let document = dom::document()?;
    let container = dom::container(&document, &container_id)?;
    let (width, height) = dom::canvas_size(&container, width, height);
    let panel = Panel::build(&document, &container, width, height)?;
    panel.show_status(&["Loading...".to_string()]);

    let mount = NEXT_MOUNT.with(|next| {
        let mount = next.get();
        next.set(mount + 1);
        mount
    });
    // Nothing awaits between the check above and here, so this always inserts.
    let status = VIEWERS.with(|v| {
        v.borrow_mut()
            .init_with(&container_id, || Viewer::Loading { panel, mount })
    });
    debug_assert_eq!(status, InitStatus::Initialized);

    let loaded = match fetch::fetch_bytes(&src).await {
        Ok(bytes) => Session::load(&bytes, None, width, height),
        Err(failure) => Err(failure),
    };

    // While the fetch was pending the container may have been unmounted, and
    // possibly mounted again by someone else. Only our own record is claimed.
    let claimed = VIEWERS.with(|v| {
        v.borrow_mut()
            .take_if(&container_id, |viewer| viewer.is_loading(mount))
    });
    let panel = match claimed {
        Some(Viewer::Loading { panel, .. }) => panel,
        _ => {
            warn!("'{container_id}' was unmounted during load; discarding it");
            return Ok(());
        }
    };

    match loaded {
        Ok(session) => start_viewer(&container_id, mount, panel, session),
        Err(failure) => {
            fail(&container_id, panel, failure);
            Ok(())
        }
    }
}

/// Tear down the viewer in `container_id` and remove its elements.
#[wasm_bindgen]
pub fn unmount(container_id: &str) -> bool {
    match VIEWERS.with(|v| v.borrow_mut().teardown(container_id)) {
        Some(viewer) => {
            viewer.panel().remove();
            info!("'{container_id}' unmounted");
            true
        }
        None => false,
    }
}

/// Apply a repair by trigger name, as the buttons do.
#[wasm_bindgen]
pub fn repair(container_id: &str, name: &str) -> Result<String, JsValue> {
    let op: RepairOp = name.parse().map_err(|e: meshmend_core::repair::UnknownRepair| {
        JsValue::from_str(&e.to_string())
    })?;
    with_live(container_id, |live| live.session.apply(op).message().to_string())
        .ok_or_else(|| JsValue::from_str(&format!("no live viewer in '{container_id}'")))
}

/// Park a claimed panel as an inert, failed viewer showing `lines`.
fn fail_with(container_id: &str, panel: Panel, lines: &[String]) {
    panel.show_status(lines);
    if let Err(e) = panel.disable_buttons() {
        warn!("could not disable buttons: {}", fetch::describe(&e));
    }
    VIEWERS.with(|v| {
        v.borrow_mut()
            .init_with(container_id, || Viewer::Failed(panel))
    });
}

fn fail(container_id: &str, panel: Panel, failure: LoadFailure) {
    error!("'{container_id}': {}", failure.error);
    let mut lines = failure.report.status_lines(LOG_ENTRIES);
    lines.push(format!("Error: {}", failure.error));
    fail_with(container_id, panel, &lines);
}

fn start_viewer(
    container_id: &str,
    mount: u64,
    panel: Panel,
    session: Session,
) -> Result<(), JsValue> {
    let (renderer, listeners) = match wire(container_id, &panel) {
        Ok(wired) => wired,
        Err(e) => {
            let message = fetch::describe(&e);
            error!("'{container_id}': viewer setup failed: {message}");
            let mut lines = session.status_lines(LOG_ENTRIES);
            lines.push(format!("Error: viewer setup failed: {message}"));
            fail_with(container_id, panel, &lines);
            return Err(e);
        }
    };

    let live = Live {
        mount,
        session,
        renderer,
        panel,
        drag: None,
        _listeners: listeners,
    };
    VIEWERS.with(|v| v.borrow_mut().init_with(container_id, || Viewer::Ready(Box::new(live))));
    info!("'{container_id}' ready");

    start_render_loop(container_id.to_string(), mount)
}

/// Create the renderer and attach every handler. Handlers attached before a
/// failure are detached again when `listeners` drops.
fn wire(container_id: &str, panel: &Panel) -> Result<(CanvasRenderer, Listeners), JsValue> {
    let renderer = CanvasRenderer::new(panel.canvas.clone())?;
    let mut listeners = Listeners::default();

    for (op, button) in &panel.buttons {
        let id = container_id.to_string();
        let op = *op;
        listeners.listen(button, "click", move |_| {
            with_live(&id, |live| {
                live.session.apply(op);
                live.session.mark_dirty();
            });
        })?;
    }

    let id = container_id.to_string();
    listeners.listen(&panel.canvas, "mousedown", move |event| {
        if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
            with_live(&id, |live| live.drag = Some((mouse.client_x(), mouse.client_y())));
        }
    })?;

    let id = container_id.to_string();
    listeners.listen(&panel.canvas, "mousemove", move |event| {
        if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
            with_live(&id, |live| {
                if let Some((x, y)) = live.drag {
                    let (nx, ny) = (mouse.client_x(), mouse.client_y());
                    live.session
                        .orbit((nx - x) as f32 * DRAG_SPEED, (ny - y) as f32 * DRAG_SPEED);
                    live.drag = Some((nx, ny));
                }
            });
        }
    })?;

    for event in ["mouseup", "mouseleave"] {
        let id = container_id.to_string();
        listeners.listen(&panel.canvas, event, move |_| {
            with_live(&id, |live| live.drag = None);
        })?;
    }

    let id = container_id.to_string();
    listeners.listen(&panel.canvas, "wheel", move |event| {
        if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
            event.prevent_default();
            let factor = if wheel.delta_y() > 0.0 {
                1.0 / WHEEL_ZOOM
            } else {
                WHEEL_ZOOM
            };
            with_live(&id, |live| live.session.zoom(factor));
        }
    })?;

    Ok((renderer, listeners))
}

/// requestAnimationFrame loop that redraws only dirty frames and stops once
/// the container is unmounted.
fn start_render_loop(container_id: String, mount: u64) -> Result<(), JsValue> {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = frame.clone();

    *frame.borrow_mut() = Some(Closure::new(move || {
        let drawn = with_live(&container_id, |live| {
            (live.mount == mount).then(|| live.redraw_if_dirty())
        });
        if drawn.flatten().is_none() {
            // Unmounted or remounted: drop our handle so the closure is freed.
            let _ = next.borrow_mut().take();
            return;
        }
        if let Some(callback) = next.borrow().as_ref() {
            if let Err(e) = request_frame(callback) {
                error!("render loop stopped: {}", fetch::describe(&e));
            }
        }
    }));

    if let Some(callback) = frame.borrow().as_ref() {
        request_frame(callback)?;
    }
    Ok(())
}

fn request_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window"))?
        .request_animation_frame(callback.as_ref().unchecked_ref())
}

fn with_live<R>(container_id: &str, f: impl FnOnce(&mut Live) -> R) -> Option<R> {
    VIEWERS.with(|v| match v.borrow_mut().get_mut(container_id) {
        Some(Viewer::Ready(live)) => Some(f(live)),
        _ => None,
    })
}

