/// Per-container DOM scaffolding: log panel, repair buttons and canvas
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlCanvasElement, HtmlElement};

use meshmend_core::RepairOp;

/// Canvas size used when neither the caller nor the container gives one.
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 500;

pub fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

pub fn container(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id '{id}'")))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("element '{id}' is not an HTML element")))
}

/// Requested size, else the container's size, else the default.
pub fn canvas_size(container: &HtmlElement, width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let measured = |v: i32, fallback: u32| u32::try_from(v).ok().filter(|&v| v > 0).unwrap_or(fallback);
    (
        width.unwrap_or_else(|| measured(container.client_width(), DEFAULT_WIDTH)),
        height.unwrap_or_else(|| measured(container.client_height(), DEFAULT_HEIGHT)),
    )
}

/// Elements created inside one container.
pub struct Panel {
    pub root: HtmlElement,
    pub log: HtmlElement,
    pub canvas: HtmlCanvasElement,
    pub buttons: Vec<(RepairOp, HtmlElement)>,
}

impl Panel {
    pub fn build(
        document: &Document,
        container: &HtmlElement,
        width: u32,
        height: u32,
    ) -> Result<Self, JsValue> {
        let root = create(document, "div")?;
        root.set_class_name("meshmend");

        let toolbar = create(document, "div")?;
        toolbar.set_class_name("meshmend-toolbar");
        let mut buttons = Vec::with_capacity(RepairOp::ALL.len());
        for op in RepairOp::ALL {
            let button = create(document, "button")?;
            button.set_attribute("type", "button")?;
            button.set_attribute("data-repair", op.name())?;
            button.set_text_content(Some(op.label()));
            toolbar.append_child(&button)?;
            buttons.push((op, button));
        }

        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_width(width);
        canvas.set_height(height);
        canvas.style().set_property("display", "block")?;
        canvas.style().set_property("cursor", "grab")?;

        let log = create(document, "pre")?;
        log.set_class_name("meshmend-log");
        let style = log.style();
        style.set_property("font", "12px monospace")?;
        style.set_property("max-height", "10em")?;
        style.set_property("overflow", "auto")?;
        style.set_property("margin", "0")?;

        root.append_child(&toolbar)?;
        root.append_child(&canvas)?;
        root.append_child(&log)?;
        container.append_child(&root)?;

        Ok(Self {
            root,
            log,
            canvas,
            buttons,
        })
    }

    pub fn show_status(&self, lines: &[String]) {
        self.log.set_text_content(Some(&lines.join("\n")));
    }

    /// Grey out the controls once the viewer has failed.
    pub fn disable_buttons(&self) -> Result<(), JsValue> {
        for (_, button) in &self.buttons {
            button.set_attribute("disabled", "")?;
        }
        Ok(())
    }

    pub fn remove(&self) {
        self.root.remove();
    }
}

fn create(document: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    let element: Element = document.create_element(tag)?;
    element
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("<{tag}> is not an HTML element")))
}
