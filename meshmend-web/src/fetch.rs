/// Asset download through the browser's fetch API
use js_sys::Uint8Array;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use meshmend_core::LoadFailure;

/// Download `src` and return its body. The only await point of a mount.
pub async fn fetch_bytes(src: &str) -> Result<Vec<u8>, LoadFailure> {
    let window = web_sys::window().ok_or_else(|| LoadFailure::transport("no window"))?;

    let response = JsFuture::from(window.fetch_with_str(src))
        .await
        .map_err(|e| LoadFailure::transport(describe(&e)))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| LoadFailure::transport("fetch did not return a Response"))?;

    if !response.ok() {
        return Err(LoadFailure::transport(format!(
            "HTTP {} {}",
            response.status(),
            response.status_text()
        )));
    }

    let buffer = response
        .array_buffer()
        .map_err(|e| LoadFailure::transport(describe(&e)))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| LoadFailure::transport(describe(&e)))?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

/// Best-effort text for a rejected promise.
pub fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
