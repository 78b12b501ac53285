use js_sys::Function;
use lessonmark_core::{Options, Renderer};
use std::io::{self, Write};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

/// Renders lesson content into an HTML `String`.
#[wasm_bindgen(js_name = render_html)]
pub fn render_html(input: &str, options_json: Option<String>) -> Result<String, JsError> {
    renderer(options_json)?.render_html(input).map_err(to_js_error)
}

/// Renders lesson content into the JSON form of its document tree.
#[wasm_bindgen(js_name = render_tree)]
pub fn render_tree(input: &str, options_json: Option<String>) -> Result<String, JsError> {
    renderer(options_json)?
        .render(input)
        .to_json()
        .map_err(to_js_error)
}

/// Streams rendered HTML chunks into the provided JavaScript callback.
///
/// The callback is invoked with each UTF-8 chunk produced by the streaming
/// rewriter, so callers can forward output to a `WritableStream`, append to the
/// DOM incrementally, or buffer it manually.
#[wasm_bindgen(js_name = stream_html)]
pub fn stream_html(
    input: &str,
    chunk_callback: &Function,
    options_json: Option<String>,
) -> Result<(), JsError> {
    let writer = JsChunkWriter::new(chunk_callback.clone());
    renderer(options_json)?
        .render_to_writer(input, writer)
        .map_err(to_js_error)?;
    Ok(())
}

/// Returns the version string reported by the core crate.
#[wasm_bindgen]
pub fn version() -> String {
    lessonmark_core::version().to_string()
}

fn renderer(options_json: Option<String>) -> Result<Renderer, JsError> {
    let options = match options_json {
        Some(json) => Options::from_json(&json).map_err(to_js_error)?,
        None => Options::default(),
    };
    Ok(Renderer::new(options))
}

fn to_js_error<E: ToString>(err: E) -> JsError {
    JsError::new(&err.to_string())
}

struct JsChunkWriter {
    callback: Function,
}

impl JsChunkWriter {
    fn new(callback: Function) -> Self {
        Self { callback }
    }
}

impl Write for JsChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = std::str::from_utf8(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        self.callback
            .call1(&JsValue::UNDEFINED, &JsValue::from_str(chunk))
            .map_err(js_callback_error)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn js_callback_error(err: JsValue) -> io::Error {
    let message = err
        .as_string()
        .or_else(|| {
            js_sys::JSON::stringify(&err)
                .ok()
                .and_then(|s| s.as_string())
        })
        .unwrap_or_else(|| "callback threw".to_string());
    io::Error::other(message)
}
