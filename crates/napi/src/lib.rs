#![deny(missing_docs)]
//! Node.js bindings that surface lessonmark's Rust implementation.

use lessonmark_core::{Options, Renderer};
use napi_derive::napi;

/// Returns the version string reported by the core crate.
#[napi]
pub fn version() -> String {
    lessonmark_core::version().to_string()
}

/// Renders lesson content into an HTML string.
///
/// `options_json` is an optional JSON document in the shape of the core
/// `Options`; missing fields keep their defaults.
#[napi]
pub fn render_html(input: String, options_json: Option<String>) -> napi::Result<String> {
    renderer(options_json)?
        .render_html(&input)
        .map_err(to_napi_error)
}

/// Renders lesson content into the JSON form of its document tree.
#[napi]
pub fn render_tree(input: String, options_json: Option<String>) -> napi::Result<String> {
    renderer(options_json)?
        .render(&input)
        .to_json()
        .map_err(to_napi_error)
}

fn renderer(options_json: Option<String>) -> napi::Result<Renderer> {
    let options = match options_json {
        Some(json) => Options::from_json(&json).map_err(to_napi_error)?,
        None => Options::default(),
    };
    Ok(Renderer::new(options))
}

fn to_napi_error<E: ToString>(err: E) -> napi::Error {
    napi::Error::from_reason(err.to_string())
}
