//! Browser bindings for the gradient descent visualizer core.

mod session;

pub use session::WasmSession;

use anyhow::{anyhow, Result};
use descent_core::Mode;
use wasm_bindgen::prelude::*;

pub(crate) fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub(crate) fn parse_mode(name: &str) -> Result<Mode> {
    name.parse::<Mode>().map_err(|err| anyhow!(err))
}
