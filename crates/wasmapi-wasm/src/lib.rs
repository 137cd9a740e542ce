//! wasmapi bindgen as a WASM module for browser environments.
//!
//! This crate exposes the bindgen pipeline via `wasm-bindgen`, so that
//! editors and web-based build tools can generate bindings without a native
//! toolchain.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { generate } from 'wasmapi-wasm';
//!
//! await init();
//!
//! const result = JSON.parse(generate(specJson, '{"languages":["ts","zig"]}'));
//! // { success: true, outputs: { ts: "...", zig: "..." }, types: [...], diagnostics: [], spec_hash: "..." }
//! ```

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasmapi_bindgen::{BindgenDiagnostic, BindgenRequest, BindgenResult, Stage};
use wasmapi_codegen::GeneratorRegistry;

/// Run the pipeline over a JSON type spec.
///
/// `request_json` is a `BindgenRequest` (`{ languages, opts }`); an empty
/// string selects the defaults. Returns a JSON `BindgenResult`. A malformed
/// request is reported as a parse diagnostic, never as an exception.
#[wasm_bindgen]
pub fn generate(spec_json: &str, request_json: &str) -> String {
    let result = match parse_request(request_json) {
        Ok(request) => wasmapi_bindgen::bindgen(spec_json, &request),
        Err(message) => BindgenResult::rejected(
            spec_json,
            BindgenDiagnostic {
                stage: Stage::Parse,
                lang: None,
                message,
            },
        ),
    };
    to_json(&result)
}

/// Like [`generate`], but takes and returns plain JS objects.
#[wasm_bindgen(js_name = generateObject)]
pub fn generate_object(spec_json: &str, request: JsValue) -> Result<JsValue, JsValue> {
    let request: BindgenRequest = if request.is_undefined() || request.is_null() {
        BindgenRequest::default()
    } else {
        serde_wasm_bindgen::from_value(request)?
    };
    let result = wasmapi_bindgen::bindgen(spec_json, &request);
    Ok(result.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
}

/// Ids of the built-in generators, as a JSON array.
#[wasm_bindgen]
pub fn languages() -> String {
    let ids: Vec<&str> = GeneratorRegistry::with_defaults().ids().collect();
    to_json(&ids)
}

/// Return the bindgen version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_request(request_json: &str) -> Result<BindgenRequest, String> {
    if request_json.trim().is_empty() {
        return Ok(BindgenRequest::default());
    }
    serde_json::from_str(request_json).map_err(|e| format!("invalid request: {e}"))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(
            r#"{{"success":false,"outputs":{{}},"types":[],"diagnostics":[{{"stage":"parse","message":"Serialization error: {}"}}],"spec_hash":""}}"#,
            e
        )
    })
}
