//! Browser tests, run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const SPEC: &str = r#"[{ "name": "Point", "type": "struct", "fields": [
    { "name": "x", "type": "f32" }, { "name": "y", "type": "f32" }
] }]"#;

#[wasm_bindgen_test]
fn generate_object_with_default_request() {
    let result = wasmapi_wasm::generate_object(SPEC, JsValue::UNDEFINED).unwrap();
    let success = field(&result, "success");
    assert_eq!(success.as_bool(), Some(true));
}

#[wasm_bindgen_test]
fn generate_returns_json() {
    let json = wasmapi_wasm::generate(SPEC, r#"{"languages":["c11"]}"#);
    assert!(json.contains("\"c11\""));
}

fn field(obj: &JsValue, key: &str) -> JsValue {
    let value: serde_json::Value = serde_wasm_bindgen::from_value(obj.clone()).unwrap();
    serde_wasm_bindgen::to_value(&value[key]).unwrap()
}
