//! Code generator options.

use serde::{Deserialize, Serialize};
use wasmapi_layout::LayoutOptions;
use wasmapi_types::{LayoutTarget, StringType, WasmTarget};

/// Options shared by all generators.
///
/// Deserializes from the camelCase keys used by JSON build configs; every
/// key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeGenOpts {
    /// WASM target (pointer width).
    pub target: WasmTarget,
    /// How `string` fields are stored on the WASM side.
    pub string_type: StringType,
    /// Upper-case enum identifiers (ignored by Zig).
    pub uppercase_enums: bool,
    /// Prefix the output with a "do not edit" header comment.
    pub header: bool,
    /// Emit size/alignment/offset checks where the language supports them.
    pub debug: bool,
    /// Target line width for wrapped doc comments.
    pub line_width: usize,
    /// Source injected before the generated types (after the prelude).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
    /// Source injected after the generated types (before the epilogue).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

impl Default for CodeGenOpts {
    fn default() -> Self {
        Self {
            target: WasmTarget::default(),
            string_type: StringType::default(),
            uppercase_enums: true,
            header: true,
            debug: false,
            line_width: 80,
            pre: None,
            post: None,
        }
    }
}

impl CodeGenOpts {
    /// Layout options matching these generator options, so laid-out types
    /// agree with what the generators assume about pointers and strings.
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions::new(self.target).with_string_type(self.string_type)
    }

    /// Target the generators assume the collection was laid out for.
    pub fn layout_target(&self) -> LayoutTarget {
        LayoutTarget {
            target: self.target,
            string_type: self.string_type,
        }
    }
}
