//! Layout error types.

use thiserror::Error;
use wasmapi_types::SchemaError;

/// Errors that abort layout computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Structural problem in the input collection (unknown type, by-value
    /// cycle, padding combined with auto-packing, ...).
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A type names an alignment strategy that was never registered.
    #[error("unknown alignment strategy `{strategy}` requested by `{type_name}`")]
    UnknownAlignStrategy { type_name: String, strategy: String },

    /// A size or offset does not fit the 32-bit address space.
    #[error("layout of `{type_name}` exceeds the 32-bit address space")]
    Overflow { type_name: String },

    /// A referenced type had no layout yet when it was needed.
    #[error("type `{0}` was used before its layout was computed")]
    Unresolved(String),
}

/// Layout result type alias.
pub type LayoutResult<T> = Result<T, LayoutError>;
