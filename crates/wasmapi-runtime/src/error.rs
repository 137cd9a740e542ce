//! Runtime errors.
//!
//! Memory errors ([`BridgeError::OutOfMemory`], [`BridgeError::BufferTooSmall`],
//! [`BridgeError::OutOfBounds`]) are recoverable and never leave the bridge
//! in a modified state. Initialization errors are fatal to the bridge.

use thiserror::Error;
use wasmapi_types::LayoutTarget;

/// Errors raised by [`WasmBridge`](crate::WasmBridge) operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The guest allocator returned 0, or the guest exports no allocator.
    #[error("out of memory: guest could not allocate {requested} bytes")]
    OutOfMemory { requested: u32 },

    /// An encoded string (plus terminator) does not fit the destination.
    #[error("buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall { required: u32, available: u32 },

    #[error("memory access out of bounds: {len} bytes at {addr:#x}")]
    OutOfBounds { addr: u32, len: u32 },

    #[error("invalid UTF-8 in string at {addr:#x}")]
    InvalidUtf8 { addr: u32 },

    #[error("guest does not export `{0}`")]
    MissingExport(String),

    #[error("growing memory by {pages} pages failed: {reason}")]
    GrowFailed { pages: u32, reason: String },

    #[error("defining import `{name}` failed: {reason}")]
    Link { name: String, reason: String },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("type `{0}` has no computed layout")]
    NotLaidOut(String),

    /// The collection was laid out for a target other than wasm32.
    #[error("types were laid out for {0}, memory is addressed as wasm32")]
    UnsupportedTarget(LayoutTarget),

    #[error("`{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("`{type_name}.{field}` is not {expected}")]
    TypeMismatch {
        type_name: String,
        field: String,
        expected: String,
    },

    #[error(transparent)]
    Initialization(#[from] InitError),

    #[error(transparent)]
    Wasm(#[from] wasmi::Error),
}

/// Child API registration and initialization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// A module's `init` resolved to `false`. Later modules were not run.
    #[error("child API `{id}` failed to initialize")]
    ModuleFailed { id: String },

    #[error("import `{name}` of `{second}` collides with `{first}`")]
    ImportCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("child API `{0}` is already registered")]
    DuplicateApi(String),

    #[error("child API `{id}` depends on unregistered `{dependency}`")]
    UnknownDependency { id: String, dependency: String },

    #[error("dependency cycle between child APIs: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
