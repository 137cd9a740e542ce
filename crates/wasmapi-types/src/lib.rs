//! Shared types for the wasmapi type bridge.
//!
//! This crate defines the schema model used to describe binary data layouts
//! shared between a host and a WebAssembly guest (structs, unions, enums,
//! function pointers), the WASM target descriptions, and the structural
//! errors raised while validating a [`TypeCollection`].
//!
//! Nothing here computes layouts. Sizes, offsets and alignments live in
//! [`TypeInfo`] slots which only the layout engine fills in.

mod collection;
mod error;
pub mod schema;
mod target;

pub use collection::TypeCollection;
pub use error::SchemaError;
pub use schema::{
    BaseType, DefaultValue, Enum, EnumValue, Field, FieldTag, FuncArg, FuncPointer, FuncReturn,
    InjectedBody, Lines, Literal, Primitive, Struct, StructTag, TopLevelType, TypeInfo, TypeKind,
    TypeMeta, Union,
};
pub use target::{LayoutTarget, StringType, WasmTarget, WASM32, WASM64};

/// Result type used throughout the schema model.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Field name prefix reserved for generated/internal members.
pub const RESERVED_PREFIX: &str = "__";
