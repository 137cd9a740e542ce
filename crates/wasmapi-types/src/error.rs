//! Structural schema errors.
//!
//! All of these are fatal: they are raised before any layout is computed or
//! any code is generated, and a collection that produced one must not be
//! used further.

use thiserror::Error;

/// Errors detected while building or validating a type collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A field (or enum tag, or funcptr arg) names a type that does not exist.
    #[error("unknown type `{name}` referenced by `{referenced_by}`")]
    UnknownType { name: String, referenced_by: String },

    /// A type embeds itself by value, directly or through other types.
    #[error("cyclic by-value embedding: {}", path.join(" -> "))]
    CyclicLayout { path: Vec<String> },

    /// An auto-packed struct declares explicit padding fields.
    #[error("struct `{type_name}` uses auto-packing but declares padding field #{field_index}")]
    PaddingConflict { type_name: String, field_index: usize },

    /// Two types in one collection share a name.
    #[error("duplicate type name `{0}`")]
    DuplicateType(String),

    /// A field violates one of the per-field rules.
    #[error("invalid field `{type_name}.{field}`: {reason}")]
    InvalidField {
        type_name: String,
        field: String,
        reason: String,
    },

    /// An enum declaration is malformed.
    #[error("invalid enum `{type_name}`: {reason}")]
    InvalidEnum { type_name: String, reason: String },

    /// The JSON type spec could not be parsed.
    #[error("failed to parse type spec: {0}")]
    Parse(String),
}

impl SchemaError {
    pub(crate) fn invalid_field(
        type_name: &str,
        field: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            type_name: type_name.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
