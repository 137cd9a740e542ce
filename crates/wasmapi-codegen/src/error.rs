//! Codegen error types.

use std::fmt;

use thiserror::Error;
use wasmapi_types::LayoutTarget;

/// Errors that can occur while emitting type definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// The target language cannot express a construct used by the schema.
    #[error("{lang}: unsupported feature in `{type_name}`: {reason}")]
    Unsupported {
        lang: &'static str,
        type_name: String,
        reason: String,
    },

    /// A type (or field) reached a generator without layout annotations.
    #[error("type `{0}` has no computed layout")]
    NotLaidOut(String),

    /// The collection was laid out for a different target or string
    /// representation than the generator options describe.
    #[error("types were laid out for {found}, generator options target {expected}")]
    LayoutMismatch {
        expected: LayoutTarget,
        found: LayoutTarget,
    },

    /// No generator is registered under the requested language id.
    #[error("unknown generator `{0}`")]
    UnknownGenerator(String),

    /// Writing to the output buffer failed.
    #[error("formatting failed")]
    Fmt(#[from] fmt::Error),
}

impl CodegenError {
    pub(crate) fn unsupported(lang: &'static str, type_name: &str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            lang,
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
