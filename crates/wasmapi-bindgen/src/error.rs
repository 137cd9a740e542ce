//! Pipeline errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasmapi_codegen::CodegenError;
use wasmapi_layout::LayoutError;
use wasmapi_types::SchemaError;

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parse,
    Validate,
    Layout,
    Generate,
}

#[derive(Debug, Error)]
pub enum BindgenError {
    #[error("invalid type spec: {0}")]
    Parse(SchemaError),

    #[error(transparent)]
    Validate(SchemaError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("{lang}: {source}")]
    Generate {
        lang: String,
        #[source]
        source: CodegenError,
    },
}

impl BindgenError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Parse(_) => Stage::Parse,
            Self::Validate(_) => Stage::Validate,
            Self::Layout(_) => Stage::Layout,
            Self::Generate { .. } => Stage::Generate,
        }
    }
}

pub type PipelineResult<T> = Result<T, BindgenError>;
