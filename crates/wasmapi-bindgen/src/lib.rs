//! wasmapi bindgen: the build-time pipeline.
//!
//! ```text
//! JSON spec → parse → validate → layout → generate (per language) → BindgenResult
//! ```
//!
//! Structural errors (parse, validate, layout) stop the pipeline before any
//! source is generated. Generator refusals are reported per language. The
//! result is serializable so that build tools and the browser package can
//! consume it as JSON.

mod error;
mod pipeline;

pub use error::{BindgenError, PipelineResult, Stage};
pub use pipeline::{
    bindgen, bindgen_with, layout_spec, spec_hash, BindgenDiagnostic, BindgenRequest, BindgenResult,
    TypeSummary,
};
