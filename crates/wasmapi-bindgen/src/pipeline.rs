//! Pipeline driver and its serializable result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use wasmapi_codegen::{CodeGenOpts, CodegenError, GeneratorRegistry};
use wasmapi_layout::compute_layout;
use wasmapi_types::TypeCollection;

use crate::error::{BindgenError, PipelineResult, Stage};

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindgenRequest {
    /// Generator ids, e.g. `["ts", "zig"]`.
    pub languages: Vec<String>,
    pub opts: CodeGenOpts,
}

impl Default for BindgenRequest {
    fn default() -> Self {
        Self {
            languages: vec!["ts".to_string()],
            opts: CodeGenOpts::default(),
        }
    }
}

impl BindgenRequest {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            opts: CodeGenOpts::default(),
        }
    }

    pub fn with_opts(mut self, opts: CodeGenOpts) -> Self {
        self.opts = opts;
        self
    }
}

/// One structured error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindgenDiagnostic {
    pub stage: Stage,
    /// Generator id, for generation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    pub message: String,
}

impl From<&BindgenError> for BindgenDiagnostic {
    fn from(err: &BindgenError) -> Self {
        let (lang, message) = match err {
            BindgenError::Generate { lang, source } => (Some(lang.clone()), source.to_string()),
            other => (None, other.to_string()),
        };
        Self {
            stage: err.stage(),
            lang,
            message,
        }
    }
}

/// Computed layout of one type, for tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub name: String,
    pub kind: String,
    pub size: u32,
    pub align: u32,
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindgenResult {
    /// `true` when every requested language was generated.
    pub success: bool,
    /// Generator id → source text, for the languages that succeeded.
    pub outputs: BTreeMap<String, String>,
    pub types: Vec<TypeSummary>,
    pub diagnostics: Vec<BindgenDiagnostic>,
    /// Hex SHA-256 of the input spec.
    pub spec_hash: String,
}

impl BindgenResult {
    /// A failed run that produced nothing.
    pub fn rejected(spec_json: &str, diagnostic: BindgenDiagnostic) -> Self {
        Self {
            success: false,
            outputs: BTreeMap::new(),
            types: Vec::new(),
            diagnostics: vec![diagnostic],
            spec_hash: spec_hash(spec_json),
        }
    }

    pub fn output(&self, lang: &str) -> Option<&str> {
        self.outputs.get(lang).map(String::as_str)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Stages
// ══════════════════════════════════════════════════════════════════════════════

/// Hex SHA-256 of a spec source.
pub fn spec_hash(spec_json: &str) -> String {
    format!("{:x}", Sha256::digest(spec_json.as_bytes()))
}

/// Parse, validate and lay out a JSON type spec.
pub fn layout_spec(spec_json: &str, opts: &CodeGenOpts) -> PipelineResult<TypeCollection> {
    let coll = TypeCollection::from_json(spec_json).map_err(BindgenError::Parse)?;
    debug!(target: "wasmapi::bindgen", types = coll.len(), "parsed spec");
    coll.validate().map_err(BindgenError::Validate)?;
    let laid_out = compute_layout(coll, &opts.layout_options())?;
    debug!(target: "wasmapi::bindgen", target_bits = opts.target.bits(), "layout computed");
    Ok(laid_out)
}

/// Run the full pipeline with the built-in generators.
pub fn bindgen(spec_json: &str, request: &BindgenRequest) -> BindgenResult {
    bindgen_with(&GeneratorRegistry::with_defaults(), spec_json, request)
}

/// Run the full pipeline with a caller-supplied generator registry.
///
/// Structural errors stop the run. Generation errors are collected per
/// language and do not prevent other languages from being generated.
pub fn bindgen_with(registry: &GeneratorRegistry, spec_json: &str, request: &BindgenRequest) -> BindgenResult {
    let coll = match layout_spec(spec_json, &request.opts) {
        Ok(coll) => coll,
        Err(err) => {
            warn!(target: "wasmapi::bindgen", stage = ?err.stage(), %err, "pipeline stopped");
            return BindgenResult::rejected(spec_json, BindgenDiagnostic::from(&err));
        }
    };

    let mut outputs = BTreeMap::new();
    let mut diagnostics = Vec::new();
    for lang in &request.languages {
        match generate(registry, &coll, lang, &request.opts) {
            Ok(src) => {
                debug!(target: "wasmapi::bindgen", %lang, bytes = src.len(), "generated");
                outputs.insert(lang.clone(), src);
            }
            Err(err) => {
                warn!(target: "wasmapi::bindgen", %lang, %err, "generation failed");
                diagnostics.push(BindgenDiagnostic::from(&err));
            }
        }
    }

    info!(
        target: "wasmapi::bindgen",
        languages = outputs.len(),
        errors = diagnostics.len(),
        "bindgen finished"
    );
    BindgenResult {
        success: diagnostics.is_empty(),
        outputs,
        types: summarize(&coll),
        diagnostics,
        spec_hash: spec_hash(spec_json),
    }
}

fn generate(registry: &GeneratorRegistry, coll: &TypeCollection, lang: &str, opts: &CodeGenOpts) -> PipelineResult<String> {
    registry
        .generate(lang, coll, opts)
        .map_err(|source: CodegenError| BindgenError::Generate {
            lang: lang.to_string(),
            source,
        })
}

fn summarize(coll: &TypeCollection) -> Vec<TypeSummary> {
    coll.iter()
        .map(|ty| TypeSummary {
            name: ty.name().to_string(),
            kind: ty.kind().as_str().to_string(),
            size: ty.info().size.unwrap_or(0),
            align: ty.info().align.unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let h = spec_hash("[]");
        assert_eq!(h.len(), 64);
        assert_eq!(h, spec_hash("[]"));
        assert_ne!(h, spec_hash("[ ]"));
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn request_defaults() {
        let req: BindgenRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, BindgenRequest::default());
        let req: BindgenRequest =
            serde_json::from_str(r#"{"languages":["zig","c11"],"opts":{"debug":true}}"#).unwrap();
        assert_eq!(req.languages, ["zig", "c11"]);
        assert!(req.opts.debug);
        assert!(req.opts.header);
    }
}
