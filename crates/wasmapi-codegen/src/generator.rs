//! The generator interface, the generator registry and the driver loop.

use std::collections::BTreeMap;

use wasmapi_types::{Enum, FuncPointer, Lines, Struct, TopLevelType, TypeCollection, Union};

use crate::c11::C11;
use crate::error::{CodegenError, CodegenResult};
use crate::opts::CodeGenOpts;
use crate::typescript::TypeScript;
use crate::zig::Zig;

/// Version string written into generated headers.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

// ══════════════════════════════════════════════════════════════════════════════
// CodeGen trait
// ══════════════════════════════════════════════════════════════════════════════

/// One target language.
///
/// Implementations only translate computed layouts into source text; they
/// never change sizes, offsets or alignments. Every method appends to `out`.
/// Output must depend on nothing but the collection and options.
pub trait CodeGen: Send + Sync {
    /// Language id, as used in `skip` lists and `body` maps.
    fn id(&self) -> &'static str;

    /// Prelude emitted before any type.
    fn pre(&self, _coll: &TypeCollection, _opts: &CodeGenOpts, _out: &mut String) -> CodegenResult<()> {
        Ok(())
    }

    /// Epilogue emitted after all types.
    fn post(&self, _coll: &TypeCollection, _opts: &CodeGenOpts, _out: &mut String) -> CodegenResult<()> {
        Ok(())
    }

    /// The "do not edit" header at the top of the output.
    fn emit_header(&self, text: &str, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        self.emit_doc(&Lines::from(text), "", opts, true, out)
    }

    /// Doc comment at the given indentation. `top_level` marks type-level
    /// docs (and the header) as opposed to field or value docs.
    fn emit_doc(
        &self,
        doc: &Lines,
        indent: &str,
        opts: &CodeGenOpts,
        top_level: bool,
        out: &mut String,
    ) -> CodegenResult<()>;

    fn emit_enum(&self, ty: &Enum, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()>;

    fn emit_struct(&self, ty: &Struct, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()>;

    fn emit_union(&self, ty: &Union, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()>;

    fn emit_funcptr(
        &self,
        ty: &FuncPointer,
        coll: &TypeCollection,
        opts: &CodeGenOpts,
        out: &mut String,
    ) -> CodegenResult<()>;
}

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

/// Generators keyed by language id.
///
/// Constructed explicitly and passed to the generation entry points; there
/// is no process-wide list.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn CodeGen>>,
}

impl GeneratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `ts`, `zig` and `c11` generators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TypeScript::default()));
        registry.register(Box::new(Zig));
        registry.register(Box::new(C11));
        registry
    }

    /// Add a generator, replacing any previous one with the same id.
    pub fn register(&mut self, generator: Box<dyn CodeGen>) -> Option<Box<dyn CodeGen>> {
        self.generators.insert(generator.id(), generator)
    }

    pub fn get(&self, id: &str) -> Option<&dyn CodeGen> {
        self.generators.get(id).map(|g| &**g)
    }

    /// Registered language ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    /// Generate source for the language `id`.
    pub fn generate(&self, id: &str, coll: &TypeCollection, opts: &CodeGenOpts) -> CodegenResult<String> {
        let generator = self
            .get(id)
            .ok_or_else(|| CodegenError::UnknownGenerator(id.to_string()))?;
        generate_types(generator, coll, opts)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Driver
// ══════════════════════════════════════════════════════════════════════════════

/// Run `generator` over a laid-out collection, in declaration order.
///
/// Types listing the generator's id in `skip` are left out. Fails with
/// [`CodegenError::NotLaidOut`] if layout has not been computed, and with
/// [`CodegenError::LayoutMismatch`] if it was computed for another target.
pub fn generate_types(generator: &dyn CodeGen, coll: &TypeCollection, opts: &CodeGenOpts) -> CodegenResult<String> {
    if let Some(ty) = coll.iter().find(|t| !t.info().is_laid_out()) {
        return Err(CodegenError::NotLaidOut(ty.name().to_string()));
    }
    let expected = opts.layout_target();
    if let Some(found) = coll.layout_target().filter(|found| *found != expected) {
        return Err(CodegenError::LayoutMismatch { expected, found });
    }

    let mut out = String::new();
    if opts.header {
        let header = format!("Generated by wasmapi-codegen v{GENERATOR_VERSION} - DO NOT EDIT!");
        generator.emit_header(&header, opts, &mut out)?;
        out.push('\n');
    }
    generator.pre(coll, opts, &mut out)?;
    if let Some(pre) = &opts.pre {
        push_block(&mut out, pre);
    }

    let id = generator.id();
    for ty in coll.iter().filter(|t| !t.meta().skips(id)) {
        let before = out.len();
        match ty {
            TopLevelType::Enum(e) => generator.emit_enum(e, coll, opts, &mut out)?,
            TopLevelType::Struct(s) => generator.emit_struct(s, coll, opts, &mut out)?,
            TopLevelType::Union(u) => generator.emit_union(u, coll, opts, &mut out)?,
            TopLevelType::Funcptr(f) => generator.emit_funcptr(f, coll, opts, &mut out)?,
        }
        if out.len() > before {
            out.push('\n');
        }
    }

    if let Some(post) = &opts.post {
        push_block(&mut out, post);
    }
    generator.post(coll, opts, &mut out)?;
    Ok(out)
}

/// Append user text followed by a blank line.
fn push_block(out: &mut String, text: &str) {
    out.push_str(text.trim_end());
    out.push_str("\n\n");
}
