//! Zig generator.
//!
//! Structs and unions are emitted as `extern` containers so the Zig compiler
//! reproduces the computed layout. Byte-packed types keep `extern` and mark
//! every field `align(1)`; Zig's own `packed` containers are bit-packed and
//! cannot hold pointers or arrays. Zig can express every field shape:
//! optional and const pointers, sentinel arrays and slices, SIMD vectors and
//! default values.

use std::fmt::Write;

use wasmapi_types::{
    BaseType, Enum, Field, FieldTag, FuncPointer, FuncReturn, Lines, StringType, Struct, StructTag,
    TypeCollection, TypeMeta, Union,
};

use crate::doc::line_comment;
use crate::error::CodegenResult;
use crate::generator::CodeGen;
use crate::opts::CodeGenOpts;
use crate::util::{
    field_layout, injected_decl, injected_impl, inject, is_packed, pad_name, resolve, type_layout, Resolved,
};

const LANG: &str = "zig";
const INDENT: &str = "    ";

/// Zig generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zig;

impl CodeGen for Zig {
    fn id(&self) -> &'static str {
        LANG
    }

    fn pre(&self, _coll: &TypeCollection, _opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        writeln!(out, "const std = @import(\"std\");")?;
        writeln!(out, "const wasm = @import(\"wasmapi\");")?;
        out.push('\n');
        Ok(())
    }

    fn emit_header(&self, text: &str, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        line_comment(out, &Lines::from(text), "", "//!", opts.line_width)
    }

    fn emit_doc(&self, doc: &Lines, indent: &str, opts: &CodeGenOpts, _top_level: bool, out: &mut String) -> CodegenResult<()> {
        line_comment(out, doc, indent, "///", opts.line_width)
    }

    fn emit_enum(&self, ty: &Enum, _coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        if let Some(doc) = &ty.meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        writeln!(out, "pub const {} = enum({}) {{", ty.meta.name, ty.tag)?;
        for value in &ty.values {
            if let Some(doc) = &value.doc {
                self.emit_doc(&Lines::from(doc.as_str()), INDENT, opts, false, out)?;
            }
            match value.value {
                Some(n) => writeln!(out, "{INDENT}{} = {n},", value.name)?,
                None => writeln!(out, "{INDENT}{},", value.name)?,
            }
        }
        writeln!(out, "}};")?;
        Ok(())
    }

    fn emit_struct(&self, ty: &Struct, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        self.emit_aggregate("struct", &ty.meta, &ty.fields, ty.tag, ty.align.as_deref(), coll, opts, out)
    }

    fn emit_union(&self, ty: &Union, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        self.emit_aggregate("union", &ty.meta, &ty.fields, ty.tag, ty.align.as_deref(), coll, opts, out)
    }

    fn emit_funcptr(&self, ty: &FuncPointer, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        if let Some(doc) = &ty.meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        let mut args = Vec::with_capacity(ty.args.len());
        for arg in &ty.args {
            args.push(format!("{}: {}", arg.name, field_type(coll, &arg.to_field(), opts)?));
        }
        let ret = match &ty.rtype {
            FuncReturn::Void => "void".to_string(),
            FuncReturn::Value(arg) => field_type(coll, &arg.to_field(), opts)?,
        };
        writeln!(
            out,
            "pub const {} = *const fn ({}) callconv(.C) {ret};",
            ty.meta.name,
            args.join(", ")
        )?;
        Ok(())
    }
}

impl Zig {
    #[allow(clippy::too_many_arguments)]
    fn emit_aggregate(
        &self,
        kind: &str,
        meta: &TypeMeta,
        fields: &[Field],
        tag: Option<StructTag>,
        align: Option<&str>,
        coll: &TypeCollection,
        opts: &CodeGenOpts,
        out: &mut String,
    ) -> CodegenResult<()> {
        let name = &meta.name;
        let field_align = if is_packed(LANG, name, tag, align)? { " align(1)" } else { "" };

        if let Some(doc) = &meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        writeln!(out, "pub const {name} = extern {kind} {{")?;
        let mut pads = 0;
        for field in fields {
            if field.is_pad() {
                writeln!(out, "{INDENT}{}: [{}]u8,", pad_name(pads), field.pad.unwrap_or(0))?;
                pads += 1;
                continue;
            }
            if let Some(doc) = &field.doc {
                self.emit_doc(doc, INDENT, opts, false, out)?;
            }
            let ty = field_type(coll, field, opts)?;
            match field.default.as_ref().and_then(|d| d.for_lang(LANG)) {
                Some(value) => writeln!(out, "{INDENT}{}: {ty}{field_align} = {value},", field.name)?,
                None => writeln!(out, "{INDENT}{}: {ty}{field_align},", field.name)?,
            }
        }
        if let Some(src) = injected_decl(&meta.body, LANG) {
            out.push('\n');
            inject(out, src, INDENT)?;
        }
        writeln!(out, "}};")?;

        if opts.debug {
            let (size, align) = type_layout(name, &meta.info)?;
            out.push('\n');
            writeln!(out, "comptime {{")?;
            writeln!(out, "{INDENT}std.debug.assert(@sizeOf({name}) == {size});")?;
            writeln!(out, "{INDENT}std.debug.assert(@alignOf({name}) == {align});")?;
            for field in fields.iter().filter(|f| !f.is_pad()) {
                let (offset, _) = field_layout(name, field)?;
                writeln!(
                    out,
                    "{INDENT}std.debug.assert(@offsetOf({name}, \"{}\") == {offset});",
                    field.name
                )?;
            }
            writeln!(out, "}}")?;
        }
        if let Some(src) = injected_impl(&meta.body, LANG) {
            out.push('\n');
            inject(out, src, "")?;
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Field types
// ══════════════════════════════════════════════════════════════════════════════

/// Zig type expression for a field (or funcptr argument).
fn field_type(coll: &TypeCollection, field: &Field, opts: &CodeGenOpts) -> CodegenResult<String> {
    let resolved = resolve(coll, &field.base, &opts.target)?;
    let opt = if field.optional { "?" } else { "" };
    let constness = if field.is_const_qualified() { "const " } else { "" };
    let sentinel = field.sentinel.map(|s| format!(":{s}")).unwrap_or_default();
    let opaque = matches!(resolved, Resolved::Opaque);

    Ok(match field.tag {
        FieldTag::Scalar if opaque => format!("{opt}*{constness}anyopaque"),
        FieldTag::Scalar => format!("{opt}{}", base_type(&field.base, resolved, opts)),
        FieldTag::Ptr if opaque => format!("{opt}*{constness}anyopaque"),
        FieldTag::Ptr => format!("{opt}*{constness}{}", base_type(&field.base, resolved, opts)),
        FieldTag::Slice => format!("{opt}[{sentinel}]{constness}{}", base_type(&field.base, resolved, opts)),
        FieldTag::Array => format!("[{}{sentinel}]{}", field.len.unwrap_or(0), base_type(&field.base, resolved, opts)),
        FieldTag::Vec => format!("@Vector({}, {})", field.len.unwrap_or(0), base_type(&field.base, resolved, opts)),
    })
}

/// Element type for a base, before field qualifiers are applied.
fn base_type(base: &BaseType, resolved: Resolved<'_>, opts: &CodeGenOpts) -> String {
    match (base, resolved) {
        (BaseType::Isize, _) => "isize".to_string(),
        (BaseType::Usize, _) => "usize".to_string(),
        (_, Resolved::Prim(p)) => p.to_string(),
        (_, Resolved::String) => match opts.string_type {
            StringType::Slice => "[:0]const u8".to_string(),
            StringType::Ptr => "[*:0]const u8".to_string(),
        },
        (_, Resolved::Opaque) => "*anyopaque".to_string(),
        (_, Resolved::Enum(e)) => e.meta.name.clone(),
        (_, Resolved::FuncPtr(f)) => f.meta.name.clone(),
        (_, Resolved::Aggregate(t)) => t.name().to_string(),
    }
}
