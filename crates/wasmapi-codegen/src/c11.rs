//! C11 generator.
//!
//! Emits a header with forward `typedef`s for every struct, union and enum
//! (so declaration order never matters for pointers), explicit padding
//! members for `pad` fields, and `_Static_assert` layout checks in debug
//! mode. Slices become anonymous `{ ptr, len }` structs.
//!
//! C has no SIMD vector fields and no portable 64-bit enums; both are
//! refused.

use std::fmt::Write;

use wasmapi_types::{
    Enum, Field, FieldTag, FuncPointer, FuncReturn, Lines, Primitive, StringType, Struct, StructTag,
    TopLevelType, TypeCollection, TypeMeta, Union,
};

use crate::doc::block_comment;
use crate::error::{CodegenError, CodegenResult};
use crate::generator::CodeGen;
use crate::opts::CodeGenOpts;
use crate::util::{
    enum_ident, field_layout, injected_decl, injected_impl, inject, is_packed, pad_name, resolve, type_layout,
    Resolved,
};

const LANG: &str = "c11";

/// C11 header generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct C11;

impl CodeGen for C11 {
    fn id(&self) -> &'static str {
        LANG
    }

    fn pre(&self, coll: &TypeCollection, _opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        writeln!(out, "#pragma once")?;
        out.push('\n');
        writeln!(out, "#include <stddef.h>")?;
        writeln!(out, "#include <stdint.h>")?;
        out.push('\n');
        writeln!(out, "#ifdef __cplusplus\nextern \"C\" {{\n#endif")?;
        out.push('\n');

        let mut any = false;
        for ty in coll.iter().filter(|t| !t.meta().skips(LANG)) {
            match ty {
                TopLevelType::Struct(s) => writeln!(out, "typedef struct {0} {0};", s.meta.name)?,
                TopLevelType::Union(u) => writeln!(out, "typedef union {0} {0};", u.meta.name)?,
                TopLevelType::Enum(e) => writeln!(out, "typedef {} {};", c_prim(e.tag), e.meta.name)?,
                TopLevelType::Funcptr(_) => continue,
            }
            any = true;
        }
        if any {
            out.push('\n');
        }
        Ok(())
    }

    fn post(&self, _coll: &TypeCollection, _opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        writeln!(out, "#ifdef __cplusplus\n}}\n#endif")?;
        Ok(())
    }

    fn emit_doc(&self, doc: &Lines, indent: &str, opts: &CodeGenOpts, _top_level: bool, out: &mut String) -> CodegenResult<()> {
        block_comment(out, doc, indent, opts.line_width)
    }

    fn emit_enum(&self, ty: &Enum, _coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        let name = &ty.meta.name;
        if ty.tag.is_bigint() {
            return Err(CodegenError::unsupported(LANG, name, "64-bit enum tags"));
        }
        if let Some(doc) = &ty.meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        writeln!(out, "enum {{")?;
        for (value, n) in ty.resolved_values() {
            if let Some(doc) = &value.doc {
                self.emit_doc(&Lines::from(doc.as_str()), "\t", opts, false, out)?;
            }
            let ident = enum_ident(&format!("{name}_{}", value.name), opts.uppercase_enums);
            writeln!(out, "\t{ident} = {n},")?;
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
        let name = &ty.meta.name;
        if let Some(doc) = &ty.meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        let mut args = Vec::with_capacity(ty.args.len());
        for arg in &ty.args {
            args.push(declaration(coll, &arg.to_field(), &arg.name, name, opts)?);
        }
        if args.is_empty() {
            args.push("void".to_string());
        }
        let ret = match &ty.rtype {
            FuncReturn::Void => "void".to_string(),
            FuncReturn::Value(arg) => declaration(coll, &arg.to_field(), "", name, opts)?,
        };
        writeln!(out, "typedef {} (*{name})({});", ret.trim_end(), args.join(", "))?;
        Ok(())
    }
}

impl C11 {
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
        let attr = if is_packed(LANG, name, tag, align)? {
            " __attribute__((packed))"
        } else {
            ""
        };

        if let Some(doc) = &meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        writeln!(out, "{kind}{attr} {name} {{")?;
        let mut pads = 0;
        for field in fields {
            if field.is_pad() {
                writeln!(out, "\tuint8_t {}[{}];", pad_name(pads), field.pad.unwrap_or(0))?;
                pads += 1;
                continue;
            }
            if let Some(doc) = &field.doc {
                self.emit_doc(doc, "\t", opts, false, out)?;
            }
            writeln!(out, "\t{};", declaration(coll, field, &field.name, name, opts)?)?;
        }
        if let Some(src) = injected_decl(&meta.body, LANG) {
            out.push('\n');
            inject(out, src, "\t")?;
        }
        writeln!(out, "}};")?;

        if opts.debug {
            let (size, align) = type_layout(name, &meta.info)?;
            out.push('\n');
            writeln!(out, "_Static_assert(sizeof({name}) == {size}, \"{name} size\");")?;
            writeln!(out, "_Static_assert(_Alignof({name}) == {align}, \"{name} align\");")?;
            for field in fields.iter().filter(|f| !f.is_pad()) {
                let (offset, _) = field_layout(name, field)?;
                writeln!(
                    out,
                    "_Static_assert(offsetof({name}, {0}) == {offset}, \"{name}.{0} offset\");",
                    field.name
                )?;
            }
        }
        if let Some(src) = injected_impl(&meta.body, LANG) {
            out.push('\n');
            inject(out, src, "")?;
        }
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Declarations
// ══════════════════════════════════════════════════════════════════════════════

fn c_prim(prim: Primitive) -> &'static str {
    match prim {
        Primitive::I8 => "int8_t",
        Primitive::U8 => "uint8_t",
        Primitive::I16 => "int16_t",
        Primitive::U16 => "uint16_t",
        Primitive::I32 => "int32_t",
        Primitive::U32 => "uint32_t",
        Primitive::I64 => "int64_t",
        Primitive::U64 => "uint64_t",
        Primitive::F32 => "float",
        Primitive::F64 => "double",
    }
}

/// C declaration `type name[suffix]` for a field or argument. `name` may be
/// empty for abstract declarators (return types).
fn declaration(
    coll: &TypeCollection,
    field: &Field,
    name: &str,
    type_name: &str,
    opts: &CodeGenOpts,
) -> CodegenResult<String> {
    let resolved = resolve(coll, &field.base, &opts.target)?;
    let constness = if field.is_const_qualified() { "const " } else { "" };
    let base = match resolved {
        Resolved::Prim(p) => c_prim(p).to_string(),
        Resolved::String => match opts.string_type {
            StringType::Ptr => "const char*".to_string(),
            StringType::Slice => "struct { const char* ptr; size_t len; }".to_string(),
        },
        Resolved::Opaque => format!("{constness}void*"),
        Resolved::Enum(e) => e.meta.name.clone(),
        Resolved::FuncPtr(f) => f.meta.name.clone(),
        Resolved::Aggregate(t) => t.name().to_string(),
    };
    let opaque = matches!(resolved, Resolved::Opaque);

    let decl = match field.tag {
        FieldTag::Scalar => format!("{base} {name}"),
        FieldTag::Ptr if opaque => format!("{base} {name}"),
        FieldTag::Ptr => format!("{constness}{base}* {name}"),
        FieldTag::Slice if opaque => format!("struct {{ {base}* ptr; size_t len; }} {name}"),
        FieldTag::Slice => format!("struct {{ {constness}{base}* ptr; size_t len; }} {name}"),
        FieldTag::Array => format!("{base} {name}[{}]", field.storage_len()),
        FieldTag::Vec => {
            return Err(CodegenError::unsupported(
                LANG,
                type_name,
                format!("vector field `{}`", field.name),
            ))
        }
    };
    Ok(decl)
}
