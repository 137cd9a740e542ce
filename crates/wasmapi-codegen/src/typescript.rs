//! TypeScript generator.
//!
//! Every struct and union becomes an interface plus a `$Name`
//! `WasmTypeConstructor`: given the bridge's typed memory views it exposes
//! `align`, `size` and `instance(base)`, where `instance` returns an object
//! whose getters and setters read and write fields at `base + offset`.
//!
//! Pointer-like fields (`ptr`, `opaque`, function pointers) are exposed as
//! raw addresses, slices as `[addr, len]` pairs. Function pointer types
//! themselves produce no output.
//!
//! Typed views only index naturally aligned cells, so numbers and slices in
//! under-aligned (packed) positions go through a little-endian `DataView`.
//! Arrays, strings and nested types at such positions are refused.

use std::fmt::Write;

use wasmapi_types::{
    Enum, Field, FieldTag, FuncPointer, Lines, Primitive, StringType, Struct, TypeCollection, TypeMeta,
    Union, WasmTarget,
};

use crate::doc::block_comment;
use crate::error::{CodegenError, CodegenResult};
use crate::generator::CodeGen;
use crate::opts::CodeGenOpts;
use crate::util::{enum_ident, field_layout, injected_decl, injected_impl, inject, resolve, type_layout, Resolved};

const LANG: &str = "ts";

/// TypeScript generator.
#[derive(Debug, Clone)]
pub struct TypeScript {
    /// Module the runtime support types are imported from.
    pub import_path: String,
}

impl Default for TypeScript {
    fn default() -> Self {
        Self {
            import_path: "@wasmapi/bridge".to_string(),
        }
    }
}

impl CodeGen for TypeScript {
    fn id(&self) -> &'static str {
        LANG
    }

    fn pre(&self, _coll: &TypeCollection, _opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        writeln!(out, "// @ts-ignore possibly includes unused imports")?;
        writeln!(
            out,
            "import {{ MemorySlice, WasmStringPtr, WasmStringSlice, type WasmTypeBase, type WasmTypeConstructor }} from {:?};",
            self.import_path
        )?;
        out.push('\n');
        Ok(())
    }

    fn emit_doc(&self, doc: &Lines, indent: &str, opts: &CodeGenOpts, _top_level: bool, out: &mut String) -> CodegenResult<()> {
        block_comment(out, doc, indent, opts.line_width)
    }

    fn emit_enum(&self, ty: &Enum, _coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        if ty.tag.is_bigint() {
            return Err(CodegenError::unsupported(
                LANG,
                &ty.meta.name,
                "64-bit enum tags (bigint enums)",
            ));
        }
        if let Some(doc) = &ty.meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        writeln!(out, "export enum {} {{", ty.meta.name)?;
        for value in &ty.values {
            if let Some(doc) = &value.doc {
                self.emit_doc(&Lines::from(doc.as_str()), "\t", opts, false, out)?;
            }
            let ident = enum_ident(&value.name, opts.uppercase_enums);
            match value.value {
                Some(n) => writeln!(out, "\t{ident} = {n},")?,
                None => writeln!(out, "\t{ident},")?,
            }
        }
        writeln!(out, "}}")?;
        Ok(())
    }

    fn emit_struct(&self, ty: &Struct, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        self.emit_aggregate(&ty.meta, &ty.fields, coll, opts, out)
    }

    fn emit_union(&self, ty: &Union, coll: &TypeCollection, opts: &CodeGenOpts, out: &mut String) -> CodegenResult<()> {
        self.emit_aggregate(&ty.meta, &ty.fields, coll, opts, out)
    }

    fn emit_funcptr(&self, _: &FuncPointer, _: &TypeCollection, _: &CodeGenOpts, _: &mut String) -> CodegenResult<()> {
        Ok(())
    }
}

/// One generated property: TS type, getter statements, optional setter.
struct Accessor {
    ty: String,
    get: Vec<String>,
    set: Vec<String>,
}

impl TypeScript {
    fn emit_aggregate(
        &self,
        meta: &TypeMeta,
        fields: &[Field],
        coll: &TypeCollection,
        opts: &CodeGenOpts,
        out: &mut String,
    ) -> CodegenResult<()> {
        let name = &meta.name;
        let (size, align) = type_layout(name, &meta.info)?;
        let mut accessors = Vec::new();
        for field in fields.iter().filter(|f| !f.is_pad()) {
            let (offset, _) = field_layout(name, field)?;
            accessors.push((field, accessor(coll, name, field, offset, opts)?));
        }

        // interface
        if let Some(doc) = &meta.doc {
            self.emit_doc(doc, "", opts, true, out)?;
        }
        writeln!(out, "export interface {name} extends WasmTypeBase {{")?;
        for (field, acc) in &accessors {
            if let Some(doc) = &field.doc {
                self.emit_doc(doc, "\t", opts, false, out)?;
            }
            let readonly = if acc.set.is_empty() { "readonly " } else { "" };
            writeln!(out, "\t{readonly}{}: {};", field.name, acc.ty)?;
        }
        if let Some(src) = injected_decl(&meta.body, LANG) {
            inject(out, src, "\t")?;
        }
        writeln!(out, "}}")?;
        out.push('\n');

        // constructor
        writeln!(out, "export const ${name}: WasmTypeConstructor<{name}> = (mem) => ({{")?;
        writeln!(out, "\tget align() {{\n\t\treturn {align};\n\t}},")?;
        writeln!(out, "\tget size() {{\n\t\treturn {size};\n\t}},")?;
        writeln!(out, "\tinstance: (base) => {{")?;
        writeln!(out, "\t\treturn {{")?;
        writeln!(out, "\t\t\tget __base() {{\n\t\t\t\treturn base;\n\t\t\t}},")?;
        writeln!(
            out,
            "\t\t\tget __bytes() {{\n\t\t\t\treturn mem.u8.subarray(base, base + {size});\n\t\t\t}},"
        )?;
        for (field, acc) in &accessors {
            writeln!(out, "\t\t\tget {}(): {} {{", field.name, acc.ty)?;
            for stmt in &acc.get {
                writeln!(out, "\t\t\t\t{stmt}")?;
            }
            writeln!(out, "\t\t\t}},")?;
            if !acc.set.is_empty() {
                writeln!(out, "\t\t\tset {}(x: {}) {{", field.name, acc.ty)?;
                for stmt in &acc.set {
                    writeln!(out, "\t\t\t\t{stmt}")?;
                }
                writeln!(out, "\t\t\t}},")?;
            }
        }
        if let Some(src) = injected_impl(&meta.body, LANG) {
            inject(out, src, "\t\t\t")?;
        }
        writeln!(out, "\t\t}};")?;
        writeln!(out, "\t}}")?;
        writeln!(out, "}});")?;
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Field accessors
// ══════════════════════════════════════════════════════════════════════════════

fn accessor(
    coll: &TypeCollection,
    type_name: &str,
    field: &Field,
    offset: u32,
    opts: &CodeGenOpts,
) -> CodegenResult<Accessor> {
    let target = &opts.target;
    let addr = offset_expr(offset);
    let resolved = resolve(coll, &field.base, target)?;
    let misaligned = |what: &str| {
        CodegenError::unsupported(
            LANG,
            type_name,
            format!("{what} `{}` at under-aligned offset {offset}", field.name),
        )
    };
    Ok(match field.tag {
        FieldTag::Ptr => number(field, target.usize, offset),
        FieldTag::Slice if view_aligned(field, offset, target.size_bytes) => slice_cell(target, offset),
        FieldTag::Slice => slice_view(target, offset),
        FieldTag::Scalar => match resolved {
            Resolved::Prim(p) => number(field, p, offset),
            Resolved::Enum(e) => {
                let mut acc = number(field, e.tag, offset);
                acc.ty = e.meta.name.clone();
                acc
            }
            Resolved::Opaque | Resolved::FuncPtr(_) => number(field, target.usize, offset),
            Resolved::Aggregate(t) => {
                let (_, align) = type_layout(t.name(), t.info())?;
                if !view_aligned(field, offset, align) {
                    return Err(misaligned("nested type"));
                }
                Accessor {
                    ty: t.name().to_string(),
                    get: vec![format!("return ${}(mem).instance({addr});", t.name())],
                    set: vec![format!("mem.u8.set(x.__bytes, {addr});")],
                }
            }
            Resolved::String => {
                if !view_aligned(field, offset, target.size_bytes) {
                    return Err(misaligned("string"));
                }
                let class = string_class(opts.string_type);
                Accessor {
                    ty: class.to_string(),
                    get: vec![format!(
                        "return new {class}(mem, {addr}, {});",
                        field.is_const_qualified()
                    )],
                    set: Vec::new(),
                }
            }
        },
        FieldTag::Array | FieldTag::Vec => {
            let len = field.len.unwrap_or(0);
            let elem = match resolved {
                Resolved::Prim(p) => Some(p),
                Resolved::Enum(e) => Some(e.tag),
                Resolved::Opaque | Resolved::FuncPtr(_) => Some(target.usize),
                Resolved::Aggregate(_) | Resolved::String => None,
            };
            match (elem, resolved) {
                (Some(p), _) if !view_aligned(field, offset, p.size_bytes()) => return Err(misaligned("array")),
                (Some(p), _) => typed_array(p, offset, len),
                (None, Resolved::Aggregate(t)) => {
                    let (size, align) = type_layout(t.name(), t.info())?;
                    if !view_aligned(field, offset, align) {
                        return Err(misaligned("array"));
                    }
                    let name = t.name();
                    object_array(
                        name,
                        &format!("inst.instance(addr + i * {size})"),
                        &addr,
                        len,
                        Some(format!("const inst = ${name}(mem);")),
                    )
                }
                (None, _) => {
                    if !view_aligned(field, offset, target.size_bytes) {
                        return Err(misaligned("array"));
                    }
                    let class = string_class(opts.string_type);
                    let width = opts.string_type.size_bytes(target);
                    object_array(
                        class,
                        &format!("new {class}(mem, addr + i * {width}, {})", field.is_const_qualified()),
                        &addr,
                        len,
                        None,
                    )
                }
            }
        }
    })
}

/// Whether a cell needing `align` bytes of alignment may be read through a
/// typed view. Assumes the instance base meets the type's own alignment.
fn view_aligned(field: &Field, offset: u32, align: u32) -> bool {
    let align = align.max(1);
    offset % align == 0 && field.info.align.is_none_or(|a| a >= align)
}

fn string_class(string_type: StringType) -> &'static str {
    match string_type {
        StringType::Slice => "WasmStringSlice",
        StringType::Ptr => "WasmStringPtr",
    }
}

/// `base` or `base + offset`.
fn offset_expr(offset: u32) -> String {
    if offset == 0 {
        "base".to_string()
    } else {
        format!("base + {offset}")
    }
}

/// Index into the typed view for `prim` at byte `offset`.
fn index_expr(prim: Primitive, offset: u32) -> String {
    let shift = prim.size_bytes().trailing_zeros();
    match (offset, shift) {
        (_, 0) => offset_expr(offset),
        (0, s) => format!("base >>> {s}"),
        (o, s) => format!("(base + {o}) >>> {s}"),
    }
}

fn number_type(prim: Primitive) -> &'static str {
    if prim.is_bigint() {
        "bigint"
    } else {
        "number"
    }
}

fn typed_array_class(prim: Primitive) -> &'static str {
    match prim {
        Primitive::I8 => "Int8Array",
        Primitive::U8 => "Uint8Array",
        Primitive::I16 => "Int16Array",
        Primitive::U16 => "Uint16Array",
        Primitive::I32 => "Int32Array",
        Primitive::U32 => "Uint32Array",
        Primitive::I64 => "BigInt64Array",
        Primitive::U64 => "BigUint64Array",
        Primitive::F32 => "Float32Array",
        Primitive::F64 => "Float64Array",
    }
}

/// `DataView` accessor suffix for `prim`.
fn data_view_method(prim: Primitive) -> &'static str {
    match prim {
        Primitive::I8 => "Int8",
        Primitive::U8 => "Uint8",
        Primitive::I16 => "Int16",
        Primitive::U16 => "Uint16",
        Primitive::I32 => "Int32",
        Primitive::U32 => "Uint32",
        Primitive::I64 => "BigInt64",
        Primitive::U64 => "BigUint64",
        Primitive::F32 => "Float32",
        Primitive::F64 => "Float64",
    }
}

const DATA_VIEW: &str = "new DataView(mem.u8.buffer)";

fn number(field: &Field, prim: Primitive, offset: u32) -> Accessor {
    if view_aligned(field, offset, prim.size_bytes()) {
        number_cell(prim, offset)
    } else {
        number_view(prim, offset)
    }
}

fn number_view(prim: Primitive, offset: u32) -> Accessor {
    let method = data_view_method(prim);
    let addr = offset_expr(offset);
    Accessor {
        ty: number_type(prim).to_string(),
        get: vec![format!("return {DATA_VIEW}.get{method}({addr}, true);")],
        set: vec![format!("{DATA_VIEW}.set{method}({addr}, x, true);")],
    }
}

fn number_cell(prim: Primitive, offset: u32) -> Accessor {
    let cell = format!("mem.{prim}[{}]", index_expr(prim, offset));
    Accessor {
        ty: number_type(prim).to_string(),
        get: vec![format!("return {cell};")],
        set: vec![format!("{cell} = x;")],
    }
}

fn slice_cell(target: &WasmTarget, offset: u32) -> Accessor {
    let prim = target.usize;
    let ptr = format!("mem.{prim}[{}]", index_expr(prim, offset));
    let len = format!("mem.{prim}[{}]", index_expr(prim, offset + target.size_bytes));
    if prim.is_bigint() {
        Accessor {
            ty: "MemorySlice".to_string(),
            get: vec![format!("return [Number({ptr}), Number({len})];")],
            set: vec![format!("{ptr} = BigInt(x[0]);"), format!("{len} = BigInt(x[1]);")],
        }
    } else {
        Accessor {
            ty: "MemorySlice".to_string(),
            get: vec![format!("return [{ptr}, {len}];")],
            set: vec![format!("{ptr} = x[0];"), format!("{len} = x[1];")],
        }
    }
}

fn slice_view(target: &WasmTarget, offset: u32) -> Accessor {
    let method = data_view_method(target.usize);
    let ptr = offset_expr(offset);
    let len = offset_expr(offset + target.size_bytes);
    let view = format!("const view = {DATA_VIEW};");
    let (read, write) = if target.usize.is_bigint() {
        (("Number(", ")"), ("BigInt(", ")"))
    } else {
        (("", ""), ("", ""))
    };
    Accessor {
        ty: "MemorySlice".to_string(),
        get: vec![
            view.clone(),
            format!(
                "return [{0}view.get{method}({ptr}, true){1}, {0}view.get{method}({len}, true){1}];",
                read.0, read.1
            ),
        ],
        set: vec![
            view,
            format!("view.set{method}({ptr}, {}x[0]{}, true);", write.0, write.1),
            format!("view.set{method}({len}, {}x[1]{}, true);", write.0, write.1),
        ],
    }
}

fn typed_array(prim: Primitive, offset: u32, len: u32) -> Accessor {
    Accessor {
        ty: typed_array_class(prim).to_string(),
        get: vec![
            format!("const addr = {};", index_expr(prim, offset)),
            format!("return mem.{prim}.subarray(addr, addr + {len});"),
        ],
        set: Vec::new(),
    }
}

fn object_array(elem_ty: &str, make: &str, addr: &str, len: u32, setup: Option<String>) -> Accessor {
    let mut get = vec![format!("const addr = {addr};")];
    get.extend(setup);
    get.push(format!("const items: {elem_ty}[] = [];"));
    get.push(format!("for (let i = 0; i < {len}; i++) items.push({make});"));
    get.push("return items;".to_string());
    Accessor {
        ty: format!("{elem_ty}[]"),
        get,
        set: Vec::new(),
    }
}
