//! Helpers shared by the generators.

use std::fmt::Write;

use wasmapi_layout::{strategy_name, STRATEGY_C, STRATEGY_PACKED};
use wasmapi_types::{
    BaseType, Enum, Field, FuncPointer, InjectedBody, Lines, Primitive, StructTag, TopLevelType,
    TypeCollection, TypeInfo, WasmTarget,
};

use crate::error::{CodegenError, CodegenResult};

/// A field base type resolved against the collection.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Resolved<'a> {
    /// Numeric primitive (`isize`/`usize` already mapped to the target).
    Prim(Primitive),
    String,
    Opaque,
    Enum(&'a Enum),
    /// Struct or union.
    Aggregate(&'a TopLevelType),
    FuncPtr(&'a FuncPointer),
}

pub(crate) fn resolve<'a>(
    coll: &'a TypeCollection,
    base: &BaseType,
    target: &WasmTarget,
) -> CodegenResult<Resolved<'a>> {
    Ok(match base {
        BaseType::Prim(p) => Resolved::Prim(*p),
        BaseType::Isize => Resolved::Prim(target.isize),
        BaseType::Usize => Resolved::Prim(target.usize),
        BaseType::String => Resolved::String,
        BaseType::Opaque => Resolved::Opaque,
        BaseType::Named(name) => match coll.get(name) {
            Some(TopLevelType::Enum(e)) => Resolved::Enum(e),
            Some(TopLevelType::Funcptr(f)) => Resolved::FuncPtr(f),
            Some(ty) => Resolved::Aggregate(ty),
            None => return Err(CodegenError::NotLaidOut(name.clone())),
        },
    })
}

/// `(offset, size)` of a laid-out field.
pub(crate) fn field_layout(type_name: &str, field: &Field) -> CodegenResult<(u32, u32)> {
    match (field.info.offset, field.info.size) {
        (Some(offset), Some(size)) => Ok((offset, size)),
        _ => Err(CodegenError::NotLaidOut(format!("{type_name}.{}", field.name))),
    }
}

/// `(size, align)` of a laid-out type.
pub(crate) fn type_layout(name: &str, info: &TypeInfo) -> CodegenResult<(u32, u32)> {
    match (info.size, info.align) {
        (Some(size), Some(align)) => Ok((size, align)),
        _ => Err(CodegenError::NotLaidOut(name.to_string())),
    }
}

/// Whether an aggregate was laid out byte-packed, resolving `tag` and
/// `align` the same way the layout engine does. Strategies other than the
/// two built-ins have no native spelling and are refused.
pub(crate) fn is_packed(
    lang: &'static str,
    type_name: &str,
    tag: Option<StructTag>,
    align: Option<&str>,
) -> CodegenResult<bool> {
    match strategy_name(align, tag) {
        STRATEGY_PACKED => Ok(true),
        STRATEGY_C => Ok(false),
        other => Err(CodegenError::unsupported(
            lang,
            type_name,
            format!("custom alignment strategy `{other}`"),
        )),
    }
}

/// Enum value identifier under the case convention.
pub(crate) fn enum_ident(name: &str, uppercase: bool) -> String {
    if uppercase {
        name.to_uppercase()
    } else {
        name.to_string()
    }
}

/// Lines of user source, re-indented.
pub(crate) fn inject(out: &mut String, src: &Lines, indent: &str) -> CodegenResult<()> {
    for line in src.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            writeln!(out, "{indent}{line}")?;
        }
    }
    Ok(())
}

/// Declaration-part source injected for `lang`, if any.
pub(crate) fn injected_decl<'a>(body: &'a std::collections::BTreeMap<String, InjectedBody>, lang: &str) -> Option<&'a Lines> {
    body.get(lang).and_then(InjectedBody::decl)
}

/// Implementation-part source injected for `lang`, if any.
pub(crate) fn injected_impl<'a>(body: &'a std::collections::BTreeMap<String, InjectedBody>, lang: &str) -> Option<&'a Lines> {
    body.get(lang).and_then(InjectedBody::imp)
}

/// Name for the `n`th generated padding member.
pub(crate) fn pad_name(n: usize) -> String {
    format!("{}pad{n}", wasmapi_types::RESERVED_PREFIX)
}
