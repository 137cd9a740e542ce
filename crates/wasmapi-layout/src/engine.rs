//! Layout computation.
//!
//! Types are laid out in by-value dependency order: a struct or union is
//! processed only after every aggregate it embeds by value (scalar or array
//! fields). Pointer, slice and `opaque` references never create a dependency
//! since they only need the pointer width, so self-referential lists through
//! pointers are legal while by-value self-embedding is a `CyclicLayout` error.

use std::collections::HashMap;
use std::sync::Arc;

use wasmapi_types::{
    BaseType, Field, FieldTag, LayoutTarget, SchemaError, StringType, StructTag, TopLevelType,
    TypeCollection, TypeInfo, TypeKind, WasmTarget,
};

use crate::align::{AlignC, AlignPacked, AlignStrategy, FieldShape};
use crate::error::{LayoutError, LayoutResult};

/// Name of the built-in C-compatible strategy.
pub const STRATEGY_C: &str = "c";
/// Name of the built-in byte-packed strategy.
pub const STRATEGY_PACKED: &str = "packed";

/// Name of the strategy a struct or union is laid out with. An explicit
/// `align` attribute wins over the `packed` tag.
pub fn strategy_name(explicit: Option<&str>, tag: Option<StructTag>) -> &str {
    explicit.unwrap_or(match tag {
        Some(StructTag::Packed) => STRATEGY_PACKED,
        _ => STRATEGY_C,
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════════════════════

/// Per-run layout configuration.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub target: WasmTarget,
    pub string_type: StringType,
    strategies: HashMap<String, Arc<dyn AlignStrategy>>,
}

impl LayoutOptions {
    /// Options for `target` with slice strings and the built-in strategies
    /// (`"c"`, `"packed"`).
    pub fn new(target: WasmTarget) -> Self {
        let mut strategies: HashMap<String, Arc<dyn AlignStrategy>> = HashMap::new();
        strategies.insert(STRATEGY_C.to_string(), Arc::new(AlignC));
        strategies.insert(STRATEGY_PACKED.to_string(), Arc::new(AlignPacked));
        Self {
            target,
            string_type: StringType::default(),
            strategies,
        }
    }

    pub fn with_string_type(mut self, string_type: StringType) -> Self {
        self.string_type = string_type;
        self
    }

    /// Register a named strategy, referenced from a type's `align` attribute.
    /// Target and string representation annotations are computed for.
    pub fn layout_target(&self) -> LayoutTarget {
        LayoutTarget {
            target: self.target,
            string_type: self.string_type,
        }
    }

    pub fn with_strategy(mut self, name: impl Into<String>, strategy: impl AlignStrategy + 'static) -> Self {
        self.strategies.insert(name.into(), Arc::new(strategy));
        self
    }

    fn strategy_for(
        &self,
        type_name: &str,
        explicit: Option<&str>,
        tag: Option<StructTag>,
    ) -> LayoutResult<&dyn AlignStrategy> {
        let name = strategy_name(explicit, tag);
        self.strategies
            .get(name)
            .map(|s| &**s)
            .ok_or_else(|| LayoutError::UnknownAlignStrategy {
                type_name: type_name.to_string(),
                strategy: name.to_string(),
            })
    }
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::new(WasmTarget::default())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry point
// ══════════════════════════════════════════════════════════════════════════════

/// Validate `coll` and annotate every type and field with its layout.
///
/// Auto-packed structs have their fields reordered in place. On error the
/// collection is dropped: structural errors are never partially recovered.
pub fn compute_layout(mut coll: TypeCollection, opts: &LayoutOptions) -> LayoutResult<TypeCollection> {
    coll.validate()?;
    for idx in layout_order(&coll)? {
        let computed = layout_type(&coll, idx, opts)?;
        apply(&mut coll, idx, computed);
    }
    coll.set_layout_target(opts.layout_target());
    Ok(coll)
}

/// Layout of one type, computed against the read-only collection.
struct Computed {
    info: TypeInfo,
    /// `(original field index, field info)` in final field order.
    fields: Vec<(usize, TypeInfo)>,
}

fn apply(coll: &mut TypeCollection, idx: usize, computed: Computed) {
    let Some(ty) = coll.get_index_mut(idx) else {
        return;
    };
    ty.meta_mut().info = computed.info;
    if let Some(fields) = ty.fields_mut() {
        let mut old: Vec<Option<Field>> = fields.drain(..).map(Some).collect();
        for (src, info) in computed.fields {
            if let Some(mut field) = old[src].take() {
                field.info = info;
                fields.push(field);
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Dependency order
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Visiting,
    Done,
}

/// Indices of aggregates embedded by value in `ty`.
fn by_value_deps(coll: &TypeCollection, ty: &TopLevelType) -> Vec<usize> {
    let Some(fields) = ty.fields() else {
        return Vec::new();
    };
    fields
        .iter()
        .filter(|f| !f.is_pad() && matches!(f.tag, FieldTag::Scalar | FieldTag::Array))
        .filter_map(|f| f.base.named())
        .filter_map(|name| coll.index_of(name))
        .filter(|&dep| {
            coll.get_index(dep)
                .is_some_and(|t| matches!(t.kind(), TypeKind::Struct | TypeKind::Union))
        })
        .collect()
}

fn layout_order(coll: &TypeCollection) -> LayoutResult<Vec<usize>> {
    let mut marks = vec![Mark::New; coll.len()];
    let mut order = Vec::with_capacity(coll.len());
    let mut stack = Vec::new();
    for idx in 0..coll.len() {
        visit(coll, idx, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

fn visit(
    coll: &TypeCollection,
    idx: usize,
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> LayoutResult<()> {
    match marks[idx] {
        Mark::Done => return Ok(()),
        Mark::Visiting => {
            let start = stack.iter().position(|&i| i == idx).unwrap_or(0);
            let mut path: Vec<String> = stack[start..]
                .iter()
                .filter_map(|&i| coll.get_index(i).map(|t| t.name().to_string()))
                .collect();
            if let Some(ty) = coll.get_index(idx) {
                path.push(ty.name().to_string());
            }
            return Err(SchemaError::CyclicLayout { path }.into());
        }
        Mark::New => {}
    }
    let Some(ty) = coll.get_index(idx) else {
        return Ok(());
    };
    marks[idx] = Mark::Visiting;
    stack.push(idx);
    for dep in by_value_deps(coll, ty) {
        visit(coll, dep, marks, stack, order)?;
    }
    stack.pop();
    marks[idx] = Mark::Done;
    order.push(idx);
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Per-type layout
// ══════════════════════════════════════════════════════════════════════════════

fn layout_type(coll: &TypeCollection, idx: usize, opts: &LayoutOptions) -> LayoutResult<Computed> {
    let ty = coll
        .get_index(idx)
        .ok_or_else(|| LayoutError::Unresolved(format!("#{idx}")))?;
    let ptr = opts.target.size_bytes;
    let name = ty.name();
    match ty {
        TopLevelType::Enum(e) => {
            let width = e.tag.size_bytes();
            Ok(Computed {
                info: TypeInfo::new(width, width),
                fields: Vec::new(),
            })
        }
        TopLevelType::Funcptr(_) => Ok(Computed {
            info: TypeInfo::new(ptr, ptr),
            fields: Vec::new(),
        }),
        TopLevelType::Struct(s) => {
            if s.auto {
                if let Some(pos) = s.fields.iter().position(Field::is_pad) {
                    return Err(SchemaError::PaddingConflict {
                        type_name: s.meta.name.clone(),
                        field_index: pos,
                    }
                    .into());
                }
            }
            let strategy = opts.strategy_for(&s.meta.name, s.align.as_deref(), s.tag)?;
            layout_struct(coll, name, &s.fields, s.auto, strategy, opts)
        }
        TopLevelType::Union(u) => {
            let strategy = opts.strategy_for(&u.meta.name, u.align.as_deref(), u.tag)?;
            layout_union(coll, name, &u.fields, strategy, opts)
        }
    }
}

fn overflow(type_name: &str) -> LayoutError {
    LayoutError::Overflow {
        type_name: type_name.to_string(),
    }
}

/// `strategy.offset`/`strategy.size` round up by less than `align`.
fn round(type_name: &str, value: u32, align: u32, f: impl FnOnce(u32, u32) -> u32) -> LayoutResult<u32> {
    value.checked_add(align).ok_or_else(|| overflow(type_name))?;
    Ok(f(value, align))
}

fn layout_struct(
    coll: &TypeCollection,
    type_name: &str,
    fields: &[Field],
    auto: bool,
    strategy: &dyn AlignStrategy,
    opts: &LayoutOptions,
) -> LayoutResult<Computed> {
    let mut sized = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let (size, natural_align) = natural_layout(coll, type_name, field, opts)?;
        let align = strategy.align(&FieldShape {
            field,
            size,
            natural_align,
        });
        sized.push((i, size, align));
    }
    if auto {
        // stable: equal alignments keep declaration order
        sized.sort_by(|a, b| b.2.cmp(&a.2));
    }

    let mut offset = 0u32;
    let mut max_align = 1u32;
    let mut out = Vec::with_capacity(sized.len());
    for (i, size, align) in sized {
        if fields[i].is_pad() {
            out.push((i, TypeInfo::new(size, 1).with_offset(offset)));
            offset = offset.checked_add(size).ok_or_else(|| overflow(type_name))?;
            continue;
        }
        offset = round(type_name, offset, align, |o, a| strategy.offset(o, a))?;
        out.push((i, TypeInfo::new(size, align).with_offset(offset)));
        offset = offset.checked_add(size).ok_or_else(|| overflow(type_name))?;
        max_align = max_align.max(align);
    }
    let size = round(type_name, offset, max_align, |s, a| strategy.size(s, a))?;
    Ok(Computed {
        info: TypeInfo::new(size, max_align),
        fields: out,
    })
}

fn layout_union(
    coll: &TypeCollection,
    type_name: &str,
    fields: &[Field],
    strategy: &dyn AlignStrategy,
    opts: &LayoutOptions,
) -> LayoutResult<Computed> {
    let mut max_size = 0u32;
    let mut max_align = 1u32;
    let mut out = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let (size, natural_align) = natural_layout(coll, type_name, field, opts)?;
        let align = strategy.align(&FieldShape {
            field,
            size,
            natural_align,
        });
        max_size = max_size.max(size);
        max_align = max_align.max(align);
        out.push((i, TypeInfo::new(size, align).with_offset(0)));
    }
    let size = round(type_name, max_size, max_align, |s, a| strategy.size(s, a))?;
    Ok(Computed {
        info: TypeInfo::new(size, max_align),
        fields: out,
    })
}

/// Natural `(size, align)` of a field before strategy adjustments.
fn natural_layout(
    coll: &TypeCollection,
    type_name: &str,
    field: &Field,
    opts: &LayoutOptions,
) -> LayoutResult<(u32, u32)> {
    let ptr = opts.target.size_bytes;
    if field.is_pad() {
        return Ok((field.pad.unwrap_or(0), 1));
    }
    match field.tag {
        FieldTag::Ptr => Ok((ptr, ptr)),
        FieldTag::Slice => Ok((ptr * 2, ptr)),
        FieldTag::Scalar => base_layout(coll, &field.base, opts),
        FieldTag::Array => {
            let (size, align) = base_layout(coll, &field.base, opts)?;
            field
                .checked_storage_len()
                .and_then(|n| size.checked_mul(n))
                .map(|total| (total, align))
                .ok_or_else(|| overflow(type_name))
        }
        FieldTag::Vec => {
            let (size, _) = base_layout(coll, &field.base, opts)?;
            // ceil_pow2 without the wrap past 2^31
            let n = size
                .checked_mul(field.len.unwrap_or(0))
                .and_then(|n| n.max(1).checked_next_power_of_two())
                .ok_or_else(|| overflow(type_name))?;
            Ok((n, n))
        }
    }
}

fn base_layout(coll: &TypeCollection, base: &BaseType, opts: &LayoutOptions) -> LayoutResult<(u32, u32)> {
    let ptr = opts.target.size_bytes;
    match base {
        BaseType::Prim(p) => Ok((p.size_bytes(), p.size_bytes())),
        BaseType::Isize | BaseType::Usize | BaseType::Opaque => Ok((ptr, ptr)),
        BaseType::String => Ok((opts.string_type.size_bytes(&opts.target), ptr)),
        BaseType::Named(name) => {
            let ty = coll
                .get(name)
                .ok_or_else(|| LayoutError::Unresolved(name.clone()))?;
            match ty {
                TopLevelType::Enum(e) => Ok((e.tag.size_bytes(), e.tag.size_bytes())),
                TopLevelType::Funcptr(_) => Ok((ptr, ptr)),
                TopLevelType::Struct(_) | TopLevelType::Union(_) => {
                    let info = ty.info();
                    match (info.size, info.align) {
                        (Some(size), Some(align)) => Ok((size, align)),
                        _ => Err(LayoutError::Unresolved(name.clone())),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmapi_types::{Enum, Primitive, Struct};

    #[test]
    fn enums_are_laid_out_before_use() {
        let coll = TypeCollection::from_types(vec![
            Struct::new("S", vec![Field::scalar("mode", "Mode"), Field::scalar("x", "u8")]).into(),
            Enum::new("Mode", Primitive::U32, vec!["a".into()]).into(),
        ])
        .unwrap();
        let coll = compute_layout(coll, &LayoutOptions::default()).unwrap();
        assert_eq!(coll.get("S").unwrap().info().size, Some(8));
    }

    #[test]
    fn unknown_strategy_is_reported() {
        let coll = TypeCollection::from_types(vec![Struct::new("S", vec![Field::scalar("x", "u8")])
            .with_align("simd")
            .into()])
        .unwrap();
        let err = compute_layout(coll, &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownAlignStrategy { .. }));
    }
}
