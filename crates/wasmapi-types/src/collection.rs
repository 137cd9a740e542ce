//! Type collections: an arena of top-level types indexed by name.

use std::collections::{HashMap, HashSet};

use crate::error::SchemaError;
use crate::schema::{BaseType, Field, FieldTag, FuncReturn, Primitive, TopLevelType, TypeKind};
use crate::target::LayoutTarget;
use crate::{Result, RESERVED_PREFIX};

/// Named types in declaration order.
///
/// Declaration order is kept so generated output follows the input file.
/// Lookups go through a name index.
#[derive(Debug, Clone, Default)]
pub struct TypeCollection {
    types: Vec<TopLevelType>,
    index: HashMap<String, usize>,
    layout: Option<LayoutTarget>,
}

impl TypeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting duplicate names.
    pub fn from_types<I>(types: I) -> Result<Self>
    where
        I: IntoIterator<Item = TopLevelType>,
    {
        let mut coll = Self::new();
        for ty in types {
            coll.insert(ty)?;
        }
        Ok(coll)
    }

    /// Parse a JSON array of type definitions.
    pub fn from_json(json: &str) -> Result<Self> {
        let types: Vec<TopLevelType> = serde_json::from_str(json)?;
        Self::from_types(types)
    }

    /// Serialize back to a JSON array (layout annotations are not included).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.types)?)
    }

    pub fn insert(&mut self, ty: impl Into<TopLevelType>) -> Result<()> {
        let ty = ty.into();
        let name = ty.name().to_string();
        if self.index.contains_key(&name) {
            return Err(SchemaError::DuplicateType(name));
        }
        self.index.insert(name, self.types.len());
        self.types.push(ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TopLevelType> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get_index(&self, idx: usize) -> Option<&TopLevelType> {
        self.types.get(idx)
    }

    /// Mutable access for layout annotation. Callers must not rename the type.
    pub fn get_index_mut(&mut self, idx: usize) -> Option<&mut TopLevelType> {
        self.types.get_mut(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TopLevelType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Target the layout annotations were computed for, once laid out.
    pub fn layout_target(&self) -> Option<LayoutTarget> {
        self.layout
    }

    /// Record the layout target. Set by the layout engine only.
    pub fn set_layout_target(&mut self, target: LayoutTarget) {
        self.layout = Some(target);
    }

    /// True once every type carries size and alignment annotations.
    pub fn is_laid_out(&self) -> bool {
        self.types.iter().all(|t| t.info().is_laid_out())
    }

    /// Check structural rules and closure under name references.
    ///
    /// By-value cycles and padding/auto-pack conflicts are layout concerns
    /// and are reported by the layout engine.
    pub fn validate(&self) -> Result<()> {
        for ty in &self.types {
            match ty {
                TopLevelType::Enum(e) => {
                    if !matches!(e.tag, Primitive::I32 | Primitive::U32) {
                        return Err(SchemaError::InvalidEnum {
                            type_name: e.meta.name.clone(),
                            reason: format!("tag must be i32 or u32, got {}", e.tag),
                        });
                    }
                    if e.values.is_empty() {
                        return Err(SchemaError::InvalidEnum {
                            type_name: e.meta.name.clone(),
                            reason: "no values".to_string(),
                        });
                    }
                    let mut seen = HashSet::new();
                    let (min, max) = e.tag.int_range().unwrap_or((0, 0));
                    for (value, n) in e.resolved_values() {
                        if !seen.insert(value.name.as_str()) {
                            return Err(SchemaError::InvalidEnum {
                                type_name: e.meta.name.clone(),
                                reason: format!("duplicate value `{}`", value.name),
                            });
                        }
                        if i128::from(n) < min || i128::from(n) > max {
                            return Err(SchemaError::InvalidEnum {
                                type_name: e.meta.name.clone(),
                                reason: format!("value `{}` = {n} out of range for {}", value.name, e.tag),
                            });
                        }
                    }
                }
                TopLevelType::Struct(s) => self.validate_fields(&s.meta.name, &s.fields, false)?,
                TopLevelType::Union(u) => self.validate_fields(&u.meta.name, &u.fields, true)?,
                TopLevelType::Funcptr(fp) => {
                    if let FuncReturn::Value(ret) = &fp.rtype {
                        self.check_reference(&fp.meta.name, &ret.base)?;
                    }
                    for arg in &fp.args {
                        self.check_reference(&fp.meta.name, &arg.base)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_fields(&self, type_name: &str, fields: &[Field], is_union: bool) -> Result<()> {
        let mut names = HashSet::new();
        for field in fields {
            if field.is_pad() {
                if is_union {
                    return Err(SchemaError::invalid_field(type_name, &field.name, "padding is not allowed in unions"));
                }
                if field.base.named().is_some() {
                    return Err(SchemaError::invalid_field(
                        type_name,
                        &field.name,
                        "padding fields cannot reference another type",
                    ));
                }
                continue;
            }
            if field.name.is_empty() {
                return Err(SchemaError::invalid_field(type_name, "<unnamed>", "missing name"));
            }
            if field.name.starts_with(RESERVED_PREFIX) {
                return Err(SchemaError::invalid_field(
                    type_name,
                    &field.name,
                    format!("the `{RESERVED_PREFIX}` prefix is reserved"),
                ));
            }
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::invalid_field(type_name, &field.name, "duplicate field name"));
            }
            if field.base.is_missing() {
                return Err(SchemaError::invalid_field(type_name, &field.name, "missing type"));
            }
            self.check_reference(type_name, &field.base)?;

            match field.tag {
                FieldTag::Array | FieldTag::Vec if field.len.unwrap_or(0) == 0 => {
                    return Err(SchemaError::invalid_field(type_name, &field.name, "arrays and vectors need len > 0"));
                }
                FieldTag::Vec if !matches!(field.base, BaseType::Prim(_)) => {
                    return Err(SchemaError::invalid_field(type_name, &field.name, "vectors only hold numeric primitives"));
                }
                _ => {}
            }
            if field.sentinel.is_some() && !matches!(field.tag, FieldTag::Array | FieldTag::Slice) {
                return Err(SchemaError::invalid_field(type_name, &field.name, "sentinels only apply to arrays and slices"));
            }
            if field.optional && !self.is_pointer_like(field) {
                return Err(SchemaError::invalid_field(type_name, &field.name, "only pointer-like fields can be optional"));
            }
        }
        Ok(())
    }

    fn is_pointer_like(&self, field: &Field) -> bool {
        if field.tag.is_indirect() {
            return true;
        }
        if field.tag != FieldTag::Scalar {
            return false;
        }
        match &field.base {
            BaseType::Opaque => true,
            BaseType::Named(name) => self.get(name).is_some_and(|t| t.kind() == TypeKind::FuncPtr),
            _ => false,
        }
    }

    fn check_reference(&self, type_name: &str, base: &BaseType) -> Result<()> {
        match base.named() {
            Some(name) if !self.index.contains_key(name) => Err(SchemaError::UnknownType {
                name: name.to_string(),
                referenced_by: type_name.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a TypeCollection {
    type Item = &'a TopLevelType;
    type IntoIter = std::slice::Iter<'a, TopLevelType>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}
