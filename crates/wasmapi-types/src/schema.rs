//! Type schema model.
//!
//! A [`TypeCollection`](crate::TypeCollection) holds [`TopLevelType`]s keyed
//! by name. Fields reference other types by name only ([`BaseType::Named`]),
//! so self-referential graphs (a struct holding a pointer to its own type)
//! need no ownership cycles. References are resolved at layout time.
//!
//! The serde representation follows the JSON type-spec format: `type`,
//! `tag`, `len`, `pad`, `auto`, `const`, `doc`, `body`, `skip`, ...

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Primitives
// ══════════════════════════════════════════════════════════════════════════════

/// Fixed-width numeric kinds understood by every generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Primitive {
    pub const ALL: [Primitive; 10] = [
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
        Self::F32,
        Self::F64,
    ];

    pub fn size_bytes(self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }

    /// True for the 64-bit integer kinds (which map to bigints in JS).
    pub fn is_bigint(self) -> bool {
        matches!(self, Self::I64 | Self::U64)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Inclusive value range representable by this integer kind.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let bits = self.size_bytes() * 8;
        match self {
            Self::F32 | Self::F64 => None,
            _ if self.is_signed() => Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)),
            _ => Some((0, (1i128 << bits) - 1)),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Layout annotations
// ══════════════════════════════════════════════════════════════════════════════

/// Computed layout data. Empty until the layout engine has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// Size in bytes.
    pub size: Option<u32>,
    /// Byte offset within the parent aggregate (fields only).
    pub offset: Option<u32>,
    /// Alignment actually used (power of two).
    pub align: Option<u32>,
}

impl TypeInfo {
    pub fn new(size: u32, align: u32) -> Self {
        Self {
            size: Some(size),
            offset: None,
            align: Some(align),
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_laid_out(&self) -> bool {
        self.size.is_some() && self.align.is_some()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Shared helpers
// ══════════════════════════════════════════════════════════════════════════════

/// A docstring or injected source: one string or a list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lines {
    One(String),
    Many(Vec<String>),
}

impl Lines {
    /// All lines, with embedded newlines split out.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::One(s) => s.lines().collect(),
            Self::Many(v) => v
                .iter()
                .flat_map(|s| if s.is_empty() { vec![""] } else { s.lines().collect() })
                .collect(),
        }
    }

    /// The lines joined with `\n`.
    pub fn joined(&self) -> String {
        self.lines().join("\n")
    }
}

impl From<&str> for Lines {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<String> for Lines {
    fn from(s: String) -> Self {
        Self::One(s)
    }
}

/// A numeric or textual literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Field default value, either shared or keyed by language id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Number(f64),
    Text(String),
    PerLanguage(BTreeMap<String, Literal>),
}

impl DefaultValue {
    /// The default to use for the given generator, if any.
    pub fn for_lang(&self, lang: &str) -> Option<Literal> {
        match self {
            Self::Number(n) => Some(Literal::Number(*n)),
            Self::Text(s) => Some(Literal::Text(s.clone())),
            Self::PerLanguage(map) => map.get(lang).cloned(),
        }
    }
}

/// User source injected into a generated type, per language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InjectedBody {
    Source(Lines),
    Parts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decl: Option<Lines>,
        #[serde(rename = "impl", default, skip_serializing_if = "Option::is_none")]
        imp: Option<Lines>,
    },
}

impl InjectedBody {
    /// Source placed inside the type declaration.
    pub fn decl(&self) -> Option<&Lines> {
        match self {
            Self::Source(src) => Some(src),
            Self::Parts { decl, .. } => decl.as_ref(),
        }
    }

    /// Source placed after the type declaration (implementation part).
    pub fn imp(&self) -> Option<&Lines> {
        match self {
            Self::Source(_) => None,
            Self::Parts { imp, .. } => imp.as_ref(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Fields
// ══════════════════════════════════════════════════════════════════════════════

/// Field base type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BaseType {
    Prim(Primitive),
    Isize,
    Usize,
    String,
    /// Unknown-size referent, always handled through a pointer.
    Opaque,
    /// Reference to another type in the collection.
    Named(String),
}

impl BaseType {
    pub fn named(&self) -> Option<&str> {
        match self {
            Self::Named(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Named(name) if name.is_empty())
    }
}

impl Default for BaseType {
    fn default() -> Self {
        Self::Named(String::new())
    }
}

impl From<&str> for BaseType {
    fn from(s: &str) -> Self {
        match s {
            "isize" => Self::Isize,
            "usize" => Self::Usize,
            "string" => Self::String,
            "opaque" => Self::Opaque,
            other => match Primitive::parse(other) {
                Some(prim) => Self::Prim(prim),
                None => Self::Named(other.to_string()),
            },
        }
    }
}

impl From<String> for BaseType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Primitive> for BaseType {
    fn from(prim: Primitive) -> Self {
        Self::Prim(prim)
    }
}

impl From<BaseType> for String {
    fn from(ty: BaseType) -> Self {
        ty.to_string()
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prim(p) => f.write_str(p.as_str()),
            Self::Isize => f.write_str("isize"),
            Self::Usize => f.write_str("usize"),
            Self::String => f.write_str("string"),
            Self::Opaque => f.write_str("opaque"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Field shape qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTag {
    #[default]
    Scalar,
    /// Statically sized array (`len`).
    Array,
    /// Single-value pointer.
    Ptr,
    /// Pointer + length pair.
    Slice,
    /// SIMD vector (`len`), stricter alignment than arrays.
    Vec,
}

impl FieldTag {
    /// Pointer-like tags only need the pointer width, never the referent's size.
    pub fn is_indirect(self) -> bool {
        matches!(self, Self::Ptr | Self::Slice)
    }
}

/// A struct or union member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name (`__` prefix reserved).
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Lines>,
    #[serde(default)]
    pub tag: FieldTag,
    #[serde(rename = "type", default)]
    pub base: BaseType,
    /// Const qualifier for pointers/slices. Defaults to true for strings.
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub is_const: Option<bool>,
    /// Pointer/slice fields only: zero address means absent.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// If > 0 the field is pure padding of this many bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad: Option<u32>,
    #[serde(skip)]
    pub info: TypeInfo,
}

impl Field {
    fn with_tag(name: impl Into<String>, tag: FieldTag, base: impl Into<BaseType>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            tag,
            base: base.into(),
            is_const: None,
            optional: false,
            sentinel: None,
            len: None,
            default: None,
            pad: None,
            info: TypeInfo::default(),
        }
    }

    pub fn scalar(name: impl Into<String>, base: impl Into<BaseType>) -> Self {
        Self::with_tag(name, FieldTag::Scalar, base)
    }

    pub fn array(name: impl Into<String>, base: impl Into<BaseType>, len: u32) -> Self {
        let mut field = Self::with_tag(name, FieldTag::Array, base);
        field.len = Some(len);
        field
    }

    pub fn vector(name: impl Into<String>, base: impl Into<BaseType>, len: u32) -> Self {
        let mut field = Self::with_tag(name, FieldTag::Vec, base);
        field.len = Some(len);
        field
    }

    pub fn ptr(name: impl Into<String>, base: impl Into<BaseType>) -> Self {
        Self::with_tag(name, FieldTag::Ptr, base)
    }

    pub fn slice(name: impl Into<String>, base: impl Into<BaseType>) -> Self {
        Self::with_tag(name, FieldTag::Slice, base)
    }

    /// A padding-only field occupying `bytes` raw bytes.
    pub fn padding(bytes: u32) -> Self {
        let mut field = Self::with_tag("", FieldTag::Scalar, Primitive::U8);
        field.pad = Some(bytes);
        field
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn constant(mut self, is_const: bool) -> Self {
        self.is_const = Some(is_const);
        self
    }

    pub fn with_sentinel(mut self, sentinel: i64) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<Lines>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_pad(&self) -> bool {
        self.pad.is_some_and(|n| n > 0)
    }

    /// Effective const qualifier (strings default to const).
    pub fn is_const_qualified(&self) -> bool {
        self.is_const
            .unwrap_or(matches!(self.base, BaseType::String))
    }

    /// Element count including the sentinel slot, for arrays.
    pub fn storage_len(&self) -> u32 {
        self.checked_storage_len().unwrap_or(u32::MAX)
    }

    /// [`Field::storage_len`], or `None` when the sentinel slot overflows.
    pub fn checked_storage_len(&self) -> Option<u32> {
        let len = self.len.unwrap_or(0);
        match (self.tag, self.sentinel) {
            (FieldTag::Array, Some(_)) => len.checked_add(1),
            _ => Some(len),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Top-level types
// ══════════════════════════════════════════════════════════════════════════════

/// Attributes shared by every top-level type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Lines>,
    /// Source injected into the generated type, keyed by language id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub body: BTreeMap<String, InjectedBody>,
    /// Language ids for which generation of this type is skipped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip: Vec<String>,
    #[serde(skip)]
    pub info: TypeInfo,
}

impl TypeMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn skips(&self, lang: &str) -> bool {
        self.skip.iter().any(|id| id == lang)
    }
}

/// Qualifier for the kind of aggregate to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructTag {
    Extern,
    Packed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    #[serde(flatten)]
    pub meta: TypeMeta,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Reorder fields by descending alignment. Incompatible with padding fields.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<StructTag>,
    /// Name of a registered alignment strategy overriding the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
}

impl Struct {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            meta: TypeMeta::new(name),
            fields,
            auto: false,
            tag: None,
            align: None,
        }
    }

    pub fn auto_packed(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn with_tag(mut self, tag: StructTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn with_align(mut self, strategy: impl Into<String>) -> Self {
        self.align = Some(strategy.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<Lines>) -> Self {
        self.meta.doc = Some(doc.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    #[serde(flatten)]
    pub meta: TypeMeta,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<StructTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
}

impl Union {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            meta: TypeMeta::new(name),
            fields,
            tag: None,
            align: None,
        }
    }
}

/// One enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EnumValueRepr")]
pub struct EnumValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnumValueRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        value: Option<i64>,
        #[serde(default)]
        doc: Option<String>,
    },
}

impl From<EnumValueRepr> for EnumValue {
    fn from(repr: EnumValueRepr) -> Self {
        match repr {
            EnumValueRepr::Name(name) => Self::from(name.as_str()),
            EnumValueRepr::Full { name, value, doc } => Self { name, value, doc },
        }
    }
}

impl From<&str> for EnumValue {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            doc: None,
        }
    }
}

impl EnumValue {
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

fn default_enum_tag() -> Primitive {
    Primitive::I32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    #[serde(flatten)]
    pub meta: TypeMeta,
    /// Tag width; only `i32` / `u32` pass validation.
    #[serde(default = "default_enum_tag")]
    pub tag: Primitive,
    pub values: Vec<EnumValue>,
}

impl Enum {
    pub fn new(name: impl Into<String>, tag: Primitive, values: Vec<EnumValue>) -> Self {
        Self {
            meta: TypeMeta::new(name),
            tag,
            values,
        }
    }

    /// `(name, numeric value)` pairs with implicit values filled in
    /// (previous value + 1, starting at 0). Saturates at `i64::MAX`, which
    /// no valid tag can hold.
    pub fn resolved_values(&self) -> Vec<(&EnumValue, i64)> {
        let mut next = 0i64;
        self.values
            .iter()
            .map(|v| {
                let value = v.value.unwrap_or(next);
                next = value.saturating_add(1);
                (v, value)
            })
            .collect()
    }
}

/// Function pointer argument: a reduced [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncArg {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: FieldTag,
    #[serde(rename = "type")]
    pub base: BaseType,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub is_const: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<i64>,
}

impl FuncArg {
    pub fn new(name: impl Into<String>, base: impl Into<BaseType>) -> Self {
        Self {
            name: name.into(),
            tag: FieldTag::Scalar,
            base: base.into(),
            is_const: None,
            len: None,
            sentinel: None,
        }
    }

    pub fn with_tag(mut self, tag: FieldTag) -> Self {
        self.tag = tag;
        self
    }

    /// View this argument as a field, for code shared with struct members.
    pub fn to_field(&self) -> Field {
        let mut field = Field::scalar(self.name.clone(), self.base.clone());
        field.tag = self.tag;
        field.is_const = self.is_const;
        field.len = self.len;
        field.sentinel = self.sentinel;
        field
    }
}

/// Function pointer return spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FuncReturnRepr", into = "FuncReturnRepr")]
pub enum FuncReturn {
    Void,
    Value(FuncArg),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FuncReturnRepr {
    Keyword(String),
    Spec(FuncArg),
}

impl TryFrom<FuncReturnRepr> for FuncReturn {
    type Error = String;

    fn try_from(repr: FuncReturnRepr) -> Result<Self, Self::Error> {
        match repr {
            FuncReturnRepr::Keyword(kw) if kw == "void" => Ok(Self::Void),
            FuncReturnRepr::Keyword(kw) if kw.is_empty() => Err("empty return type".to_string()),
            FuncReturnRepr::Keyword(kw) => Ok(Self::Value(FuncArg::new("", kw))),
            FuncReturnRepr::Spec(arg) => Ok(Self::Value(arg)),
        }
    }
}

impl From<FuncReturn> for FuncReturnRepr {
    fn from(ret: FuncReturn) -> Self {
        match ret {
            FuncReturn::Void => Self::Keyword("void".to_string()),
            FuncReturn::Value(arg) => Self::Spec(arg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncPointer {
    #[serde(flatten)]
    pub meta: TypeMeta,
    pub rtype: FuncReturn,
    #[serde(default)]
    pub args: Vec<FuncArg>,
}

impl FuncPointer {
    pub fn new(name: impl Into<String>, rtype: FuncReturn, args: Vec<FuncArg>) -> Self {
        Self {
            meta: TypeMeta::new(name),
            rtype,
            args,
        }
    }
}

/// Discriminant of [`TopLevelType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Enum,
    Struct,
    Union,
    FuncPtr,
}

impl TypeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enum => "enum",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::FuncPtr => "funcptr",
        }
    }
}

/// A named type in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TopLevelType {
    Enum(Enum),
    Struct(Struct),
    Union(Union),
    Funcptr(FuncPointer),
}

impl TopLevelType {
    pub fn meta(&self) -> &TypeMeta {
        match self {
            Self::Enum(t) => &t.meta,
            Self::Struct(t) => &t.meta,
            Self::Union(t) => &t.meta,
            Self::Funcptr(t) => &t.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut TypeMeta {
        match self {
            Self::Enum(t) => &mut t.meta,
            Self::Struct(t) => &mut t.meta,
            Self::Union(t) => &mut t.meta,
            Self::Funcptr(t) => &mut t.meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn info(&self) -> &TypeInfo {
        &self.meta().info
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Enum(_) => TypeKind::Enum,
            Self::Struct(_) => TypeKind::Struct,
            Self::Union(_) => TypeKind::Union,
            Self::Funcptr(_) => TypeKind::FuncPtr,
        }
    }

    /// Member fields of structs and unions.
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Self::Struct(s) => Some(&s.fields),
            Self::Union(u) => Some(&u.fields),
            Self::Enum(_) | Self::Funcptr(_) => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut Vec<Field>> {
        match self {
            Self::Struct(s) => Some(&mut s.fields),
            Self::Union(u) => Some(&mut u.fields),
            Self::Enum(_) | Self::Funcptr(_) => None,
        }
    }

    /// Look up a member field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields()?.iter().find(|f| f.name == name && !f.is_pad())
    }
}

impl From<Enum> for TopLevelType {
    fn from(t: Enum) -> Self {
        Self::Enum(t)
    }
}

impl From<Struct> for TopLevelType {
    fn from(t: Struct) -> Self {
        Self::Struct(t)
    }
}

impl From<Union> for TopLevelType {
    fn from(t: Union) -> Self {
        Self::Union(t)
    }
}

impl From<FuncPointer> for TopLevelType {
    fn from(t: FuncPointer) -> Self {
        Self::Funcptr(t)
    }
}
