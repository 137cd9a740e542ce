//! Typed instance views.
//!
//! [`WasmType`] is the host-side counterpart of a generated `$Name`
//! constructor: it reads size, alignment and field offsets from a laid-out
//! [`TypeCollection`] and binds them to a base address. Field values are
//! always read through the bridge, never cached.
//!
//! Only wasm32 layouts are accepted. Address arithmetic that would wrap past
//! `u32::MAX` fails with [`BridgeError::OutOfBounds`].

use wasmapi_types::{
    BaseType, Field, FieldTag, Primitive, StringType, TopLevelType, TypeCollection, WASM32,
};

use crate::bridge::WasmBridge;
use crate::error::{BridgeError, BridgeResult};
use crate::memory::{Element, MemorySlice};

/// A laid-out struct or union, ready to be bound to addresses.
#[derive(Debug, Clone, Copy)]
pub struct WasmType<'c> {
    coll: &'c TypeCollection,
    ty: &'c TopLevelType,
    size: u32,
    align: u32,
    string_type: StringType,
}

impl<'c> WasmType<'c> {
    /// Collections without a recorded layout target are taken to be wasm32
    /// with slice strings.
    pub fn new(coll: &'c TypeCollection, name: &str) -> BridgeResult<Self> {
        let string_type = match coll.layout_target() {
            Some(t) if t.target != WASM32 => return Err(BridgeError::UnsupportedTarget(t)),
            Some(t) => t.string_type,
            None => StringType::Slice,
        };
        let ty = coll
            .get(name)
            .filter(|t| t.fields().is_some())
            .ok_or_else(|| BridgeError::UnknownType(name.to_string()))?;
        match (ty.info().size, ty.info().align) {
            (Some(size), Some(align)) => Ok(Self {
                coll,
                ty,
                size,
                align,
                string_type,
            }),
            _ => Err(BridgeError::NotLaidOut(name.to_string())),
        }
    }

    pub fn name(&self) -> &'c str {
        self.ty.name()
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        self.align
    }

    /// View of the value stored at `base`.
    pub fn instance(&self, base: u32) -> WasmInstance<'c> {
        WasmInstance { ty: *self, base }
    }

    /// Views of `count` consecutive values starting at `base`.
    pub fn instance_array(&self, base: u32, count: u32) -> BridgeResult<impl Iterator<Item = WasmInstance<'c>> + 'c> {
        let ty = *self;
        count
            .checked_mul(ty.size)
            .and_then(|total| base.checked_add(total))
            .ok_or(BridgeError::OutOfBounds {
                addr: base,
                len: count.saturating_mul(ty.size),
            })?;
        Ok((0..count).map(move |i| ty.instance(base + i * ty.size)))
    }

    fn field(&self, name: &str) -> BridgeResult<&'c Field> {
        self.ty.field(name).ok_or_else(|| BridgeError::UnknownField {
            type_name: self.name().to_string(),
            field: name.to_string(),
        })
    }

    /// Numeric element type stored by a field, if any. Pointers, opaque
    /// handles and function pointers read as the target's `usize`.
    fn element_prim(&self, field: &Field) -> Option<Primitive> {
        if field.tag == FieldTag::Ptr {
            return Some(WASM32.usize);
        }
        if field.tag == FieldTag::Slice {
            return None;
        }
        match &field.base {
            BaseType::Prim(p) => Some(*p),
            BaseType::Isize => Some(WASM32.isize),
            BaseType::Usize | BaseType::Opaque => Some(WASM32.usize),
            BaseType::String => None,
            BaseType::Named(name) => match self.coll.get(name)? {
                TopLevelType::Enum(e) => Some(e.tag),
                TopLevelType::Funcptr(_) => Some(WASM32.usize),
                TopLevelType::Struct(_) | TopLevelType::Union(_) => None,
            },
        }
    }

    fn mismatch(&self, field: &Field, expected: impl Into<String>) -> BridgeError {
        BridgeError::TypeMismatch {
            type_name: self.name().to_string(),
            field: field.name.clone(),
            expected: expected.into(),
        }
    }
}

/// A [`WasmType`] bound to a base address.
#[derive(Debug, Clone, Copy)]
pub struct WasmInstance<'c> {
    ty: WasmType<'c>,
    base: u32,
}

impl<'c> WasmInstance<'c> {
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn ty(&self) -> WasmType<'c> {
        self.ty
    }

    /// Absolute address of a field.
    pub fn field_addr(&self, name: &str) -> BridgeResult<u32> {
        let field = self.ty.field(name)?;
        let offset = field
            .info
            .offset
            .ok_or_else(|| BridgeError::NotLaidOut(format!("{}.{name}", self.ty.name())))?;
        self.base.checked_add(offset).ok_or(BridgeError::OutOfBounds {
            addr: self.base,
            len: offset,
        })
    }

    fn checked<T: Element>(&self, name: &str, arrays: bool) -> BridgeResult<(&'c Field, u32)> {
        let field = self.ty.field(name)?;
        let is_array = matches!(field.tag, FieldTag::Array | FieldTag::Vec);
        if is_array != arrays {
            let expected = if arrays { "an array" } else { "a scalar" };
            return Err(self.ty.mismatch(field, expected));
        }
        if self.ty.element_prim(field) != Some(T::PRIM) {
            return Err(self.ty.mismatch(field, T::PRIM.as_str()));
        }
        Ok((field, self.field_addr(name)?))
    }

    /// Read a numeric, enum or pointer field.
    pub fn get<T: Element>(&self, bridge: &WasmBridge, name: &str) -> BridgeResult<T> {
        let (_, addr) = self.checked::<T>(name, false)?;
        bridge.read(addr)
    }

    pub fn set<T: Element>(&self, bridge: &mut WasmBridge, name: &str, value: T) -> BridgeResult<()> {
        let (_, addr) = self.checked::<T>(name, false)?;
        bridge.write(addr, value)
    }

    /// Element `index` of an array or vector field. Sentinel slots are
    /// addressable.
    pub fn element<T: Element>(&self, bridge: &WasmBridge, name: &str, index: u32) -> BridgeResult<T> {
        bridge.read(self.element_addr::<T>(name, index)?)
    }

    pub fn set_element<T: Element>(&self, bridge: &mut WasmBridge, name: &str, index: u32, value: T) -> BridgeResult<()> {
        bridge.write(self.element_addr::<T>(name, index)?, value)
    }

    fn element_addr<T: Element>(&self, name: &str, index: u32) -> BridgeResult<u32> {
        let (field, addr) = self.checked::<T>(name, true)?;
        let size = T::SIZE as u32;
        let elem = index.checked_mul(size).and_then(|o| addr.checked_add(o));
        match elem {
            Some(elem) if index < field.storage_len() => Ok(elem),
            _ => Err(BridgeError::OutOfBounds {
                addr: addr.saturating_add(index.saturating_mul(size)),
                len: size,
            }),
        }
    }

    /// `(ptr, len)` pair of a slice field or slice-represented string.
    pub fn slice(&self, bridge: &WasmBridge, name: &str) -> BridgeResult<MemorySlice> {
        let field = self.ty.field(name)?;
        let word = WASM32.usize.size_bytes();
        let is_slice = match field.tag {
            FieldTag::Slice => true,
            FieldTag::Scalar => field.base == BaseType::String && self.ty.string_type == StringType::Slice,
            _ => false,
        };
        if !is_slice || field.info.size != Some(2 * word) {
            return Err(self.ty.mismatch(field, "a slice"));
        }
        let addr = self.field_addr(name)?;
        let len_addr = addr.checked_add(word).ok_or(BridgeError::OutOfBounds { addr, len: 2 * word })?;
        Ok(MemorySlice::new(bridge.read(addr)?, bridge.read(len_addr)?))
    }

    /// View of a struct or union embedded by value.
    pub fn nested(&self, name: &str) -> BridgeResult<WasmInstance<'c>> {
        let field = self.ty.field(name)?;
        let target = match (&field.tag, field.base.named()) {
            (FieldTag::Scalar, Some(target)) => target,
            _ => return Err(self.ty.mismatch(field, "an embedded aggregate")),
        };
        let ty = WasmType::new(self.ty.coll, target)?;
        Ok(ty.instance(self.field_addr(name)?))
    }

    /// The raw bytes of this value.
    pub fn bytes<'b>(&self, bridge: &'b WasmBridge) -> BridgeResult<&'b [u8]> {
        bridge.bytes(self.base, self.ty.size)
    }
}
