//! Typed numeric views over guest linear memory.
//!
//! A view reinterprets the byte buffer as a sequence of little-endian
//! elements, indexed the way JavaScript typed arrays are: element `i` of a
//! `TypedView<f32>` lives at byte address `i * 4`. Views borrow the bridge,
//! so anything that can grow memory (which needs `&mut WasmBridge`) ends
//! every outstanding view first.

use std::fmt;
use std::marker::PhantomData;

use wasmapi_types::Primitive;

/// Fixed-width numeric element of a typed view.
pub trait Element: Copy + fmt::Debug + PartialEq + 'static {
    const SIZE: usize;
    const PRIM: Primitive;

    /// Decode from the first `SIZE` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode into the first `SIZE` bytes of `out`.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! element {
    ($($ty:ty => $prim:ident),* $(,)?) => {$(
        impl Element for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();
            const PRIM: Primitive = Primitive::$prim;

            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(&bytes[..Self::SIZE]);
                <$ty>::from_le_bytes(buf)
            }

            fn write_le(self, out: &mut [u8]) {
                out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

element! {
    i8 => I8, u8 => U8,
    i16 => I16, u16 => U16,
    i32 => I32, u32 => U32,
    i64 => I64, u64 => U64,
    f32 => F32, f64 => F64,
}

/// Address and byte length of a guest allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemorySlice {
    pub addr: u32,
    pub len: u32,
}

impl MemorySlice {
    pub fn new(addr: u32, len: u32) -> Self {
        Self { addr, len }
    }

    /// One past the last byte.
    pub fn end(&self) -> u64 {
        u64::from(self.addr) + u64::from(self.len)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Views
// ══════════════════════════════════════════════════════════════════════════════

/// Read-only typed view.
#[derive(Clone, Copy)]
pub struct TypedView<'a, T> {
    bytes: &'a [u8],
    _elem: PhantomData<T>,
}

impl<'a, T: Element> TypedView<'a, T> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            _elem: PhantomData,
        }
    }

    /// Number of whole elements in the view.
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(T::SIZE)?;
        let bytes = self.bytes.get(start..start.checked_add(T::SIZE)?)?;
        Some(T::read_le(bytes))
    }

    /// Elements `start..end`, like `TypedArray.subarray`.
    pub fn subarray(&self, start: usize, end: usize) -> Option<TypedView<'a, T>> {
        if start > end {
            return None;
        }
        let bytes = self.bytes.get(start * T::SIZE..end.checked_mul(T::SIZE)?)?;
        Some(TypedView::new(bytes))
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        self.bytes.chunks_exact(T::SIZE).map(T::read_le)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Element> fmt::Debug for TypedView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedView")
            .field("elem", &T::PRIM)
            .field("len", &self.len())
            .finish()
    }
}

/// Mutable typed view.
pub struct TypedViewMut<'a, T> {
    bytes: &'a mut [u8],
    _elem: PhantomData<T>,
}

impl<'a, T: Element> TypedViewMut<'a, T> {
    pub(crate) fn new(bytes: &'a mut [u8]) -> Self {
        Self {
            bytes,
            _elem: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.as_view().get(index)
    }

    /// Write element `index`. Returns `false` when out of range.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        let Some(start) = index.checked_mul(T::SIZE) else {
            return false;
        };
        match self.bytes.get_mut(start..start + T::SIZE) {
            Some(slot) => {
                value.write_le(slot);
                true
            }
            None => false,
        }
    }

    /// Copy `values` starting at element `offset`, like `TypedArray.set`.
    pub fn set_from(&mut self, values: &[T], offset: usize) -> bool {
        if offset.saturating_add(values.len()) > self.len() {
            return false;
        }
        for (i, v) in values.iter().enumerate() {
            self.set(offset + i, *v);
        }
        true
    }

    pub fn fill(&mut self, value: T) {
        for chunk in self.bytes.chunks_exact_mut(T::SIZE) {
            value.write_le(chunk);
        }
    }

    pub fn as_view(&self) -> TypedView<'_, T> {
        TypedView::new(self.bytes)
    }
}
