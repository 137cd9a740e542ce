//! WASM target descriptions and string representations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Primitive;

/// Pointer model of a WASM target.
///
/// Only two instances exist: [`WASM32`] and [`WASM64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WasmTarget {
    /// Signed pointer-sized integer (`isize`).
    pub isize: Primitive,
    /// Unsigned pointer-sized integer (`usize`).
    pub usize: Primitive,
    /// Pointer width in bytes.
    pub size_bytes: u32,
}

/// 32-bit WASM target.
pub const WASM32: WasmTarget = WasmTarget {
    isize: Primitive::I32,
    usize: Primitive::U32,
    size_bytes: 4,
};

/// 64-bit WASM target (memory64).
pub const WASM64: WasmTarget = WasmTarget {
    isize: Primitive::I64,
    usize: Primitive::U64,
    size_bytes: 8,
};

impl WasmTarget {
    /// Pointer width in bits (32 or 64).
    pub fn bits(&self) -> u8 {
        (self.size_bytes * 8) as u8
    }
}

impl Default for WasmTarget {
    fn default() -> Self {
        WASM32
    }
}

impl TryFrom<u8> for WasmTarget {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(WASM32),
            64 => Ok(WASM64),
            other => Err(format!("unsupported WASM target: {other} bits")),
        }
    }
}

impl From<WasmTarget> for u8 {
    fn from(target: WasmTarget) -> Self {
        target.bits()
    }
}

/// How `string` fields are stored on the WASM side.
///
/// Zig string literals are slices (pointer + length), C strings are plain
/// pointers to zero-terminated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringType {
    #[default]
    Slice,
    Ptr,
}

impl StringType {
    /// Byte width of one string handle on the given target.
    pub fn size_bytes(self, target: &WasmTarget) -> u32 {
        match self {
            Self::Slice => target.size_bytes * 2,
            Self::Ptr => target.size_bytes,
        }
    }
}

/// Target and string representation a collection was laid out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayoutTarget {
    pub target: WasmTarget,
    pub string_type: StringType,
}

impl fmt::Display for LayoutTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strings = match self.string_type {
            StringType::Slice => "slice",
            StringType::Ptr => "ptr",
        };
        write!(f, "wasm{} ({strings} strings)", self.target.bits())
    }
}
