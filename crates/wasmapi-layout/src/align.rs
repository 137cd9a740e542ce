//! Alignment strategies.

use std::fmt;

use wasmapi_types::Field;

/// Round `value` up to the next multiple of `align` (a power of two).
pub fn align_up(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Smallest power of two `>= value` (1 for 0).
pub fn ceil_pow2(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// A field as seen by an [`AlignStrategy`]: the declaration plus its
/// natural (C) size and alignment on the active target.
#[derive(Debug, Clone, Copy)]
pub struct FieldShape<'a> {
    pub field: &'a Field,
    pub size: u32,
    pub natural_align: u32,
}

/// Policy deciding how fields are aligned and aggregates are rounded.
///
/// All three functions must be pure. Returned alignments must be powers of
/// two.
pub trait AlignStrategy: Send + Sync + fmt::Debug {
    /// Alignment to use for the given field.
    fn align(&self, field: &FieldShape<'_>) -> u32;

    /// Possibly rounded aggregate size for the given base size and alignment.
    fn size(&self, size: u32, align: u32) -> u32;

    /// Possibly rounded field offset for the given base offset and alignment.
    fn offset(&self, offset: u32, align: u32) -> u32;
}

/// C-compatible alignment (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignC;

impl AlignStrategy for AlignC {
    fn align(&self, field: &FieldShape<'_>) -> u32 {
        if field.field.is_pad() {
            1
        } else {
            field.natural_align
        }
    }

    fn size(&self, size: u32, align: u32) -> u32 {
        align_up(size, align)
    }

    fn offset(&self, offset: u32, align: u32) -> u32 {
        align_up(offset, align)
    }
}

/// No padding at all: every field is byte-aligned.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignPacked;

impl AlignStrategy for AlignPacked {
    fn align(&self, _: &FieldShape<'_>) -> u32 {
        1
    }

    fn size(&self, size: u32, _: u32) -> u32 {
        size
    }

    fn offset(&self, offset: u32, _: u32) -> u32 {
        offset
    }
}

pub static ALIGN_C: AlignC = AlignC;
pub static ALIGN_PACKED: AlignPacked = AlignPacked;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiples() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 1), 9);
    }

    #[test]
    fn ceil_pow2_values() {
        assert_eq!(ceil_pow2(0), 1);
        assert_eq!(ceil_pow2(12), 16);
        assert_eq!(ceil_pow2(16), 16);
    }

    #[test]
    fn packed_never_pads() {
        let field = Field::scalar("x", "f64");
        let shape = FieldShape {
            field: &field,
            size: 8,
            natural_align: 8,
        };
        assert_eq!(ALIGN_PACKED.align(&shape), 1);
        assert_eq!(ALIGN_PACKED.offset(3, 8), 3);
        assert_eq!(ALIGN_C.align(&shape), 8);
        assert_eq!(ALIGN_C.offset(3, 8), 8);
    }
}
