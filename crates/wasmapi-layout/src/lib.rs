//! wasmapi layout engine: annotates a [`TypeCollection`] with byte sizes,
//! offsets and alignments.
//!
//! # Rules
//!
//! - Primitive widths are fixed; `isize`/`usize`, pointers, `opaque` and
//!   function pointers take the target's pointer width.
//! - `string` takes the width of the configured [`StringType`] handle.
//! - Struct fields are placed in declaration order, each at the next multiple
//!   of its alignment. Auto-packed structs are first stably sorted by
//!   descending alignment.
//! - A struct's size is rounded up to its own alignment (the maximum field
//!   alignment, or 1 when empty).
//! - Union members all sit at offset 0.
//!
//! Alignment rounding is delegated to an [`AlignStrategy`]: C-compatible by
//! default, fully packed for `packed`-tagged types, or a strategy registered
//! on [`LayoutOptions`] under the name given in the type's `align` attribute.
//!
//! [`StringType`]: wasmapi_types::StringType

mod align;
mod engine;
mod error;

pub use align::{align_up, ceil_pow2, AlignC, AlignPacked, AlignStrategy, FieldShape, ALIGN_C, ALIGN_PACKED};
pub use engine::{compute_layout, strategy_name, LayoutOptions, STRATEGY_C, STRATEGY_PACKED};
pub use error::{LayoutError, LayoutResult};

pub use wasmapi_types::TypeCollection;
