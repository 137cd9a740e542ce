//! wasmapi code generators: laid-out type schemas to source text.
//!
//! # Architecture
//!
//! Each target language implements [`CodeGen`]. The driver
//! ([`generate_types`]) walks a laid-out [`TypeCollection`] once, in
//! declaration order, and dispatches on the type kind:
//!
//! ```text
//! header → pre() → opts.pre → emit_{enum,struct,union,funcptr}… → opts.post → post()
//! ```
//!
//! Generators never compute layout themselves. They read the sizes, offsets
//! and alignments stored by `wasmapi-layout` and express them in the target
//! language, so every emitted binding describes the same bytes.
//!
//! ## Built-in generators
//!
//! | id    | output |
//! |-------|--------|
//! | `ts`  | interfaces + `$Name` constructors with byte-offset accessors |
//! | `zig` | `extern` structs and unions (`align(1)` fields when packed), enums, fn pointer types |
//! | `c11` | typedef'd structs/unions with explicit padding members |
//!
//! [`TypeCollection`]: wasmapi_types::TypeCollection

pub mod c11;
pub mod doc;
pub mod error;
pub mod generator;
pub mod opts;
pub mod typescript;
mod util;
pub mod zig;

pub use c11::C11;
pub use error::{CodegenError, CodegenResult};
pub use generator::{generate_types, CodeGen, GeneratorRegistry, GENERATOR_VERSION};
pub use opts::CodeGenOpts;
pub use typescript::TypeScript;
pub use zig::Zig;
