//! wasmapi runtime: the host side of the type bridge.
//!
//! # Architecture
//!
//! ```text
//! ApiRegistry ──register()──▶ import names checked for collisions
//!      │
//!      ▼
//! WasmBridge::instantiate(wasm, &registry)
//!      │  core imports + child API imports linked into `wasmapi`
//!      ▼
//! registry.init(&mut bridge).await
//!      │  core first, then child APIs in dependency order
//!      ▼
//! allocate / free / get_string / set_string / typed views / WasmType
//! ```
//!
//! Guests run on [`wasmi`]. Addresses are 32-bit: the bridge targets
//! `wasm32` modules, matching the default layout target.

mod bridge;
pub mod core_api;
mod error;
mod memory;
pub mod registry;
pub mod timer;
mod view;

pub use bridge::{BridgeOptions, WasmBridge, PAGE_SIZE};
pub use core_api::{HostState, CORE_ID, NAMESPACE};
pub use error::{BridgeError, BridgeResult, InitError};
pub use memory::{Element, MemorySlice, TypedView, TypedViewMut};
pub use registry::{ApiLinker, ApiRegistry, InitFuture, WasmApi};
pub use timer::{Timer, TimerType};
pub use view::{WasmInstance, WasmType};
