//! The memory bridge.
//!
//! [`WasmBridge`] owns one instantiated guest module and mediates all host
//! access to its linear memory. Every accessor goes through
//! [`WasmBridge::ensure_views`] first, so callers never observe a buffer
//! that growth has replaced. Views handed out borrow the bridge immutably,
//! and growth needs `&mut self`, so a stale view cannot outlive a grow.

use std::cell::Cell;

use tracing::{debug, warn};
use wasmi::{Engine, Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults};

use crate::core_api::{self, HostState};
use crate::error::{BridgeError, BridgeResult};
use crate::memory::{Element, MemorySlice, TypedView, TypedViewMut};
use crate::registry::ApiRegistry;

/// Size of one linear memory page.
pub const PAGE_SIZE: usize = 0x1_0000;

/// Export names the bridge looks up in the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// `(numBytes: i32) -> addr: i32`, returning 0 on failure.
    pub allocate: String,
    /// `(addr: i32, numBytes: i32)`.
    pub free: String,
    pub memory: String,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            allocate: "_wasm_allocate".to_string(),
            free: "_wasm_free".to_string(),
            memory: "memory".to_string(),
        }
    }
}

/// Identity of the buffer the views were last built from.
#[derive(Debug, Clone, Copy, Default)]
struct ViewState {
    ptr: usize,
    len: usize,
    generation: u64,
}

pub struct WasmBridge {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
    allocate: Option<TypedFunc<i32, i32>>,
    free: Option<TypedFunc<(i32, i32), ()>>,
    views: Cell<ViewState>,
}

impl WasmBridge {
    /// Instantiate `wasm` with the core imports plus every import of
    /// `registry`, using the default export names.
    pub fn instantiate(wasm: &[u8], registry: &ApiRegistry) -> BridgeResult<Self> {
        Self::instantiate_with(wasm, registry, BridgeOptions::default())
    }

    pub fn instantiate_with(wasm: &[u8], registry: &ApiRegistry, options: BridgeOptions) -> BridgeResult<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, wasm)?;
        let mut store = Store::new(&engine, HostState::new(options.memory.as_str()));
        let mut linker = Linker::<HostState>::new(&engine);
        core_api::link(&mut linker)?;
        registry.link(&mut linker)?;

        let instance = linker.instantiate(&mut store, &module)?.start(&mut store)?;
        let memory = instance
            .get_memory(&store, &options.memory)
            .ok_or_else(|| BridgeError::MissingExport(options.memory.clone()))?;
        let allocate = instance.get_typed_func::<i32, i32>(&store, &options.allocate).ok();
        let free = instance.get_typed_func::<(i32, i32), ()>(&store, &options.free).ok();
        if allocate.is_none() {
            warn!(target: "wasmapi", export = %options.allocate, "guest exports no allocator");
        }

        let bridge = Self {
            store,
            instance,
            memory,
            allocate,
            free,
            views: Cell::new(ViewState::default()),
        };
        bridge.ensure_views();
        Ok(bridge)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Views
    // ══════════════════════════════════════════════════════════════════════════

    /// Rebuild view bookkeeping if the memory buffer changed identity.
    /// Idempotent.
    pub fn ensure_views(&self) {
        let data = self.memory.data(&self.store);
        let (ptr, len) = (data.as_ptr() as usize, data.len());
        let state = self.views.get();
        if state.ptr != ptr || state.len != len {
            let generation = state.generation + 1;
            debug!(target: "wasmapi", generation, bytes = len, "memory views rebuilt");
            self.views.set(ViewState { ptr, len, generation });
        }
    }

    /// Number of times the views have been rebuilt, starting at 1.
    pub fn view_generation(&self) -> u64 {
        self.views.get().generation
    }

    fn data(&self) -> &[u8] {
        self.ensure_views();
        self.memory.data(&self.store)
    }

    fn data_mut(&mut self) -> &mut [u8] {
        self.ensure_views();
        self.memory.data_mut(&mut self.store)
    }

    /// Current memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data().len()
    }

    pub fn pages(&self) -> usize {
        self.memory_size() / PAGE_SIZE
    }

    /// Typed view over the whole memory.
    pub fn view<T: Element>(&self) -> TypedView<'_, T> {
        TypedView::new(self.data())
    }

    pub fn view_mut<T: Element>(&mut self) -> TypedViewMut<'_, T> {
        TypedViewMut::new(self.data_mut())
    }

    pub fn i8(&self) -> TypedView<'_, i8> {
        self.view()
    }

    pub fn u8(&self) -> TypedView<'_, u8> {
        self.view()
    }

    pub fn i16(&self) -> TypedView<'_, i16> {
        self.view()
    }

    pub fn u16(&self) -> TypedView<'_, u16> {
        self.view()
    }

    pub fn i32(&self) -> TypedView<'_, i32> {
        self.view()
    }

    pub fn u32(&self) -> TypedView<'_, u32> {
        self.view()
    }

    pub fn i64(&self) -> TypedView<'_, i64> {
        self.view()
    }

    pub fn u64(&self) -> TypedView<'_, u64> {
        self.view()
    }

    pub fn f32(&self) -> TypedView<'_, f32> {
        self.view()
    }

    pub fn f64(&self) -> TypedView<'_, f64> {
        self.view()
    }

    /// `len` bytes starting at `addr`.
    pub fn bytes(&self, addr: u32, len: u32) -> BridgeResult<&[u8]> {
        let (start, end) = (addr as usize, addr as usize + len as usize);
        self.data()
            .get(start..end)
            .ok_or(BridgeError::OutOfBounds { addr, len })
    }

    pub fn bytes_mut(&mut self, addr: u32, len: u32) -> BridgeResult<&mut [u8]> {
        let (start, end) = (addr as usize, addr as usize + len as usize);
        self.data_mut()
            .get_mut(start..end)
            .ok_or(BridgeError::OutOfBounds { addr, len })
    }

    /// Read one little-endian value at a byte address.
    pub fn read<T: Element>(&self, addr: u32) -> BridgeResult<T> {
        self.bytes(addr, T::SIZE as u32).map(T::read_le)
    }

    pub fn write<T: Element>(&mut self, addr: u32, value: T) -> BridgeResult<()> {
        value.write_le(self.bytes_mut(addr, T::SIZE as u32)?);
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Growth and allocation
    // ══════════════════════════════════════════════════════════════════════════

    /// Add `pages` 64 KiB pages. On failure nothing changes.
    pub fn grow_memory(&mut self, pages: u32) -> BridgeResult<()> {
        self.memory
            .grow(&mut self.store, pages.into())
            .map_err(|e| BridgeError::GrowFailed {
                pages,
                reason: e.to_string(),
            })?;
        self.ensure_views();
        debug!(target: "wasmapi", pages, bytes = self.memory_size(), "memory grown");
        Ok(())
    }

    /// Allocate `num_bytes` with the guest allocator, optionally zeroed.
    pub fn allocate(&mut self, num_bytes: u32, zero: bool) -> BridgeResult<MemorySlice> {
        let Some(alloc) = &self.allocate else {
            return Err(BridgeError::OutOfMemory { requested: num_bytes });
        };
        let addr = alloc.call(&mut self.store, num_bytes as i32)? as u32;
        self.ensure_views();
        if addr == 0 {
            return Err(BridgeError::OutOfMemory { requested: num_bytes });
        }
        if zero {
            self.bytes_mut(addr, num_bytes)?.fill(0);
        }
        debug!(target: "wasmapi", addr, len = num_bytes, "allocated");
        Ok(MemorySlice::new(addr, num_bytes))
    }

    /// Return a slice to the guest allocator. Never fails: a missing
    /// deallocator is a no-op and a trapping one is only logged.
    pub fn free(&mut self, slice: MemorySlice) {
        let Some(free) = &self.free else {
            return;
        };
        if let Err(err) = free.call(&mut self.store, (slice.addr as i32, slice.len as i32)) {
            warn!(target: "wasmapi", addr = slice.addr, len = slice.len, %err, "guest free trapped");
        }
        self.ensure_views();
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Strings
    // ══════════════════════════════════════════════════════════════════════════

    /// Decode a UTF-8 string. `len == 0` reads up to the next zero byte.
    pub fn get_string(&self, addr: u32, len: u32) -> BridgeResult<String> {
        let bytes = if len == 0 {
            let tail = self
                .data()
                .get(addr as usize..)
                .ok_or(BridgeError::OutOfBounds { addr, len: 1 })?;
            let end = tail.iter().position(|b| *b == 0).ok_or(BridgeError::OutOfBounds {
                addr,
                len: tail.len() as u32 + 1,
            })?;
            &tail[..end]
        } else {
            self.bytes(addr, len)?
        };
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| BridgeError::InvalidUtf8 { addr })
    }

    /// Encode `value` at `addr`, using at most `max_bytes` including the
    /// optional zero terminator. Returns the encoded length without the
    /// terminator. Nothing is written when the string does not fit.
    pub fn set_string(&mut self, value: &str, addr: u32, max_bytes: u32, terminate: bool) -> BridgeResult<u32> {
        let encoded = value.as_bytes();
        let required = encoded.len() + usize::from(terminate);
        if required > max_bytes as usize {
            return Err(BridgeError::BufferTooSmall {
                required: u32::try_from(required).unwrap_or(u32::MAX),
                available: max_bytes,
            });
        }
        let dest = self.bytes_mut(addr, required as u32)?;
        dest[..encoded.len()].copy_from_slice(encoded);
        if terminate {
            dest[encoded.len()] = 0;
        }
        Ok(encoded.len() as u32)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Exports
    // ══════════════════════════════════════════════════════════════════════════

    pub fn has_export(&self, name: &str) -> bool {
        self.instance.get_export(&self.store, name).is_some()
    }

    /// Look up a typed guest function.
    pub fn typed_func<P: WasmParams, R: WasmResults>(&self, name: &str) -> BridgeResult<TypedFunc<P, R>> {
        self.instance
            .get_typed_func::<P, R>(&self.store, name)
            .map_err(|_| BridgeError::MissingExport(name.to_string()))
    }

    /// Call a guest export, then refresh views since the guest may have
    /// grown its memory.
    pub fn call<P: WasmParams, R: WasmResults>(&mut self, name: &str, params: P) -> BridgeResult<R> {
        let func = self.typed_func::<P, R>(name)?;
        let result = func.call(&mut self.store, params);
        self.ensure_views();
        Ok(result?)
    }

    pub fn host(&self) -> &HostState {
        self.store.data()
    }

    pub fn host_mut(&mut self) -> &mut HostState {
        self.store.data_mut()
    }

    /// Lines printed through the core API.
    pub fn output(&self) -> &[String] {
        self.host().output()
    }

    pub fn take_output(&mut self) -> Vec<String> {
        self.host_mut().take_output()
    }
}

impl std::fmt::Debug for WasmBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmBridge")
            .field("bytes", &self.memory.data(&self.store).len())
            .field("allocator", &self.allocate.is_some())
            .field("view_generation", &self.view_generation())
            .finish()
    }
}
