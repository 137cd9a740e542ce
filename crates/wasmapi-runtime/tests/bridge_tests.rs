//! Memory bridge tests: strings, allocation, growth, typed views and the
//! core API imports.

mod common;

use common::{allocator_guest, bare_guest, growable_guest, printing_guest, Guest, HEAP_START};
use wasm_encoder::ValType;
use wasmapi_runtime::{ApiRegistry, BridgeError, BridgeOptions, MemorySlice, WasmBridge, PAGE_SIZE};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn bridge(wasm: &[u8]) -> WasmBridge {
    WasmBridge::instantiate(wasm, &ApiRegistry::new()).expect("instantiate guest")
}

// ══════════════════════════════════════════════════════════════════════════════
// Strings
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_string_round_trip() {
    let mut b = bridge(&allocator_guest());
    let slice = b.allocate(32, true).unwrap();
    let text = "héllo wörld";

    let written = b.set_string(text, slice.addr, slice.len, true).unwrap();
    assert_eq!(written, 13);
    assert_eq!(b.u8().get(slice.addr as usize + 13), Some(0));
    assert_eq!(b.get_string(slice.addr, 0).unwrap(), text);
    assert_eq!(b.get_string(slice.addr, written).unwrap(), text);
}

#[test]
fn test_set_string_too_small_writes_nothing() {
    let mut b = bridge(&allocator_guest());
    let slice = b.allocate(8, false).unwrap();
    b.bytes_mut(slice.addr, 8).unwrap().fill(0xaa);

    let err = b.set_string("abcdefgh", slice.addr, 8, true).unwrap_err();
    assert!(matches!(err, BridgeError::BufferTooSmall { required: 9, available: 8 }));
    assert!(b.bytes(slice.addr, 8).unwrap().iter().all(|&x| x == 0xaa));

    // exact fit without terminator
    assert_eq!(b.set_string("abcdefgh", slice.addr, 8, false).unwrap(), 8);
    assert_eq!(b.get_string(slice.addr, 8).unwrap(), "abcdefgh");
}

#[test]
fn test_set_string_past_memory_end() {
    let mut b = bridge(&bare_guest());
    let addr = (PAGE_SIZE - 2) as u32;
    let err = b.set_string("abc", addr, 16, false).unwrap_err();
    assert!(matches!(err, BridgeError::OutOfBounds { .. }));
}

#[test]
fn test_get_string_errors() {
    let mut b = bridge(&bare_guest());
    b.bytes_mut(100, 3).unwrap().copy_from_slice(&[0xff, 0xfe, 0]);
    assert!(matches!(b.get_string(100, 0), Err(BridgeError::InvalidUtf8 { addr: 100 })));

    let last = (PAGE_SIZE - 1) as u32;
    b.write::<u8>(last, b'x').unwrap();
    assert!(matches!(b.get_string(last, 0), Err(BridgeError::OutOfBounds { .. })));
    assert_eq!(b.get_string(last, 1).unwrap(), "x");
}

// ══════════════════════════════════════════════════════════════════════════════
// Allocation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_alloc_free_keeps_neighbours_intact() {
    let mut b = bridge(&allocator_guest());
    let a = b.allocate(16, false).unwrap();
    let c = b.allocate(16, false).unwrap();
    assert_eq!(a.addr, HEAP_START as u32);
    assert_eq!(c.addr, a.addr + 16);

    b.bytes_mut(a.addr, 16).unwrap().fill(0x11);
    b.bytes_mut(c.addr, 16).unwrap().fill(0x22);
    b.free(c);

    let d = b.allocate(16, true).unwrap();
    assert_eq!(d.addr, c.addr, "bump allocator reuses the freed top");
    assert!(b.bytes(d.addr, 16).unwrap().iter().all(|&x| x == 0));
    assert!(b.bytes(a.addr, 16).unwrap().iter().all(|&x| x == 0x11));
}

#[test]
fn test_allocation_rounds_to_eight_bytes() {
    let mut b = bridge(&allocator_guest());
    let a = b.allocate(3, false).unwrap();
    let c = b.allocate(1, false).unwrap();
    assert_eq!(a.len, 3);
    assert_eq!(c.addr - a.addr, 8);
}

#[test]
fn test_out_of_memory_is_recoverable() {
    let mut b = bridge(&allocator_guest());
    let err = b.allocate(70_000, false).unwrap_err();
    assert!(matches!(err, BridgeError::OutOfMemory { requested: 70_000 }));

    let ok = b.allocate(64, false).unwrap();
    assert_eq!(ok.addr, HEAP_START as u32);
}

#[test]
fn test_missing_allocator() {
    let mut b = bridge(&bare_guest());
    assert!(matches!(b.allocate(8, false), Err(BridgeError::OutOfMemory { requested: 8 })));
    // no deallocator: silently ignored
    b.free(MemorySlice::new(1024, 8));
}

#[test]
fn test_custom_export_names() {
    let options = BridgeOptions {
        allocate: "my_alloc".to_string(),
        ..BridgeOptions::default()
    };
    let mut b = WasmBridge::instantiate_with(&allocator_guest(), &ApiRegistry::new(), options).unwrap();
    assert!(matches!(b.allocate(8, false), Err(BridgeError::OutOfMemory { .. })));

    let options = BridgeOptions {
        memory: "heap".to_string(),
        ..BridgeOptions::default()
    };
    let err = WasmBridge::instantiate_with(&allocator_guest(), &ApiRegistry::new(), options).unwrap_err();
    assert!(matches!(err, BridgeError::MissingExport(name) if name == "heap"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Growth
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_grow_then_access() {
    let mut b = bridge(&growable_guest(3));
    assert_eq!(b.pages(), 1);
    let generation = b.view_generation();
    assert!(b.allocate(70_000, false).is_err());

    b.grow_memory(1).unwrap();
    assert_eq!(b.pages(), 2);
    assert!(b.view_generation() > generation);
    assert_eq!(b.u8().len(), 2 * PAGE_SIZE);

    let big = b.allocate(70_000, true).unwrap();
    b.write::<u32>(big.addr + 69_996, 0xfeed_f00d).unwrap();
    assert_eq!(b.read::<u32>(big.addr + 69_996).unwrap(), 0xfeed_f00d);
    assert_eq!(b.u32().get((big.addr as usize + 69_996) / 4), Some(0xfeed_f00d));
}

#[test]
fn test_failed_growth_changes_nothing() {
    let mut b = bridge(&growable_guest(2));
    b.write::<u16>(10, 77).unwrap();
    let generation = b.view_generation();

    let err = b.grow_memory(5).unwrap_err();
    assert!(matches!(err, BridgeError::GrowFailed { pages: 5, .. }));
    assert_eq!(b.pages(), 1);
    assert_eq!(b.view_generation(), generation);
    assert_eq!(b.read::<u16>(10).unwrap(), 77);
}

#[test]
fn test_ensure_views_is_idempotent() {
    let b = bridge(&bare_guest());
    let generation = b.view_generation();
    b.ensure_views();
    b.ensure_views();
    assert_eq!(b.view_generation(), generation);
}

// ══════════════════════════════════════════════════════════════════════════════
// Typed access
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_views_share_one_buffer() {
    let mut b = bridge(&bare_guest());
    b.write::<f32>(64, 1.5).unwrap();
    b.write::<i64>(72, -2).unwrap();

    assert_eq!(b.f32().get(16), Some(1.5));
    assert_eq!(b.u8().subarray(64, 68).unwrap().to_vec(), 1.5f32.to_le_bytes());
    assert_eq!(b.i64().get(9), Some(-2));
    assert_eq!(b.u64().get(9), Some(u64::MAX - 1));
    assert_eq!(b.i32().len(), PAGE_SIZE / 4);

    let mut words = b.view_mut::<u16>();
    assert!(words.set(50, 0x0102));
    assert_eq!(b.u8().get(100), Some(0x02));
}

#[test]
fn test_out_of_bounds_access() {
    let mut b = bridge(&bare_guest());
    let edge = (PAGE_SIZE - 2) as u32;
    assert!(matches!(b.read::<u32>(edge), Err(BridgeError::OutOfBounds { addr, len: 4 }) if addr == edge));
    assert!(b.write::<u64>(edge, 1).is_err());
    assert!(b.read::<u16>(edge).is_ok());
}

// ══════════════════════════════════════════════════════════════════════════════
// Core API
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_core_prints() {
    let mut b = bridge(&printing_guest());
    b.call::<i32, ()>("say", -7).unwrap();
    b.call::<(), ()>("say_bytes", ()).unwrap();
    b.call::<(), ()>("shout", ()).unwrap();
    assert_eq!(b.output(), ["-7", "[1, 2, 3]", "hello"]);
    assert_eq!(b.take_output().len(), 3);
    assert!(b.output().is_empty());
}

#[test]
fn test_guest_panic_traps() {
    let mut b = bridge(&printing_guest());
    let err = b.call::<(), ()>("boom", ()).unwrap_err();
    assert!(matches!(err, BridgeError::Wasm(_)));
    assert_eq!(b.host().panic_message(), Some("oh no"));
}

#[test]
fn test_missing_export() {
    let mut b = bridge(&printing_guest());
    assert!(matches!(
        b.call::<(), ()>("nope", ()),
        Err(BridgeError::MissingExport(name)) if name == "nope"
    ));
    assert!(b.has_export("say"));
    assert!(b.has_export("memory"));
}

#[test]
fn test_unknown_import_fails_instantiation() {
    let mut g = Guest::new();
    g.import("doesNotExist", &[ValType::I32], &[]);
    let err = WasmBridge::instantiate(&g.finish(), &ApiRegistry::new()).unwrap_err();
    assert!(matches!(err, BridgeError::Wasm(_)));
}
