//! Typed instance views over laid-out schemas.

mod common;

use common::bare_guest;
use wasmapi_layout::{compute_layout, LayoutOptions};
use wasmapi_runtime::{ApiRegistry, BridgeError, MemorySlice, WasmBridge, WasmType};
use wasmapi_types::{
    Enum, EnumValue, Field, Primitive, StringType, Struct, TopLevelType, TypeCollection, WASM64,
};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn geometry() -> Vec<TopLevelType> {
    vec![
        Struct::new("Point", vec![Field::scalar("x", "f32"), Field::scalar("y", "f32")]).into(),
        Struct::new("Line", vec![Field::scalar("a", "Point"), Field::scalar("b", "Point")]).into(),
    ]
}

fn laid_out(types: Vec<TopLevelType>) -> TypeCollection {
    let coll = TypeCollection::from_types(types).unwrap();
    compute_layout(coll, &LayoutOptions::default()).unwrap()
}

fn bridge() -> WasmBridge {
    WasmBridge::instantiate(&bare_guest(), &ApiRegistry::new()).unwrap()
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_line_at_address_1000() {
    let coll = laid_out(geometry());
    let mut b = bridge();
    let line = WasmType::new(&coll, "Line").unwrap();
    assert_eq!((line.size(), line.align()), (16, 4));

    let inst = line.instance(1000);
    let a = inst.nested("a").unwrap();
    let bp = inst.nested("b").unwrap();
    assert_eq!((a.base(), bp.base()), (1000, 1008));
    assert_eq!(bp.field_addr("y").unwrap(), 1012);

    a.set::<f32>(&mut b, "x", 1.25).unwrap();
    bp.set::<f32>(&mut b, "y", 4.5).unwrap();
    assert_eq!(b.read::<f32>(1000).unwrap(), 1.25);
    assert_eq!(b.read::<f32>(1012).unwrap(), 4.5);
    assert_eq!(b.f32().get(1012 / 4), Some(4.5));

    b.write::<f32>(1004, -3.0).unwrap();
    assert_eq!(a.get::<f32>(&b, "y").unwrap(), -3.0);
    assert_eq!(inst.bytes(&b).unwrap().len(), 16);
}

#[test]
fn test_instance_arrays_step_by_size() {
    let coll = laid_out(geometry());
    let point = WasmType::new(&coll, "Point").unwrap();
    let bases: Vec<u32> = point.instance_array(2000, 3).unwrap().map(|p| p.base()).collect();
    assert_eq!(bases, [2000, 2008, 2016]);
}

#[test]
fn test_field_kinds() {
    let coll = laid_out(vec![
        Enum::new(
            "Kind",
            Primitive::U32,
            vec![EnumValue::from("leaf"), EnumValue::from("branch")],
        )
        .into(),
        Struct::new(
            "Rec",
            vec![
                Field::scalar("kind", "Kind"),
                Field::array("vals", "u16", 3),
                Field::slice("data", "u8"),
                Field::ptr("next", "Rec").optional(),
            ],
        )
        .into(),
    ]);
    let mut b = bridge();
    let rec = WasmType::new(&coll, "Rec").unwrap().instance(4096);

    rec.set::<u32>(&mut b, "kind", 1).unwrap();
    assert_eq!(b.read::<u32>(4096).unwrap(), 1);

    rec.set_element::<u16>(&mut b, "vals", 2, 7).unwrap();
    assert_eq!(b.read::<u16>(4100 + 4).unwrap(), 7);
    assert_eq!(rec.element::<u16>(&b, "vals", 2).unwrap(), 7);
    assert!(matches!(rec.element::<u16>(&b, "vals", 3), Err(BridgeError::OutOfBounds { .. })));

    let data = rec.field_addr("data").unwrap();
    b.write::<u32>(data, 2000).unwrap();
    b.write::<u32>(data + 4, 5).unwrap();
    assert_eq!(rec.slice(&b, "data").unwrap(), MemorySlice::new(2000, 5));

    rec.set::<u32>(&mut b, "next", 4096).unwrap();
    assert_eq!(rec.get::<u32>(&b, "next").unwrap(), 4096);
}

#[test]
fn test_mismatches_are_reported() {
    let coll = laid_out(geometry());
    let b = bridge();
    let point = WasmType::new(&coll, "Point").unwrap().instance(0);

    assert!(matches!(
        point.get::<u32>(&b, "x"),
        Err(BridgeError::TypeMismatch { ref expected, .. }) if expected == "u32"
    ));
    assert!(matches!(
        point.get::<f32>(&b, "z"),
        Err(BridgeError::UnknownField { ref field, .. }) if field == "z"
    ));
    assert!(matches!(point.element::<f32>(&b, "x", 0), Err(BridgeError::TypeMismatch { .. })));
    assert!(matches!(point.nested("x"), Err(BridgeError::TypeMismatch { .. })));
    assert!(matches!(point.slice(&b, "x"), Err(BridgeError::TypeMismatch { .. })));
}

#[test]
fn test_type_lookup_errors() {
    let coll = laid_out(geometry());
    assert!(matches!(WasmType::new(&coll, "Nope"), Err(BridgeError::UnknownType(_))));

    let raw = TypeCollection::from_types(geometry()).unwrap();
    assert!(matches!(WasmType::new(&raw, "Line"), Err(BridgeError::NotLaidOut(_))));
}

// ══════════════════════════════════════════════════════════════════════════════
// Address limits and field kinds
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_addresses_near_u32_max_are_out_of_bounds() {
    let coll = laid_out(vec![
        Struct::new("Point", vec![Field::scalar("x", "f32"), Field::scalar("y", "f32")]).into(),
        Struct::new("Buf", vec![Field::array("data", "u16", 4)]).into(),
    ]);
    let b = bridge();
    let point = WasmType::new(&coll, "Point").unwrap();

    let top = point.instance(u32::MAX - 2);
    assert!(matches!(top.field_addr("y"), Err(BridgeError::OutOfBounds { .. })));
    assert!(matches!(top.get::<f32>(&b, "y"), Err(BridgeError::OutOfBounds { .. })));
    assert!(matches!(top.nested("y"), Err(BridgeError::TypeMismatch { .. })));

    assert!(matches!(point.instance_array(u32::MAX - 8, 2), Err(BridgeError::OutOfBounds { .. })));
    assert!(matches!(point.instance_array(0, u32::MAX), Err(BridgeError::OutOfBounds { .. })));
    assert_eq!(point.instance_array(u32::MAX - 16, 2).unwrap().count(), 2);

    let buf = WasmType::new(&coll, "Buf").unwrap().instance(u32::MAX - 3);
    assert!(matches!(buf.element::<u16>(&b, "data", 3), Err(BridgeError::OutOfBounds { .. })));
    assert!(matches!(buf.element::<u16>(&b, "data", u32::MAX), Err(BridgeError::OutOfBounds { .. })));
}

#[test]
fn test_only_slice_fields_read_as_slices() {
    let coll = laid_out(vec![
        Struct::new("Point", vec![Field::scalar("x", "f32"), Field::scalar("y", "f32")]).into(),
        Struct::new(
            "Wide",
            vec![
                Field::scalar("big", "u64"),
                Field::scalar("real", "f64"),
                Field::array("pair", "u32", 2),
                Field::scalar("at", "Point"),
                Field::scalar("name", "string"),
                Field::slice("bytes", "u8"),
            ],
        )
        .into(),
    ]);
    let mut b = bridge();
    let wide = WasmType::new(&coll, "Wide").unwrap().instance(3000);
    for name in ["big", "real", "pair", "at"] {
        assert!(
            matches!(wide.slice(&b, name), Err(BridgeError::TypeMismatch { .. })),
            "`{name}` read as a slice"
        );
    }

    let name = wide.field_addr("name").unwrap();
    b.write::<u32>(name, 100).unwrap();
    b.write::<u32>(name + 4, 3).unwrap();
    assert_eq!(wide.slice(&b, "name").unwrap(), MemorySlice::new(100, 3));
    assert!(wide.slice(&b, "bytes").is_ok());
}

#[test]
fn test_pointer_strings_are_not_slices() {
    let coll = TypeCollection::from_types(vec![Struct::new(
        "Named",
        vec![Field::scalar("name", "string"), Field::scalar("len", "u32")],
    )
    .into()])
    .unwrap();
    let opts = LayoutOptions::default().with_string_type(StringType::Ptr);
    let coll = compute_layout(coll, &opts).unwrap();
    let b = bridge();
    let named = WasmType::new(&coll, "Named").unwrap().instance(0);
    assert!(matches!(named.slice(&b, "name"), Err(BridgeError::TypeMismatch { .. })));
}

#[test]
fn test_wasm64_layouts_are_rejected() {
    let coll = TypeCollection::from_types(geometry()).unwrap();
    let coll = compute_layout(coll, &LayoutOptions::new(WASM64)).unwrap();
    match WasmType::new(&coll, "Line") {
        Err(BridgeError::UnsupportedTarget(t)) => assert_eq!(t.target, WASM64),
        other => panic!("expected UnsupportedTarget, got {:?}", other.map(|t| t.name())),
    }
}
