//! Layout properties over synthetic primitive-only structs.

use proptest::prelude::*;
use wasmapi_layout::{align_up, compute_layout, LayoutOptions};
use wasmapi_types::{Field, Primitive, Struct, TypeCollection};

fn primitives() -> impl Strategy<Value = Vec<Primitive>> {
    prop::collection::vec(prop::sample::select(Primitive::ALL.to_vec()), 1..12)
}

fn struct_of(name: &str, prims: &[Primitive], auto: bool) -> Struct {
    let fields = prims
        .iter()
        .enumerate()
        .map(|(i, p)| Field::scalar(format!("f{i}"), *p))
        .collect();
    let s = Struct::new(name, fields);
    if auto {
        s.auto_packed()
    } else {
        s
    }
}

proptest! {
    #[test]
    fn natural_offsets_are_minimal_aligned(prims in primitives()) {
        let coll = TypeCollection::from_types(vec![struct_of("S", &prims, false).into()]).unwrap();
        let coll = compute_layout(coll, &LayoutOptions::default()).unwrap();
        let ty = coll.get("S").unwrap();

        let mut end = 0;
        for (field, prim) in ty.fields().unwrap().iter().zip(&prims) {
            let align = field.info.align.unwrap();
            prop_assert_eq!(align, prim.size_bytes());
            prop_assert_eq!(field.info.offset.unwrap(), align_up(end, align));
            end = field.info.offset.unwrap() + field.info.size.unwrap();
        }
        let (size, align) = (ty.info().size.unwrap(), ty.info().align.unwrap());
        prop_assert_eq!(size % align, 0);
        prop_assert_eq!(size, align_up(end, align));
    }

    #[test]
    fn auto_pack_leaves_only_trailing_padding(prims in primitives()) {
        let coll = TypeCollection::from_types(vec![
            struct_of("Natural", &prims, false).into(),
            struct_of("Packed", &prims, true).into(),
        ])
        .unwrap();
        let coll = compute_layout(coll, &LayoutOptions::default()).unwrap();
        let packed = coll.get("Packed").unwrap();

        let mut end = 0;
        let mut last_align = u32::MAX;
        for field in packed.fields().unwrap() {
            prop_assert_eq!(field.info.offset.unwrap(), end);
            prop_assert!(field.info.align.unwrap() <= last_align);
            last_align = field.info.align.unwrap();
            end += field.info.size.unwrap();
        }
        let size = packed.info().size.unwrap();
        prop_assert!(size - end < packed.info().align.unwrap());
        prop_assert!(size <= coll.get("Natural").unwrap().info().size.unwrap());
    }
}
