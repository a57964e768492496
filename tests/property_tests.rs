//! Property-based round-trip checks over randomly generated values.

use proptest::prelude::*;

use hivestore::{read, write, ArrayData, ElementType, MapKey, MemStore, Mode, NdArray, Options, Value};

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i8>().prop_map(Value::I8),
        any::<i64>().prop_map(Value::I64),
        any::<u16>().prop_map(Value::U16),
        any::<u64>().prop_map(Value::U64),
        proptest::num::f64::NORMAL.prop_map(Value::F64),
        ".*".prop_map(Value::Str),
        proptest::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

fn roundtrip(value: &Value, options: &Options) -> Value {
    let mut store = MemStore::new();
    write(&mut store, value, "/v", options).unwrap();
    read(&store, "/v", options).unwrap()
}

proptest! {
    /// Every generated scalar survives a native-mode round trip.
    #[test]
    fn prop_scalar_roundtrip(value in scalar_value()) {
        prop_assert_eq!(roundtrip(&value, &Options::default()), value);
    }

    /// Flat lists of scalars survive a native-mode round trip.
    #[test]
    fn prop_list_roundtrip(values in proptest::collection::vec(scalar_value(), 0..8)) {
        let value = Value::List(values);
        prop_assert_eq!(roundtrip(&value, &Options::default()), value);
    }

    /// Text-keyed mappings survive a native-mode round trip whatever
    /// the key strings contain.
    #[test]
    fn prop_string_map_roundtrip(
        entries in proptest::collection::hash_map(".*", scalar_value(), 0..8)
    ) {
        let map: std::collections::HashMap<MapKey, Value> = entries
            .into_iter()
            .map(|(k, v)| (MapKey::Str(k), v))
            .collect();
        let value = Value::Map(map);
        prop_assert_eq!(roundtrip(&value, &Options::default()), value);
    }

    /// Rank-2 integer arrays round-trip under the consumer convention:
    /// the double axis reversal is the identity.
    #[test]
    fn prop_matlab_matrix_roundtrip(
        rows in 1usize..5,
        cols in 0usize..5,
        seed in any::<i32>(),
    ) {
        let data: Vec<i32> = (0..rows * cols).map(|i| seed.wrapping_add(i as i32)).collect();
        let arr = NdArray::new(vec![rows, cols], ElementType::I32, ArrayData::I32(data)).unwrap();
        let options = Options::builder().mode(Mode::Matlab).build().unwrap();
        let back = roundtrip(&Value::Array(arr.clone()), &options);
        prop_assert_eq!(back, Value::Array(arr));
    }

    /// Set elements survive regardless of hash iteration order.
    #[test]
    fn prop_set_roundtrip(elements in proptest::collection::hash_set(any::<i64>(), 0..16)) {
        let set: std::collections::HashSet<MapKey> =
            elements.into_iter().map(MapKey::Int).collect();
        let value = Value::Set(set);
        prop_assert_eq!(roundtrip(&value, &Options::default()), value);
    }
}
