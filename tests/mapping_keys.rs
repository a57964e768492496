//! Mapping key handling: escaping, collision detection, and key-type
//! preservation through the per-key kind attributes.

use std::collections::{HashMap, HashSet};

use hivestore::{read, write, MapKey, MemStore, Options, StoreError, Value};

#[test]
fn test_key_with_path_separator() {
    // {"a/b": 3} written at /root reads back with exactly one key, the
    // literal string "a/b".
    let mut map = HashMap::new();
    map.insert(MapKey::Str("a/b".into()), Value::I64(3));

    let mut store = MemStore::new();
    let options = Options::default();
    write(&mut store, &Value::Map(map), "/root", &options).unwrap();

    match read(&store, "/root", &options).unwrap() {
        Value::Map(m) => {
            assert_eq!(m.len(), 1);
            assert_eq!(m.get(&MapKey::Str("a/b".into())), Some(&Value::I64(3)));
        }
        other => panic!("expected a mapping back, got {other:?}"),
    }
}

#[test]
fn test_awkward_key_strings() {
    let keys = [
        "",
        ".",
        "..",
        "...leading.periods",
        "back\\slash",
        "nul\u{0}byte",
        "\\x2f",
        "mixed/\\.everything",
    ];
    let mut map = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        map.insert(MapKey::Str(key.to_string()), Value::I64(i as i64));
    }
    let mut store = MemStore::new();
    let options = Options::default();
    write(&mut store, &Value::Map(map.clone()), "/m", &options).unwrap();
    assert_eq!(read(&store, "/m", &options).unwrap(), Value::Map(map));
}

#[test]
fn test_key_name_collision_is_an_error() {
    // Int 1 and text "1" render to the same container name; the write
    // must fail instead of silently dropping an entry.
    let mut map = HashMap::new();
    map.insert(MapKey::Int(1), Value::Str("int".into()));
    map.insert(MapKey::Str("1".into()), Value::Str("text".into()));

    let mut store = MemStore::new();
    let result = write(&mut store, &Value::Map(map), "/m", &Options::default());
    assert!(matches!(result, Err(StoreError::Collision(_))));
}

#[test]
fn test_int_and_float_keys_stay_distinct() {
    let mut map = HashMap::new();
    map.insert(MapKey::Int(1), Value::Str("int".into()));
    map.insert(MapKey::Float(1.0.into()), Value::Str("float".into()));

    let mut store = MemStore::new();
    let options = Options::default();
    write(&mut store, &Value::Map(map), "/m", &options).unwrap();
    match read(&store, "/m", &options).unwrap() {
        Value::Map(m) => {
            assert_eq!(m.get(&MapKey::Int(1)), Some(&Value::Str("int".into())));
            assert_eq!(
                m.get(&MapKey::Float(1.0.into())),
                Some(&Value::Str("float".into()))
            );
        }
        other => panic!("expected a mapping back, got {other:?}"),
    }
}

#[test]
fn test_set_roundtrip_ignores_storage_order() {
    let set: HashSet<MapKey> = [MapKey::Int(1), MapKey::Int(2), MapKey::Int(3)]
        .into_iter()
        .collect();
    let mut store = MemStore::new();
    let options = Options::default();
    write(&mut store, &Value::Set(set.clone()), "/s", &options).unwrap();
    match read(&store, "/s", &options).unwrap() {
        Value::Set(back) => assert_eq!(back, set),
        other => panic!("expected a set back, got {other:?}"),
    }
}

#[test]
fn test_nested_mapping_values() {
    let mut inner = HashMap::new();
    inner.insert(MapKey::from("count"), Value::U32(2));
    let mut outer = HashMap::new();
    outer.insert(MapKey::from("inner"), Value::Map(inner));
    outer.insert(
        MapKey::from("items"),
        Value::List(vec![Value::I64(1), Value::I64(2)]),
    );

    let mut store = MemStore::new();
    let options = Options::default();
    write(&mut store, &Value::Map(outer.clone()), "/cfg", &options).unwrap();
    assert_eq!(read(&store, "/cfg", &options).unwrap(), Value::Map(outer));
}
