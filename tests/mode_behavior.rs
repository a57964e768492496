//! Behavior differences between the three compatibility modes: which
//! attributes appear, how shapes are normalized, and what the
//! documented lossy reads look like.

use hivestore::{
    read, write, ArrayData, AttrValue, ElementType, HierStore, MemStore, Mode, NdArray, NodeId,
    Options, Value,
};

fn options(mode: Mode) -> Options {
    Options::builder().mode(mode).build().unwrap()
}

fn node_at(store: &MemStore, name: &str) -> NodeId {
    store.child(store.root(), name).unwrap().unwrap()
}

#[test]
fn test_attribute_families_per_mode() {
    let value = Value::F64(2.5);

    let mut native = MemStore::new();
    write(&mut native, &value, "/x", &options(Mode::Native)).unwrap();
    let node = node_at(&native, "x");
    assert_eq!(
        native.get_attr(node, "hive.type").unwrap(),
        Some(AttrValue::Str("f64".into()))
    );
    assert!(native.get_attr(node, "MATLAB_class").unwrap().is_none());

    let mut matlab = MemStore::new();
    write(&mut matlab, &value, "/x", &options(Mode::Matlab)).unwrap();
    let node = node_at(&matlab, "x");
    assert!(matlab.get_attr(node, "hive.type").unwrap().is_none());
    assert_eq!(
        matlab.get_attr(node, "MATLAB_class").unwrap(),
        Some(AttrValue::Str("double".into()))
    );
    assert_eq!(
        matlab.get_attr(matlab.root(), "MATLAB_format").unwrap(),
        Some(AttrValue::Str("MATLAB 7.3".into()))
    );

    let mut bare = MemStore::new();
    write(&mut bare, &value, "/x", &options(Mode::Bare)).unwrap();
    let node = node_at(&bare, "x");
    assert!(bare.attr_names(node).unwrap().is_empty());
}

#[test]
fn test_matlab_scalar_shape_normalized() {
    let mut store = MemStore::new();
    write(&mut store, &Value::I32(7), "/n", &options(Mode::Matlab)).unwrap();
    let node = node_at(&store, "n");
    assert_eq!(store.leaf_data(node).unwrap().shape(), &[1, 1]);
    // The 1x1 leaf still reads back as the scalar it was.
    assert_eq!(
        read(&store, "/n", &options(Mode::Matlab)).unwrap(),
        Value::I32(7)
    );
}

#[test]
fn test_matlab_array_axis_order() {
    let arr = NdArray::new(
        vec![2, 3],
        ElementType::I32,
        ArrayData::I32(vec![1, 2, 3, 4, 5, 6]),
    )
    .unwrap();
    let mut store = MemStore::new();
    write(
        &mut store,
        &Value::Array(arr.clone()),
        "/m",
        &options(Mode::Matlab),
    )
    .unwrap();
    // Stored column-major: axes reversed on disk.
    let node = node_at(&store, "m");
    assert_eq!(store.leaf_data(node).unwrap().shape(), &[3, 2]);
    // Reading under the same mode undoes the reversal.
    assert_eq!(
        read(&store, "/m", &options(Mode::Matlab)).unwrap(),
        Value::Array(arr)
    );
}

#[test]
fn test_matlab_empty_array_shape() {
    let arr = NdArray::new(vec![2, 0], ElementType::F64, ArrayData::F64(Vec::new())).unwrap();
    let mut store = MemStore::new();
    write(
        &mut store,
        &Value::Array(arr.clone()),
        "/e",
        &options(Mode::Matlab),
    )
    .unwrap();
    let node = node_at(&store, "e");
    assert_eq!(
        store.get_attr(node, "MATLAB_empty").unwrap(),
        Some(AttrValue::Int(1))
    );
    assert_eq!(
        read(&store, "/e", &options(Mode::Matlab)).unwrap(),
        Value::Array(arr)
    );
}

#[test]
fn test_matlab_text_as_char_row() {
    let mut store = MemStore::new();
    write(
        &mut store,
        &Value::Str("abc".into()),
        "/s",
        &options(Mode::Matlab),
    )
    .unwrap();
    let node = node_at(&store, "s");
    let stored = store.leaf_data(node).unwrap();
    assert_eq!(stored.elem(), &ElementType::U16);
    assert_eq!(stored.shape(), &[3, 1]);
    assert_eq!(
        store.get_attr(node, "MATLAB_class").unwrap(),
        Some(AttrValue::Str("char".into()))
    );
    assert_eq!(
        read(&store, "/s", &options(Mode::Matlab)).unwrap(),
        Value::Str("abc".into())
    );
}

#[test]
fn test_bare_tuple_reads_as_list() {
    let tuple = Value::Tuple(vec![Value::I64(1), Value::Str("two".into())]);
    let mut store = MemStore::new();
    write(&mut store, &tuple, "/t", &options(Mode::Bare)).unwrap();
    let back = read(&store, "/t", &options(Mode::Bare)).unwrap();
    assert_eq!(
        back,
        Value::List(vec![Value::I64(1), Value::Str("two".into())])
    );
}

#[test]
fn test_bare_mapping_keys_degrade_to_text() {
    use hivestore::MapKey;
    let mut map = std::collections::HashMap::new();
    map.insert(MapKey::Int(7), Value::Str("seven".into()));
    let mut store = MemStore::new();
    let opts = options(Mode::Bare);
    write(&mut store, &Value::Map(map), "/m", &opts).unwrap();
    // Without key metadata the integer key reads back as its text
    // rendering.
    match read(&store, "/m", &opts).unwrap() {
        Value::Map(m) => {
            assert_eq!(m.get(&MapKey::Str("7".into())), Some(&Value::Str("seven".into())));
        }
        other => panic!("expected a mapping back, got {other:?}"),
    }
}

#[test]
fn test_bare_scalar_and_array_survive() {
    let mut store = MemStore::new();
    let opts = options(Mode::Bare);
    write(&mut store, &Value::F64(2.5), "/f", &opts).unwrap();
    assert_eq!(read(&store, "/f", &opts).unwrap(), Value::F64(2.5));

    let arr = NdArray::new(vec![4], ElementType::U8, ArrayData::U8(vec![1, 2, 3, 4])).unwrap();
    write(&mut store, &Value::Array(arr.clone()), "/a", &opts).unwrap();
    assert_eq!(read(&store, "/a", &opts).unwrap(), Value::Array(arr));
}

#[test]
fn test_no_metadata_native_still_reads_leaves() {
    let opts = Options::builder()
        .mode(Mode::Native)
        .store_metadata(false)
        .build()
        .unwrap();
    let mut store = MemStore::new();
    write(&mut store, &Value::I16(3), "/n", &opts).unwrap();
    let node = node_at(&store, "n");
    assert!(store.attr_names(node).unwrap().is_empty());
    // Without the type tag, reconstruction falls back to inference.
    assert_eq!(read(&store, "/n", &opts).unwrap(), Value::I16(3));
}

#[test]
fn test_cross_mode_read_is_best_effort() {
    // A node written under the consumer convention read back in native
    // mode: the class attribute still routes it, the value survives.
    let mut store = MemStore::new();
    write(&mut store, &Value::F64(1.25), "/x", &options(Mode::Matlab)).unwrap();
    let back = read(&store, "/x", &options(Mode::Native)).unwrap();
    assert_eq!(back, Value::F64(1.25));
}

#[test]
fn test_cross_mode_text_read_narrows() {
    // Text stored as a u16 char row under the consumer convention still
    // narrows back to a string when read in native mode.
    let mut store = MemStore::new();
    write(
        &mut store,
        &Value::Str("abc".into()),
        "/s",
        &options(Mode::Matlab),
    )
    .unwrap();
    assert_eq!(
        read(&store, "/s", &options(Mode::Native)).unwrap(),
        Value::Str("abc".into())
    );
}
