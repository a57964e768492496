//! Validation and flattening for the legacy-format bridge.
//!
//! Older binary layouts are handled by an external reader/writer that
//! only understands a flat, depth-zero mapping of variable names to
//! values. The marshaling engine never serializes those formats itself;
//! this module checks that a value is expressible in that shape and
//! flattens it into the name/value pairs the bridge is handed.

use tracing::debug;

use crate::{
    value::{MapKey, OrderedMap, Value},
    StoreError, StoreResult,
};

/// Whether `name` is a valid legacy variable name: a non-empty ASCII
/// identifier that does not start with a digit.
fn valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `value` fits in a single legacy variable slot. Nested
/// containers would need the hierarchical layout, which the bridge
/// cannot express.
fn depth_zero(value: &Value) -> bool {
    !matches!(
        value,
        Value::List(_)
            | Value::Tuple(_)
            | Value::Set(_)
            | Value::Map(_)
            | Value::OrdMap(_)
    )
}

/// Flattens a top-level mapping into the name/value pairs handed to the
/// legacy bridge, in entry order for ordered mappings and canonical key
/// order otherwise.
///
/// Fails if the value is not a mapping, if any key is not a legal
/// variable name, or if any entry would itself need nesting.
pub fn flatten_for_legacy(value: &Value) -> StoreResult<Vec<(String, Value)>> {
    let entries: Vec<(&MapKey, &Value)> = match value {
        Value::OrdMap(map) => map.iter().collect(),
        Value::Map(map) => {
            let mut entries: Vec<(&MapKey, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| (k.kind_tag(), k.to_name()));
            entries
        }
        other => {
            return Err(StoreError::UnsupportedValue(format!(
                "legacy formats hold a mapping at the top level, not {:?}",
                other.kind()
            )))
        }
    };
    let mut out = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let name = match key {
            MapKey::Str(s) => s.clone(),
            other => {
                return Err(StoreError::UnsupportedValue(format!(
                    "legacy variable names must be text, got a {} key",
                    other.kind_tag()
                )))
            }
        };
        if !valid_variable_name(&name) {
            return Err(StoreError::Path(format!(
                "{name:?} is not a legal legacy variable name"
            )));
        }
        if !depth_zero(entry) {
            return Err(StoreError::UnsupportedValue(format!(
                "legacy variable {name:?} holds a nested container"
            )));
        }
        out.push((name, entry.clone()));
    }
    debug!(variables = out.len(), "flattened mapping for legacy bridge");
    Ok(out)
}

/// Rebuilds the mapping a legacy bridge returned, preserving the
/// bridge's variable order.
pub fn mapping_from_legacy(entries: Vec<(String, Value)>) -> StoreResult<Value> {
    let mut map = OrderedMap::new();
    for (name, value) in entries {
        if !valid_variable_name(&name) {
            return Err(StoreError::Path(format!(
                "{name:?} is not a legal legacy variable name"
            )));
        }
        if map.insert(MapKey::Str(name.clone()), value).is_some() {
            return Err(StoreError::Collision(format!(
                "legacy bridge returned variable {name:?} twice"
            )));
        }
    }
    Ok(Value::OrdMap(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A flat text-keyed mapping flattens in entry order.
    #[test]
    fn test_flatten_ordered() {
        let mut map = OrderedMap::new();
        map.insert(MapKey::from("b"), Value::I64(2));
        map.insert(MapKey::from("a"), Value::I64(1));
        let flat = flatten_for_legacy(&Value::OrdMap(map)).unwrap();
        let names: Vec<&str> = flat.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    /// Names a legacy consumer cannot accept are rejected up front.
    #[test]
    fn test_invalid_names() {
        for name in ["", "1abc", "a/b", "no-dash"] {
            let mut map = OrderedMap::new();
            map.insert(MapKey::Str(name.into()), Value::I64(0));
            let result = flatten_for_legacy(&Value::OrdMap(map));
            assert!(result.is_err(), "{name:?} should be rejected");
        }
    }

    /// Nested containers cannot cross the bridge.
    #[test]
    fn test_nested_rejected() {
        let mut map = OrderedMap::new();
        map.insert(MapKey::from("xs"), Value::List(vec![Value::I64(1)]));
        let result = flatten_for_legacy(&Value::OrdMap(map));
        assert!(matches!(result, Err(StoreError::UnsupportedValue(_))));
    }

    /// Non-mapping top-level values are not legacy material.
    #[test]
    fn test_top_level_must_be_mapping() {
        let result = flatten_for_legacy(&Value::I64(3));
        assert!(matches!(result, Err(StoreError::UnsupportedValue(_))));
    }

    /// The bridge's returned variables rebuild into an ordered mapping.
    #[test]
    fn test_roundtrip_through_bridge() {
        let entries = vec![
            ("x".to_string(), Value::F64(1.5)),
            ("y".to_string(), Value::Str("hi".into())),
        ];
        let value = mapping_from_legacy(entries.clone()).unwrap();
        let flat = flatten_for_legacy(&value).unwrap();
        assert_eq!(flat, entries);
    }
}
