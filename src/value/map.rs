use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::types::Value;
use crate::{StoreError, StoreResult};

/// Hashable key subset of [`Value`], usable as a mapping key or set
/// element.
///
/// A key renders to a canonical container name via [`MapKey::to_name`];
/// the key's kind tag is recorded alongside so `1`, `1.0` and `"1"`
/// reconstruct as distinct keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(OrderedFloat<f64>),
    Str(String),
    Bytes(Vec<u8>),
}

impl MapKey {
    /// Canonical text rendering used as a child name (before path
    /// escaping). Float keys always carry a decimal point, exponent or
    /// non-finite spelling so they can never collide with integer keys
    /// of the same magnitude; byte keys render as lowercase hex.
    pub fn to_name(&self) -> String {
        match self {
            MapKey::Bool(b) => b.to_string(),
            MapKey::Int(i) => i.to_string(),
            MapKey::UInt(u) => u.to_string(),
            MapKey::Float(f) => {
                let s = f.0.to_string();
                if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
                    format!("{s}.0")
                } else {
                    s
                }
            }
            MapKey::Str(s) => s.clone(),
            MapKey::Bytes(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
        }
    }

    /// Kind tag stored in the per-key type attribute.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            MapKey::Bool(_) => "bool",
            MapKey::Int(_) => "int",
            MapKey::UInt(_) => "uint",
            MapKey::Float(_) => "float",
            MapKey::Str(_) => "str",
            MapKey::Bytes(_) => "bytes",
        }
    }

    /// Rebuilds a key from its canonical name and recorded kind tag.
    pub fn from_name(name: &str, kind_tag: &str) -> StoreResult<MapKey> {
        let bad = |reason: &str| {
            StoreError::Corrupted {
                location: name.to_string(),
                reason: reason.to_string(),
            }
        };
        match kind_tag {
            "bool" => match name {
                "true" => Ok(MapKey::Bool(true)),
                "false" => Ok(MapKey::Bool(false)),
                _ => Err(bad("not a boolean key")),
            },
            "int" => name
                .parse::<i64>()
                .map(MapKey::Int)
                .map_err(|_| bad("not an integer key")),
            "uint" => name
                .parse::<u64>()
                .map(MapKey::UInt)
                .map_err(|_| bad("not an unsigned key")),
            "float" => name
                .parse::<f64>()
                .map(|f| MapKey::Float(OrderedFloat(f)))
                .map_err(|_| bad("not a float key")),
            "str" => Ok(MapKey::Str(name.to_string())),
            "bytes" => {
                if name.len() % 2 != 0 {
                    return Err(bad("odd hex length for bytes key"));
                }
                let mut out = Vec::with_capacity(name.len() / 2);
                let digits = name.as_bytes();
                for pair in digits.chunks(2) {
                    let hex = std::str::from_utf8(pair).map_err(|_| bad("bad hex"))?;
                    out.push(u8::from_str_radix(hex, 16).map_err(|_| bad("bad hex"))?);
                }
                Ok(MapKey::Bytes(out))
            }
            other => Err(bad(&format!("unknown key kind tag {other:?}"))),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

impl From<i64> for MapKey {
    fn from(i: i64) -> Self {
        MapKey::Int(i)
    }
}

impl From<f64> for MapKey {
    fn from(f: f64) -> Self {
        MapKey::Float(OrderedFloat(f))
    }
}

/// A mapping that preserves insertion order of its keys.
///
/// Inserting an existing key replaces the value in place without moving
/// the key. Lookup is a linear scan; these maps mirror user data and
/// stay small.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedMap {
    entries: Vec<(MapKey, Value)>,
}

impl OrderedMap {
    pub fn new() -> Self {
        OrderedMap::default()
    }

    pub fn insert(&mut self, key: MapKey, value: Value) -> Option<Value> {
        for (k, v) in &mut self.entries {
            if *k == key {
                return Some(std::mem::replace(v, value));
            }
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<(MapKey, Value)> for OrderedMap {
    fn from_iter<T: IntoIterator<Item = (MapKey, Value)>>(iter: T) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Int 1, float 1.0 and text "1" render to distinct names.
    #[test]
    fn test_key_names_distinct() {
        let int_name = MapKey::Int(1).to_name();
        let float_name = MapKey::Float(OrderedFloat(1.0)).to_name();
        let str_name = MapKey::Str("1".into()).to_name();
        assert_eq!(int_name, "1");
        assert_eq!(float_name, "1.0");
        assert_eq!(str_name, "1");
        assert_ne!(float_name, int_name);
        // int and str do collide by name; the kind tag keeps them apart.
        assert_ne!(MapKey::Int(1).kind_tag(), MapKey::Str("1".into()).kind_tag());
    }

    /// Every key kind reconstructs from name + tag.
    #[test]
    fn test_key_name_roundtrip() {
        let keys = vec![
            MapKey::Bool(true),
            MapKey::Int(-42),
            MapKey::UInt(18_000_000_000_000_000_000),
            MapKey::Float(OrderedFloat(2.5e-3)),
            MapKey::Float(OrderedFloat(-7.0)),
            MapKey::Str("hello/world".into()),
            MapKey::Bytes(vec![0, 255, 16]),
        ];
        for key in keys {
            let name = key.to_name();
            let back = MapKey::from_name(&name, key.kind_tag()).unwrap();
            assert_eq!(back, key);
        }
    }

    /// Insertion order survives replacement of an existing key.
    #[test]
    fn test_ordered_map_replace_keeps_order() {
        let mut map = OrderedMap::new();
        map.insert(MapKey::from("a"), Value::I64(1));
        map.insert(MapKey::from("b"), Value::I64(2));
        map.insert(MapKey::from("a"), Value::I64(3));
        let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![MapKey::from("a"), MapKey::from("b")]);
        assert_eq!(map.get(&MapKey::from("a")), Some(&Value::I64(3)));
    }
}
