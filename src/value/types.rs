use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{Complex64, ElementType, MapKey, NdArray, OrderedMap};

/// Represents a generic value handled by the marshaling engine.
///
/// This is the universal input/output type: scalars of every fixed
/// width, text and byte strings, n-dimensional arrays (including
/// structured record layouts), ordered and unordered collections,
/// key-ordered and key-unordered mappings, calendar values, rationals,
/// range/slice descriptors and type descriptors themselves.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// Absence of a value.
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Complex(Complex64),
    /// Variable-length text.
    Str(String),
    /// Variable-length byte string.
    Bytes(Vec<u8>),
    /// An n-dimensional array with a rich element descriptor.
    Array(NdArray),
    /// An ordered sequence.
    List(Vec<Value>),
    /// An ordered sequence distinct in kind from `List`; the
    /// distinction survives native-mode round-trips only.
    Tuple(Vec<Value>),
    /// An unordered set of hashable elements.
    Set(HashSet<MapKey>),
    /// A mapping with no key order guarantee.
    Map(HashMap<MapKey, Value>),
    /// A mapping that preserves key insertion order.
    OrdMap(OrderedMap),
    Date(NaiveDate),
    Time(NaiveTime),
    /// A combined date-time with an optional UTC offset in seconds.
    DateTime {
        naive: NaiveDateTime,
        offset_seconds: Option<i32>,
    },
    /// An elapsed time as a normalized (days, seconds, microseconds)
    /// triple.
    Duration {
        days: i64,
        seconds: i64,
        micros: i64,
    },
    /// A bare timezone offset, seconds east of UTC.
    TzOffset(i32),
    /// A rational number as a signed numerator/denominator pair.
    Rational { num: i64, den: i64 },
    /// A fully specified integer range.
    Range { start: i64, stop: i64, step: i64 },
    /// A slice descriptor; any endpoint may be absent.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// A type descriptor standing for an element schema itself.
    Dtype(ElementType),
}

/// The coarse kind of a [`Value`], used for marshaler dispatch and
/// custom overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    Complex,
    Str,
    Bytes,
    /// Array with a structured record element layout.
    RecordArray,
    /// Array with any other element layout.
    Array,
    List,
    Tuple,
    Set,
    Map,
    OrdMap,
    Date,
    Time,
    DateTime,
    Duration,
    TzOffset,
    Rational,
    Range,
    Slice,
    Dtype,
}

impl Value {
    /// The dispatch kind of this value. Record arrays report their own
    /// kind so they can be matched ahead of the generic array rule.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I8(_) | Value::I16(_) | Value::I32(_) | Value::I64(_) => ValueKind::Int,
            Value::U8(_) | Value::U16(_) | Value::U32(_) | Value::U64(_) => ValueKind::UInt,
            Value::F32(_) | Value::F64(_) => ValueKind::Float,
            Value::Complex(_) => ValueKind::Complex,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Array(arr) => match arr.elem() {
                ElementType::Record(_) => ValueKind::RecordArray,
                _ => ValueKind::Array,
            },
            Value::List(_) => ValueKind::List,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
            Value::OrdMap(_) => ValueKind::OrdMap,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::DateTime { .. } => ValueKind::DateTime,
            Value::Duration { .. } => ValueKind::Duration,
            Value::TzOffset(_) => ValueKind::TzOffset,
            Value::Rational { .. } => ValueKind::Rational,
            Value::Range { .. } => ValueKind::Range,
            Value::Slice { .. } => ValueKind::Slice,
            Value::Dtype(_) => ValueKind::Dtype,
        }
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(b) => Value::Bool(b),
            MapKey::Int(i) => Value::I64(i),
            MapKey::UInt(u) => Value::U64(u),
            MapKey::Float(f) => Value::F64(f.0),
            MapKey::Str(s) => Value::Str(s),
            MapKey::Bytes(b) => Value::Bytes(b),
        }
    }
}

impl TryFrom<Value> for MapKey {
    type Error = crate::StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        use ordered_float::OrderedFloat;
        match value {
            Value::Bool(b) => Ok(MapKey::Bool(b)),
            Value::I8(i) => Ok(MapKey::Int(i64::from(i))),
            Value::I16(i) => Ok(MapKey::Int(i64::from(i))),
            Value::I32(i) => Ok(MapKey::Int(i64::from(i))),
            Value::I64(i) => Ok(MapKey::Int(i)),
            Value::U8(u) => Ok(MapKey::UInt(u64::from(u))),
            Value::U16(u) => Ok(MapKey::UInt(u64::from(u))),
            Value::U32(u) => Ok(MapKey::UInt(u64::from(u))),
            Value::U64(u) => Ok(MapKey::UInt(u)),
            Value::F32(f) => Ok(MapKey::Float(OrderedFloat(f64::from(f)))),
            Value::F64(f) => Ok(MapKey::Float(OrderedFloat(f))),
            Value::Str(s) => Ok(MapKey::Str(s)),
            Value::Bytes(b) => Ok(MapKey::Bytes(b)),
            other => Err(crate::StoreError::TypeMismatch(format!(
                "{:?} cannot be used as a mapping key",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ArrayData, RecordField, RecordLayout};

    /// Record arrays dispatch as their own kind, ahead of plain arrays.
    #[test]
    fn test_record_array_kind() {
        let layout =
            RecordLayout::new(vec![RecordField::scalar("x", ElementType::I32)]).unwrap();
        let arr = NdArray::new(
            vec![1],
            ElementType::Record(layout),
            ArrayData::Records(vec![vec![Value::I32(7)]]),
        )
        .unwrap();
        assert_eq!(Value::Array(arr).kind(), ValueKind::RecordArray);

        let plain = NdArray::new(vec![1], ElementType::I32, ArrayData::I32(vec![7])).unwrap();
        assert_eq!(Value::Array(plain).kind(), ValueKind::Array);
    }

    /// Tuple and list are distinct kinds in the value model.
    #[test]
    fn test_tuple_list_distinct() {
        let list = Value::List(vec![Value::I64(1)]);
        let tuple = Value::Tuple(vec![Value::I64(1)]);
        assert_ne!(list.kind(), tuple.kind());
        assert_ne!(list, tuple);
    }
}
