//! Marshalers for exact rationals and for integer ranges and slices.
//! All of them flatten to small i64 vectors; only the native type tag
//! distinguishes them from plain integer arrays.

use super::{array::normalize, mode::style_for, Marshaler, ReadContext, WriteContext};
use crate::{
    store::NodeId,
    value::{ArrayData, ElementType, NdArray, Value},
    StoreError, StoreResult,
};

fn i64_leaf(fields: Vec<i64>) -> StoreResult<NdArray> {
    let n = fields.len();
    NdArray::new(vec![n], ElementType::I64, ArrayData::I64(fields))
}

fn corrupted(reason: &str) -> StoreError {
    StoreError::Corrupted {
        location: "numeric node".into(),
        reason: reason.to_string(),
    }
}

/// Exact numerator/denominator pairs. A zero denominator is rejected on
/// write so stored rationals are always well formed.
pub struct RationalMarshaler;

impl Marshaler for RationalMarshaler {
    fn type_tag(&self) -> &'static str {
        "rational"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["rational"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Rational { .. })
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let (num, den) = match value {
            Value::Rational { num, den } => (*num, *den),
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a rational",
                    other.kind()
                )))
            }
        };
        if den == 0 {
            return Err(StoreError::UnsupportedValue(
                "rational with zero denominator".into(),
            ));
        }
        let style = style_for(value.kind(), cx.options.mode());
        let node = cx.place_leaf(parent, name, normalize(&i64_leaf(vec![num, den])?, &style)?)?;
        cx.annotate(node, "rational", "int64", false)?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        match cx.store.leaf_data(node)?.data() {
            ArrayData::I64(v) if v.len() == 2 && v[1] != 0 => Ok(Value::Rational {
                num: v[0],
                den: v[1],
            }),
            _ => Err(corrupted("rational payload must be two nonzero-safe i64s")),
        }
    }
}

/// Integer ranges (three mandatory fields) and slices (three optional
/// fields, stored as presence-flag/value pairs).
pub struct RangeSliceMarshaler;

impl RangeSliceMarshaler {
    fn pack_bound(bound: Option<i64>) -> [i64; 2] {
        match bound {
            Some(v) => [1, v],
            None => [0, 0],
        }
    }

    fn unpack_bound(flag: i64, value: i64) -> StoreResult<Option<i64>> {
        match flag {
            0 => Ok(None),
            1 => Ok(Some(value)),
            _ => Err(corrupted("slice presence flag must be 0 or 1")),
        }
    }
}

impl Marshaler for RangeSliceMarshaler {
    fn type_tag(&self) -> &'static str {
        "range"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["range", "slice"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Range { .. } | Value::Slice { .. })
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let (tag, fields) = match value {
            Value::Range { start, stop, step } => {
                if *step == 0 {
                    return Err(StoreError::UnsupportedValue("range with zero step".into()));
                }
                ("range", vec![*start, *stop, *step])
            }
            Value::Slice { start, stop, step } => {
                let mut fields = Vec::with_capacity(6);
                for bound in [start, stop, step] {
                    fields.extend_from_slice(&Self::pack_bound(*bound));
                }
                ("slice", fields)
            }
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a range or slice",
                    other.kind()
                )))
            }
        };
        let style = style_for(value.kind(), cx.options.mode());
        let node = cx.place_leaf(parent, name, normalize(&i64_leaf(fields)?, &style)?)?;
        cx.annotate(node, tag, "int64", false)?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        match cx.store.leaf_data(node)?.data() {
            ArrayData::I64(v) if v.len() == 3 => Ok(Value::Range {
                start: v[0],
                stop: v[1],
                step: v[2],
            }),
            ArrayData::I64(v) if v.len() == 6 => Ok(Value::Slice {
                start: Self::unpack_bound(v[0], v[1])?,
                stop: Self::unpack_bound(v[2], v[3])?,
                step: Self::unpack_bound(v[4], v[5])?,
            }),
            _ => Err(corrupted("range payload must hold three or six i64s")),
        }
    }
}
