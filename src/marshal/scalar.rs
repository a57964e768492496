//! Marshalers for null, numeric scalars and scalar text/byte strings.

use super::{
    array::{element_value, narrow_chars, normalize, restore_order, widen_text},
    mode::{self, style_for},
    Marshaler, ReadContext, WriteContext,
};
use crate::{
    config::Mode,
    store::{HierStore, NodeId, NodeKind},
    value::{ArrayData, ElementType, NdArray, Value, ValueKind},
    StoreError, StoreResult,
};

/// Absence of a value, stored as an empty float leaf so every mode can
/// represent it. Only the native type tag reconstructs `Null` exactly;
/// other modes read it back as an empty array.
pub struct NullMarshaler;

impl Marshaler for NullMarshaler {
    fn type_tag(&self) -> &'static str {
        "null"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["null"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Null)
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        _value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let style = style_for(ValueKind::Null, cx.options.mode());
        let empty = NdArray::new(vec![0], ElementType::F64, ArrayData::F64(Vec::new()))?;
        let node = cx.place_leaf(parent, name, normalize(&empty, &style)?)?;
        cx.annotate(node, "null", "double", true)?;
        Ok(node)
    }

    fn read(&self, _cx: &mut ReadContext<'_>, _node: NodeId) -> StoreResult<Value> {
        Ok(Value::Null)
    }
}

/// Numeric scalars of every fixed width, stored as a 0-d leaf (1x1
/// under the consumer convention).
pub struct ScalarMarshaler;

impl ScalarMarshaler {
    fn payload(value: &Value) -> Option<(ElementType, ArrayData)> {
        let pair = match value {
            Value::Bool(x) => (ElementType::Bool, ArrayData::Bool(vec![*x])),
            Value::I8(x) => (ElementType::I8, ArrayData::I8(vec![*x])),
            Value::I16(x) => (ElementType::I16, ArrayData::I16(vec![*x])),
            Value::I32(x) => (ElementType::I32, ArrayData::I32(vec![*x])),
            Value::I64(x) => (ElementType::I64, ArrayData::I64(vec![*x])),
            Value::U8(x) => (ElementType::U8, ArrayData::U8(vec![*x])),
            Value::U16(x) => (ElementType::U16, ArrayData::U16(vec![*x])),
            Value::U32(x) => (ElementType::U32, ArrayData::U32(vec![*x])),
            Value::U64(x) => (ElementType::U64, ArrayData::U64(vec![*x])),
            Value::F32(x) => (ElementType::F32, ArrayData::F32(vec![*x])),
            Value::F64(x) => (ElementType::F64, ArrayData::F64(vec![*x])),
            Value::Complex(x) => (ElementType::Complex, ArrayData::Complex(vec![*x])),
            _ => return None,
        };
        Some(pair)
    }

    fn tag_for(elem: &ElementType) -> &'static str {
        match elem {
            ElementType::Bool => "bool",
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            _ => "complex",
        }
    }
}

impl Marshaler for ScalarMarshaler {
    fn type_tag(&self) -> &'static str {
        "scalar"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &[
            "bool", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64",
            "complex",
        ]
    }

    fn handles_value(&self, value: &Value) -> bool {
        Self::payload(value).is_some()
    }

    fn matches_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<bool> {
        let numeric = matches!(
            class,
            "logical"
                | "int8"
                | "int16"
                | "int32"
                | "int64"
                | "uint8"
                | "uint16"
                | "uint32"
                | "uint64"
                | "single"
                | "double"
        );
        if !numeric || store.node_kind(node)? != NodeKind::Leaf {
            return Ok(false);
        }
        Ok(store.leaf_data(node)?.len() == 1)
    }

    fn matches_node(&self, store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
        if store.node_kind(node)? != NodeKind::Leaf {
            return Ok(false);
        }
        let arr = store.leaf_data(node)?;
        Ok(arr.ndim() == 0
            && !matches!(
                arr.elem(),
                ElementType::Record(_)
                    | ElementType::Cell
                    | ElementType::FixedStr(_)
                    | ElementType::VarStr
                    | ElementType::FixedBytes(_)
                    | ElementType::VarBytes
            ))
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let (elem, data) = Self::payload(value).ok_or_else(|| {
            StoreError::TypeMismatch(format!("{:?} is not a numeric scalar", value.kind()))
        })?;
        let style = style_for(value.kind(), cx.options.mode());
        let arr = normalize(&NdArray::scalar(elem.clone(), data)?, &style)?;
        let node = cx.place_leaf(parent, name, arr)?;
        cx.annotate(node, Self::tag_for(&elem), mode::matlab_class(&elem), false)?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let arr = cx.store.leaf_data(node)?;
        if arr.len() != 1 {
            return Err(StoreError::TypeMismatch(format!(
                "scalar node holds {} elements",
                arr.len()
            )));
        }
        element_value(arr, 0)
    }
}

/// Scalar text and byte strings. Native mode stores them as 0-d
/// variable-width leaves; the consumer convention flattens text to a
/// u16 char row and bytes to a uint8 row.
pub struct StringMarshaler;

impl Marshaler for StringMarshaler {
    fn type_tag(&self) -> &'static str {
        "str"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["str", "bytes"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Str(_) | Value::Bytes(_))
    }

    fn matches_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<bool> {
        Ok(class == "char" && store.node_kind(node)? == NodeKind::Leaf)
    }

    fn matches_node(&self, store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
        if store.node_kind(node)? != NodeKind::Leaf {
            return Ok(false);
        }
        let arr = store.leaf_data(node)?;
        Ok(arr.ndim() == 0
            && matches!(
                arr.elem(),
                ElementType::FixedStr(_)
                    | ElementType::VarStr
                    | ElementType::FixedBytes(_)
                    | ElementType::VarBytes
            ))
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let style = style_for(value.kind(), cx.options.mode());
        let (tag, class, scalar) = match value {
            Value::Str(s) => {
                let arr = NdArray::scalar(ElementType::VarStr, ArrayData::Str(vec![s.clone()]))?;
                ("str", "char", arr)
            }
            Value::Bytes(b) => {
                let arr =
                    NdArray::scalar(ElementType::VarBytes, ArrayData::Bytes(vec![b.clone()]))?;
                ("bytes", "uint8", arr)
            }
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a string value",
                    other.kind()
                )))
            }
        };
        let stored = if style.text_as_u16 {
            // The widened 0-d scalar becomes a [width] vector, then
            // normalizes to a [1, width] row stored column-major.
            normalize(&widen_text(&scalar)?, &style)?
        } else {
            scalar
        };
        let node = cx.place_leaf(parent, name, stored)?;
        let empty = match value {
            Value::Str(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            _ => false,
        };
        cx.annotate(node, tag, class, empty)?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let style = style_for(ValueKind::Str, cx.options.mode());
        let raw = cx.store.leaf_data(node)?;
        let arr = restore_order(raw, &style);
        match arr.data() {
            ArrayData::Str(strings) if arr.len() == 1 => Ok(Value::Str(strings[0].clone())),
            ArrayData::Bytes(byte_strings) if arr.len() == 1 => {
                Ok(Value::Bytes(byte_strings[0].clone()))
            }
            ArrayData::U16(_) => {
                // A u16 char payload only ever comes from the consumer
                // convention, so decode it with that convention's axis
                // order no matter which mode is reading.
                let chars = restore_order(raw, &style_for(ValueKind::Str, Mode::Matlab));
                let (mut strings, shape, width) = narrow_chars(&chars)?;
                let rows: usize = shape.iter().product();
                if rows == 1 || (shape.len() == 1 && shape[0] <= 1) {
                    Ok(Value::Str(strings.pop().unwrap_or_default()))
                } else {
                    // A genuine char matrix: hand back the rows as a
                    // fixed-width text array.
                    Ok(Value::Array(NdArray::new(
                        shape,
                        ElementType::FixedStr(width),
                        ArrayData::Str(strings),
                    )?))
                }
            }
            _ => Err(StoreError::TypeMismatch(
                "node payload is not a scalar string".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scalar payloads keep the exact width of the source value.
    #[test]
    fn test_payload_widths() {
        let (elem, _) = ScalarMarshaler::payload(&Value::I16(-5)).unwrap();
        assert_eq!(elem, ElementType::I16);
        let (elem, _) = ScalarMarshaler::payload(&Value::U64(5)).unwrap();
        assert_eq!(elem, ElementType::U64);
        assert!(ScalarMarshaler::payload(&Value::Str("x".into())).is_none());
    }

    /// Each scalar element type maps to its own native tag.
    #[test]
    fn test_tags_unique() {
        let tags = [
            ElementType::Bool,
            ElementType::I8,
            ElementType::I64,
            ElementType::U8,
            ElementType::F32,
            ElementType::F64,
            ElementType::Complex,
        ]
        .iter()
        .map(ScalarMarshaler::tag_for)
        .collect::<Vec<_>>();
        let mut dedup = tags.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), tags.len());
    }
}
