//! Generic n-dimensional array marshaler (numeric, text, byte and
//! opaque-cell element layouts) plus the array helpers the scalar,
//! string and record marshalers share.

use super::{
    mode::{self, style_for, ModeStyle, SHAPE_ATTR},
    Marshaler, ReadContext, WriteContext,
};
use crate::{
    config::Mode,
    store::{AttrValue, HierStore, NodeId, NodeKind},
    value::{ArrayData, ElementType, NdArray, Value, ValueKind},
    StoreError, StoreResult,
};

/// Reinterprets an array under a new shape with the same element count.
pub(super) fn with_shape(arr: &NdArray, shape: Vec<usize>) -> StoreResult<NdArray> {
    NdArray::new(shape, arr.elem().clone(), arr.data().clone())
}

/// Applies the mode's storage normalization: rank padding up to 2-D,
/// then axis reversal for column-major storage.
pub(super) fn normalize(arr: &NdArray, style: &ModeStyle) -> StoreResult<NdArray> {
    let mut out = arr.clone();
    if style.min_two_d && out.ndim() < 2 {
        let mut shape = out.shape().to_vec();
        while shape.len() < 2 {
            shape.insert(0, 1);
        }
        out = with_shape(&out, shape)?;
    }
    if style.reversed_axes {
        out = out.reversed_axes();
    }
    Ok(out)
}

/// Undoes the axis reversal of [`normalize`]. Rank padding is not
/// undone here; whether a `[1, n]` shape collapses back is a per-kind
/// decision.
pub(super) fn restore_order(arr: &NdArray, style: &ModeStyle) -> NdArray {
    if style.reversed_axes {
        arr.reversed_axes()
    } else {
        arr.clone()
    }
}

/// Extracts element `i` of a non-record array as a scalar value.
pub(super) fn element_value(arr: &NdArray, i: usize) -> StoreResult<Value> {
    let out = match arr.data() {
        ArrayData::Bool(v) => Value::Bool(v[i]),
        ArrayData::I8(v) => Value::I8(v[i]),
        ArrayData::I16(v) => Value::I16(v[i]),
        ArrayData::I32(v) => Value::I32(v[i]),
        ArrayData::I64(v) => Value::I64(v[i]),
        ArrayData::U8(v) => Value::U8(v[i]),
        ArrayData::U16(v) => Value::U16(v[i]),
        ArrayData::U32(v) => Value::U32(v[i]),
        ArrayData::U64(v) => Value::U64(v[i]),
        ArrayData::F32(v) => Value::F32(v[i]),
        ArrayData::F64(v) => Value::F64(v[i]),
        ArrayData::Complex(v) => Value::Complex(v[i]),
        ArrayData::Str(v) => Value::Str(v[i].clone()),
        ArrayData::Bytes(v) => Value::Bytes(v[i].clone()),
        ArrayData::Cells(v) => v[i].clone(),
        ArrayData::Records(_) => {
            return Err(StoreError::TypeMismatch(
                "record elements have no scalar form".into(),
            ))
        }
    };
    Ok(out)
}

/// An empty payload of the right variant for an element type.
pub(super) fn empty_data_for(elem: &ElementType) -> ArrayData {
    match elem {
        ElementType::Bool => ArrayData::Bool(Vec::new()),
        ElementType::I8 => ArrayData::I8(Vec::new()),
        ElementType::I16 => ArrayData::I16(Vec::new()),
        ElementType::I32 => ArrayData::I32(Vec::new()),
        ElementType::I64 => ArrayData::I64(Vec::new()),
        ElementType::U8 => ArrayData::U8(Vec::new()),
        ElementType::U16 => ArrayData::U16(Vec::new()),
        ElementType::U32 => ArrayData::U32(Vec::new()),
        ElementType::U64 => ArrayData::U64(Vec::new()),
        ElementType::F32 => ArrayData::F32(Vec::new()),
        ElementType::F64 => ArrayData::F64(Vec::new()),
        ElementType::Complex => ArrayData::Complex(Vec::new()),
        ElementType::FixedStr(_) | ElementType::VarStr => ArrayData::Str(Vec::new()),
        ElementType::FixedBytes(_) | ElementType::VarBytes => ArrayData::Bytes(Vec::new()),
        ElementType::Record(_) => ArrayData::Records(Vec::new()),
        ElementType::Cell => ArrayData::Cells(Vec::new()),
    }
}

/// Appends one scalar value to a payload of the matching variant.
pub(super) fn append_scalar(data: &mut ArrayData, value: &Value) -> StoreResult<()> {
    match (data, value) {
        (ArrayData::Bool(v), Value::Bool(x)) => v.push(*x),
        (ArrayData::I8(v), Value::I8(x)) => v.push(*x),
        (ArrayData::I16(v), Value::I16(x)) => v.push(*x),
        (ArrayData::I32(v), Value::I32(x)) => v.push(*x),
        (ArrayData::I64(v), Value::I64(x)) => v.push(*x),
        (ArrayData::U8(v), Value::U8(x)) => v.push(*x),
        (ArrayData::U16(v), Value::U16(x)) => v.push(*x),
        (ArrayData::U32(v), Value::U32(x)) => v.push(*x),
        (ArrayData::U64(v), Value::U64(x)) => v.push(*x),
        (ArrayData::F32(v), Value::F32(x)) => v.push(*x),
        (ArrayData::F64(v), Value::F64(x)) => v.push(*x),
        (ArrayData::Complex(v), Value::Complex(x)) => v.push(*x),
        (ArrayData::Str(v), Value::Str(x)) => v.push(x.clone()),
        (ArrayData::Bytes(v), Value::Bytes(x)) => v.push(x.clone()),
        (ArrayData::Cells(v), x) => v.push(x.clone()),
        (_, other) => {
            return Err(StoreError::TypeMismatch(format!(
                "{:?} does not fit the field element type",
                other.kind()
            )))
        }
    }
    Ok(())
}

/// Appends elements `range` of `src` to `dst`; both must be the same
/// variant.
pub(super) fn extend_data(
    dst: &mut ArrayData,
    src: &ArrayData,
    range: std::ops::Range<usize>,
) -> StoreResult<()> {
    macro_rules! arm {
        ($($variant:ident),*) => {
            match (dst, src) {
                $((ArrayData::$variant(d), ArrayData::$variant(s)) => {
                    d.extend_from_slice(&s[range.clone()]);
                })*
                _ => {
                    return Err(StoreError::TypeMismatch(
                        "mismatched array payload variants".into(),
                    ))
                }
            }
        };
    }
    arm!(
        Bool, I8, I16, I32, I64, U8, U16, U32, U64, F32, F64, Complex, Str, Bytes, Records,
        Cells
    );
    Ok(())
}

/// Copies elements `range` of `src` into a fresh payload of the same
/// variant.
pub(super) fn slice_data(src: &ArrayData, range: std::ops::Range<usize>) -> ArrayData {
    macro_rules! arm {
        ($($variant:ident),*) => {
            match src {
                $(ArrayData::$variant(s) => ArrayData::$variant(s[range.clone()].to_vec()),)*
            }
        };
    }
    arm!(
        Bool, I8, I16, I32, I64, U8, U16, U32, U64, F32, F64, Complex, Str, Bytes, Records,
        Cells
    )
}

/// Converts a text or byte array into the consumer's fixed-width u16 /
/// u8 layout: one extra trailing axis of the fixed width, padded with
/// zeros.
pub(super) fn widen_text(arr: &NdArray) -> StoreResult<NdArray> {
    match arr.data() {
        ArrayData::Str(strings) => {
            let units: Vec<Vec<u16>> = strings.iter().map(|s| s.encode_utf16().collect()).collect();
            let width = match arr.elem() {
                ElementType::FixedStr(w) => *w,
                _ => units.iter().map(Vec::len).max().unwrap_or(0),
            };
            let mut flat = Vec::with_capacity(units.len() * width);
            for u in &units {
                let taken = u.len().min(width);
                flat.extend_from_slice(&u[..taken]);
                flat.resize(flat.len() + width - taken, 0);
            }
            let mut shape = arr.shape().to_vec();
            shape.push(width);
            NdArray::new(shape, ElementType::U16, ArrayData::U16(flat))
        }
        ArrayData::Bytes(byte_strings) => {
            let width = match arr.elem() {
                ElementType::FixedBytes(w) => *w,
                _ => byte_strings.iter().map(Vec::len).max().unwrap_or(0),
            };
            let mut flat = Vec::with_capacity(byte_strings.len() * width);
            for b in byte_strings {
                let taken = b.len().min(width);
                flat.extend_from_slice(&b[..taken]);
                flat.resize(flat.len() + width - taken, 0);
            }
            let mut shape = arr.shape().to_vec();
            shape.push(width);
            NdArray::new(shape, ElementType::U8, ArrayData::U8(flat))
        }
        _ => Err(StoreError::TypeMismatch(
            "only text and byte arrays widen".into(),
        )),
    }
}

/// Decodes a widened u16 char array back into strings, trimming
/// trailing NUL padding. Returns the strings together with the shape
/// they form (the widened trailing axis removed).
pub(super) fn narrow_chars(arr: &NdArray) -> StoreResult<(Vec<String>, Vec<usize>, usize)> {
    let units = match arr.data() {
        ArrayData::U16(v) => v,
        _ => {
            return Err(StoreError::TypeMismatch(
                "char node payload is not u16".into(),
            ))
        }
    };
    let (width, shape) = match arr.shape() {
        [] => (1usize.min(units.len()), Vec::new()),
        s => (s[s.len() - 1], s[..s.len() - 1].to_vec()),
    };
    let count: usize = shape.iter().product();
    let mut strings = Vec::with_capacity(count);
    for i in 0..count {
        let row = &units[i * width..(i + 1) * width];
        let end = row
            .iter()
            .rposition(|&u| u != 0)
            .map(|p| p + 1)
            .unwrap_or(0);
        let s = String::from_utf16(&row[..end]).map_err(|_| StoreError::Corrupted {
            location: "char node".into(),
            reason: "invalid UTF-16 payload".into(),
        })?;
        strings.push(s);
    }
    Ok((strings, shape, width))
}

/// Marshaler for arrays whose elements are numeric, text, byte or
/// opaque-cell values. Structured record layouts dispatch to the record
/// marshaler instead.
pub struct ArrayMarshaler;

impl ArrayMarshaler {
    fn write_cell(
        &self,
        cx: &mut WriteContext<'_>,
        arr: &NdArray,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let node = cx.place_container(parent, name)?;
        if cx.options.mode() != Mode::Bare {
            cx.store.set_attr(
                node,
                SHAPE_ATTR,
                AttrValue::UIntList(arr.shape().iter().map(|&n| n as u64).collect()),
            )?;
        }
        if let ArrayData::Cells(cells) = arr.data() {
            let names: Vec<String> = (0..cells.len()).map(|i| i.to_string()).collect();
            cx.prune_children(node, &names)?;
            for (i, cell) in cells.iter().enumerate() {
                cx.write_child(cell, node, &names[i])?;
            }
        }
        Ok(node)
    }

    fn read_cell(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let shape: Vec<usize> = match cx.store.get_attr(node, SHAPE_ATTR)? {
            Some(attr) => attr
                .as_uint_list()
                .ok_or_else(|| StoreError::Corrupted {
                    location: "cell array".into(),
                    reason: "shape attribute has the wrong type".into(),
                })?
                .iter()
                .map(|&n| n as usize)
                .collect(),
            None => vec![cx.store.list_children(node)?.len()],
        };
        let count: usize = shape.iter().product();
        let mut cells = Vec::with_capacity(count);
        for i in 0..count {
            let child = cx.store.child(node, &i.to_string())?.ok_or_else(|| {
                StoreError::Corrupted {
                    location: format!("cell array element {i}"),
                    reason: "missing element child".into(),
                }
            })?;
            cells.push(cx.read_child(child)?);
        }
        Ok(Value::Array(NdArray::new(
            shape,
            ElementType::Cell,
            ArrayData::Cells(cells),
        )?))
    }
}

impl Marshaler for ArrayMarshaler {
    fn type_tag(&self) -> &'static str {
        "ndarray"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["ndarray", "cellarray"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Array(arr) if !matches!(arr.elem(), ElementType::Record(_)))
    }

    fn matches_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<bool> {
        match class {
            "cell" => Ok(store.node_kind(node)? == NodeKind::Container
                && store.get_attr(node, SHAPE_ATTR)?.is_some()),
            "logical" | "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32"
            | "uint64" | "single" | "double" => {
                Ok(store.node_kind(node)? == NodeKind::Leaf)
            }
            _ => Ok(false),
        }
    }

    fn matches_node(&self, store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
        if store.node_kind(node)? != NodeKind::Leaf {
            return Ok(false);
        }
        Ok(!matches!(
            store.leaf_data(node)?.elem(),
            ElementType::Record(_)
        ))
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let arr = match value {
            Value::Array(arr) => arr,
            _ => return Err(StoreError::TypeMismatch("expected an array value".into())),
        };
        let style = style_for(ValueKind::Array, cx.options.mode());
        let class = mode::matlab_class(arr.elem());
        let tag;
        let node = if matches!(arr.elem(), ElementType::Cell) {
            tag = "cellarray";
            self.write_cell(cx, arr, parent, name)?
        } else {
            tag = "ndarray";
            let stored = if style.text_as_u16
                && matches!(
                    arr.elem(),
                    ElementType::FixedStr(_)
                        | ElementType::VarStr
                        | ElementType::FixedBytes(_)
                        | ElementType::VarBytes
                ) {
                normalize(&widen_text(arr)?, &style)?
            } else {
                normalize(arr, &style)?
            };
            cx.place_leaf(parent, name, stored)?
        };
        cx.annotate(node, tag, class, arr.is_empty())?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        if cx.store.node_kind(node)? == NodeKind::Container {
            return self.read_cell(cx, node);
        }
        let style = style_for(ValueKind::Array, cx.options.mode());
        // Rank padding is not undone: a 1x1 consumer-mode leaf is
        // claimed by the scalar marshaler before this one, everything
        // else keeps its stored rank.
        let arr = restore_order(cx.store.leaf_data(node)?, &style);
        Ok(Value::Array(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    /// Widening pads every element to the fixed width; empty strings
    /// stay representable.
    #[test]
    fn test_widen_narrow_text() {
        let arr = NdArray::new(
            vec![3],
            ElementType::FixedStr(3),
            ArrayData::Str(vec!["ab".into(), "".into(), "xyz".into()]),
        )
        .unwrap();
        let wide = widen_text(&arr).unwrap();
        assert_eq!(wide.shape(), &[3, 3]);
        let (strings, shape, width) = narrow_chars(&wide).unwrap();
        assert_eq!(shape, vec![3]);
        assert_eq!(width, 3);
        assert_eq!(strings, vec!["ab", "", "xyz"]);
    }

    /// Variable-width byte arrays widen to the longest element.
    #[test]
    fn test_widen_bytes() {
        let arr = NdArray::new(
            vec![2],
            ElementType::VarBytes,
            ArrayData::Bytes(vec![vec![1, 2, 3], vec![9]]),
        )
        .unwrap();
        let wide = widen_text(&arr).unwrap();
        assert_eq!(wide.shape(), &[2, 3]);
        assert_eq!(wide.data(), &ArrayData::U8(vec![1, 2, 3, 9, 0, 0]));
    }

    /// Zero-length axes survive normalization in both directions.
    #[test]
    fn test_normalize_empty() {
        let arr = NdArray::new(vec![2, 0], ElementType::F64, ArrayData::F64(vec![])).unwrap();
        let style = style_for(ValueKind::Array, Mode::Matlab);
        let stored = normalize(&arr, &style).unwrap();
        assert_eq!(stored.shape(), &[0, 2]);
        let back = restore_order(&stored, &style);
        assert_eq!(back.shape(), &[2, 0]);
    }

    /// Rank padding inserts leading unit axes.
    #[test]
    fn test_min_two_d() {
        let arr = NdArray::new(vec![3], ElementType::I32, ArrayData::I32(vec![1, 2, 3])).unwrap();
        let style = style_for(ValueKind::Array, Mode::Matlab);
        let stored = normalize(&arr, &style).unwrap();
        // [3] pads to [1, 3], then reverses to [3, 1].
        assert_eq!(stored.shape(), &[3, 1]);
    }
}
