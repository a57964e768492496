//! Marshaler for arrays with structured record element layouts.
//!
//! Native mode explodes the array field-by-field into sibling nodes
//! under one container, sidestepping stores that restrict compound
//! element types; the other modes keep one leaf whose element type
//! carries the nested field schema.

use super::{
    array::{
        append_scalar, element_value, empty_data_for, extend_data, normalize, restore_order,
        slice_data,
    },
    mode::{style_for, FIELDS_ATTR, MATLAB_FIELDS_ATTR, SHAPE_ATTR},
    Marshaler, ReadContext, WriteContext,
};
use crate::{
    path,
    store::{AttrValue, HierStore, NodeId, NodeKind},
    value::{ArrayData, ElementType, NdArray, RecordField, RecordLayout, Value, ValueKind},
    StoreError, StoreResult,
};

/// Extracts field `j` of every record as one column array of shape
/// `outer_shape ++ field.shape`.
fn field_column(arr: &NdArray, j: usize, field: &RecordField) -> StoreResult<NdArray> {
    let records = match arr.data() {
        ArrayData::Records(r) => r,
        _ => {
            return Err(StoreError::TypeMismatch(
                "record array payload is not records".into(),
            ))
        }
    };
    let mut data = empty_data_for(&field.elem);
    let scalar_field =
        field.shape.is_empty() && !matches!(field.elem, ElementType::Record(_));
    for record in records {
        let v = record.get(j).ok_or_else(|| StoreError::Corrupted {
            location: field.name.clone(),
            reason: "record has fewer values than the layout has fields".into(),
        })?;
        if scalar_field {
            append_scalar(&mut data, v)?;
        } else {
            let sub = match v {
                Value::Array(sub) => sub,
                other => {
                    return Err(StoreError::TypeMismatch(format!(
                        "field {:?} expects a sub-array, got {:?}",
                        field.name,
                        other.kind()
                    )))
                }
            };
            if sub.shape() != field.shape.as_slice() {
                return Err(StoreError::TypeMismatch(format!(
                    "field {:?} has shape {:?}, expected {:?}",
                    field.name,
                    sub.shape(),
                    field.shape
                )));
            }
            extend_data(&mut data, sub.data(), 0..sub.data().len())?;
        }
    }
    let mut shape = arr.shape().to_vec();
    shape.extend_from_slice(&field.shape);
    NdArray::new(shape, field.elem.clone(), data)
}

/// Rebuilds one field value of record `i` from its column.
fn field_value(col: &NdArray, i: usize, field_shape: &[usize]) -> StoreResult<Value> {
    let count: usize = field_shape.iter().product();
    let scalar_field =
        field_shape.is_empty() && !matches!(col.elem(), ElementType::Record(_));
    if scalar_field {
        return element_value(col, i);
    }
    let data = slice_data(col.data(), i * count..(i + 1) * count);
    Ok(Value::Array(NdArray::new(
        field_shape.to_vec(),
        col.elem().clone(),
        data,
    )?))
}

pub struct RecordArrayMarshaler;

impl RecordArrayMarshaler {
    fn write_exploded(
        &self,
        cx: &mut WriteContext<'_>,
        arr: &NdArray,
        layout: &RecordLayout,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let escaped: Vec<String> = layout
            .fields()
            .iter()
            .map(|f| path::escape_name(&f.name))
            .collect();
        let node = cx.place_container(parent, name)?;
        cx.prune_children(node, &escaped)?;
        cx.store.set_attr(
            node,
            SHAPE_ATTR,
            AttrValue::UIntList(arr.shape().iter().map(|&n| n as u64).collect()),
        )?;
        cx.store
            .set_attr(node, FIELDS_ATTR, AttrValue::StrList(escaped.clone()))?;
        for (j, field) in layout.fields().iter().enumerate() {
            let column = field_column(arr, j, field)?;
            cx.write_child(&Value::Array(column), node, &escaped[j])?;
        }
        Ok(node)
    }

    fn read_exploded(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let corrupted = |reason: &str| StoreError::Corrupted {
            location: "record array".into(),
            reason: reason.to_string(),
        };
        let shape: Vec<usize> = cx
            .store
            .get_attr(node, SHAPE_ATTR)?
            .and_then(|a| a.as_uint_list().map(|v| v.to_vec()))
            .ok_or_else(|| corrupted("missing shape attribute"))?
            .iter()
            .map(|&n| n as usize)
            .collect();
        let escaped = cx
            .store
            .get_attr(node, FIELDS_ATTR)?
            .and_then(|a| a.as_str_list().map(|v| v.to_vec()))
            .ok_or_else(|| corrupted("missing field list attribute"))?;
        let outer_ndim = shape.len();
        let n: usize = shape.iter().product();

        let mut fields = Vec::with_capacity(escaped.len());
        let mut columns = Vec::with_capacity(escaped.len());
        for esc in &escaped {
            let child = cx
                .store
                .child(node, esc)?
                .ok_or_else(|| corrupted("missing field column"))?;
            let col = match cx.read_child(child)? {
                Value::Array(col) => col,
                _ => return Err(corrupted("field column is not an array")),
            };
            if col.shape().len() < outer_ndim || &col.shape()[..outer_ndim] != shape.as_slice()
            {
                return Err(corrupted("field column shape disagrees with the array"));
            }
            let field_shape = col.shape()[outer_ndim..].to_vec();
            fields.push(RecordField::with_shape(
                path::unescape_name(esc),
                col.elem().clone(),
                field_shape.clone(),
            ));
            columns.push((col, field_shape));
        }
        let layout = RecordLayout::new(fields)?;

        let mut records = Vec::with_capacity(n);
        for i in 0..n {
            let mut record = Vec::with_capacity(columns.len());
            for (col, field_shape) in &columns {
                record.push(field_value(col, i, field_shape)?);
            }
            records.push(record);
        }
        Ok(Value::Array(NdArray::new(
            shape,
            ElementType::Record(layout),
            ArrayData::Records(records),
        )?))
    }
}

impl Marshaler for RecordArrayMarshaler {
    fn type_tag(&self) -> &'static str {
        "recarray"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["recarray"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Array(arr) if matches!(arr.elem(), ElementType::Record(_)))
    }

    fn matches_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<bool> {
        Ok(class == "struct" && store.node_kind(node)? == NodeKind::Leaf)
    }

    fn matches_node(&self, store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
        if store.node_kind(node)? != NodeKind::Leaf {
            return Ok(false);
        }
        Ok(matches!(store.leaf_data(node)?.elem(), ElementType::Record(_)))
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
            _ => return Err(StoreError::TypeMismatch("expected a record array".into())),
        };
        let layout = match arr.elem() {
            ElementType::Record(layout) => layout.clone(),
            _ => return Err(StoreError::TypeMismatch("expected a record element".into())),
        };
        let style = style_for(ValueKind::RecordArray, cx.options.mode());
        let node = if cx.options.store_metadata() {
            self.write_exploded(cx, arr, &layout, parent, name)?
        } else {
            // One leaf whose element type carries the schema; the
            // consumer also gets the field list as an attribute.
            let node = cx.place_leaf(parent, name, normalize(arr, &style)?)?;
            if style.class_name {
                let escaped: Vec<String> = layout
                    .fields()
                    .iter()
                    .map(|f| path::escape_name(&f.name))
                    .collect();
                cx.store
                    .set_attr(node, MATLAB_FIELDS_ATTR, AttrValue::StrList(escaped))?;
            }
            node
        };
        cx.annotate(node, "recarray", "struct", arr.is_empty())?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        if cx.store.node_kind(node)? == NodeKind::Container {
            return self.read_exploded(cx, node);
        }
        let style = style_for(ValueKind::RecordArray, cx.options.mode());
        Ok(Value::Array(restore_order(
            cx.store.leaf_data(node)?,
            &style,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NdArray {
        let inner = RecordLayout::new(vec![
            RecordField::scalar("p", ElementType::I8),
            RecordField::with_shape("q", ElementType::I8, vec![2]),
        ])
        .unwrap();
        let layout = RecordLayout::new(vec![
            RecordField::scalar("x", ElementType::I32),
            RecordField::scalar("y", ElementType::Record(inner.clone())),
        ])
        .unwrap();
        let y0 = NdArray::scalar(
            ElementType::Record(inner),
            ArrayData::Records(vec![vec![
                Value::I8(1),
                Value::Array(
                    NdArray::new(vec![2], ElementType::I8, ArrayData::I8(vec![2, 3])).unwrap(),
                ),
            ]]),
        )
        .unwrap();
        NdArray::new(
            vec![1],
            ElementType::Record(layout),
            ArrayData::Records(vec![vec![Value::I32(7), Value::Array(y0)]]),
        )
        .unwrap()
    }

    /// Columns carry the outer shape plus the per-field shape.
    #[test]
    fn test_field_column_shapes() {
        let arr = sample();
        let layout = match arr.elem() {
            ElementType::Record(l) => l.clone(),
            _ => unreachable!(),
        };
        let x = field_column(&arr, 0, &layout.fields()[0]).unwrap();
        assert_eq!(x.shape(), &[1]);
        assert_eq!(x.data(), &ArrayData::I32(vec![7]));

        let y = field_column(&arr, 1, &layout.fields()[1]).unwrap();
        assert_eq!(y.shape(), &[1]);
        assert!(matches!(y.elem(), ElementType::Record(_)));
    }

    /// Column extraction and reassembly are inverse operations.
    #[test]
    fn test_column_value_roundtrip() {
        let arr = sample();
        let layout = match arr.elem() {
            ElementType::Record(l) => l.clone(),
            _ => unreachable!(),
        };
        for (j, field) in layout.fields().iter().enumerate() {
            let col = field_column(&arr, j, field).unwrap();
            let v = field_value(&col, 0, &field.shape).unwrap();
            if let ArrayData::Records(records) = arr.data() {
                assert_eq!(&v, &records[0][j]);
            }
        }
    }

    /// A zero-element record array keeps its layout through column
    /// extraction.
    #[test]
    fn test_empty_record_columns() {
        let layout =
            RecordLayout::new(vec![RecordField::scalar("x", ElementType::F64)]).unwrap();
        let arr = NdArray::new(
            vec![1, 0],
            ElementType::Record(layout.clone()),
            ArrayData::Records(Vec::new()),
        )
        .unwrap();
        let col = field_column(&arr, 0, &layout.fields()[0]).unwrap();
        assert_eq!(col.shape(), &[1, 0]);
        assert_eq!(col.len(), 0);
    }
}
