//! Marshaler for element type descriptors stored as values in their own
//! right. The descriptor serializes to JSON text, so under the consumer
//! convention the node is just a char leaf.

use super::{
    array::{narrow_chars, normalize, widen_text},
    mode::style_for,
    Marshaler, ReadContext, WriteContext,
};
use crate::{
    store::NodeId,
    value::{ArrayData, ElementType, NdArray, Value, ValueKind},
    StoreError, StoreResult,
};

pub struct DtypeMarshaler;

impl Marshaler for DtypeMarshaler {
    fn type_tag(&self) -> &'static str {
        "dtype"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["dtype"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Dtype(_))
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let elem = match value {
            Value::Dtype(elem) => elem,
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a type descriptor",
                    other.kind()
                )))
            }
        };
        let json = serde_json::to_string(elem)?;
        let scalar = NdArray::scalar(ElementType::VarStr, ArrayData::Str(vec![json]))?;
        let style = style_for(ValueKind::Dtype, cx.options.mode());
        let stored = if style.text_as_u16 {
            normalize(&widen_text(&scalar)?, &style)?
        } else {
            scalar
        };
        let node = cx.place_leaf(parent, name, stored)?;
        cx.annotate(node, "dtype", "char", false)?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let style = style_for(ValueKind::Dtype, cx.options.mode());
        let arr = super::array::restore_order(cx.store.leaf_data(node)?, &style);
        let json = match arr.data() {
            ArrayData::Str(strings) if arr.len() == 1 => strings[0].clone(),
            ArrayData::U16(_) => {
                let (mut strings, _, _) = narrow_chars(&arr)?;
                strings.pop().unwrap_or_default()
            }
            _ => {
                return Err(StoreError::Corrupted {
                    location: "type descriptor".into(),
                    reason: "payload is not text".into(),
                })
            }
        };
        let elem: ElementType = serde_json::from_str(&json)?;
        Ok(Value::Dtype(elem))
    }
}
