//! Marshalers for ordered sequences (lists, tuples) and sets. All three
//! store as a container with children named by element index.

use super::{mode::TYPE_ATTR, Marshaler, ReadContext, WriteContext};
use crate::{
    store::{HierStore, NodeId, NodeKind},
    value::{MapKey, Value},
    StoreError, StoreResult,
};

/// Whether a container's children are exactly the names `0..n` for some
/// `n > 0`. Used for metadata-free inference.
fn contiguous_indices(store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
    let names = store.list_children(node)?;
    if names.is_empty() {
        return Ok(false);
    }
    let mut seen = vec![false; names.len()];
    for name in &names {
        match name.parse::<usize>() {
            Ok(i) if i < seen.len() && name == &i.to_string() && !seen[i] => seen[i] = true,
            _ => return Ok(false),
        }
    }
    Ok(true)
}

fn read_indexed(cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Vec<Value>> {
    let count = cx.store.list_children(node)?.len();
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let child = cx
            .store
            .child(node, &i.to_string())?
            .ok_or_else(|| StoreError::Corrupted {
                location: format!("element {i}"),
                reason: "missing indexed child".into(),
            })?;
        out.push(cx.read_child(child)?);
    }
    Ok(out)
}

/// Lists and tuples. Both share one node layout; the native type tag is
/// the only thing telling them apart, so a tuple read back under any
/// other mode comes out as a list.
pub struct SequenceMarshaler;

impl Marshaler for SequenceMarshaler {
    fn type_tag(&self) -> &'static str {
        "list"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["list", "tuple"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::List(_) | Value::Tuple(_))
    }

    fn matches_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<bool> {
        // Cell arrays carry a shape attribute and are claimed before
        // this marshaler is consulted.
        Ok(class == "cell" && store.node_kind(node)? == NodeKind::Container)
    }

    fn matches_node(&self, store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
        if store.node_kind(node)? != NodeKind::Container {
            return Ok(false);
        }
        contiguous_indices(store, node)
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let (tag, elements) = match value {
            Value::List(xs) => ("list", xs),
            Value::Tuple(xs) => ("tuple", xs),
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a sequence",
                    other.kind()
                )))
            }
        };
        let names: Vec<String> = (0..elements.len()).map(|i| i.to_string()).collect();
        let node = cx.place_container(parent, name)?;
        cx.prune_children(node, &names)?;
        for (i, element) in elements.iter().enumerate() {
            cx.write_child(element, node, &names[i])?;
        }
        cx.annotate(node, tag, "cell", elements.is_empty())?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let elements = read_indexed(cx, node)?;
        let is_tuple = cx
            .store
            .get_attr(node, TYPE_ATTR)?
            .and_then(|a| a.as_str().map(|s| s == "tuple"))
            .unwrap_or(false);
        Ok(if is_tuple {
            Value::Tuple(elements)
        } else {
            Value::List(elements)
        })
    }
}

/// Sets of hashable keys. Elements are written in a canonical order so
/// equal sets produce identical stores. Without the native type tag a
/// stored set reads back as a list.
pub struct SetMarshaler;

impl Marshaler for SetMarshaler {
    fn type_tag(&self) -> &'static str {
        "set"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["set"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Set(_))
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let set = match value {
            Value::Set(set) => set,
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a set",
                    other.kind()
                )))
            }
        };
        let mut keys: Vec<&MapKey> = set.iter().collect();
        keys.sort_by_key(|k| (k.kind_tag(), k.to_name()));
        let names: Vec<String> = (0..keys.len()).map(|i| i.to_string()).collect();
        let node = cx.place_container(parent, name)?;
        cx.prune_children(node, &names)?;
        for (i, key) in keys.iter().enumerate() {
            let element = Value::from((*key).clone());
            cx.write_child(&element, node, &names[i])?;
        }
        cx.annotate(node, "set", "cell", set.is_empty())?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let elements = read_indexed(cx, node)?;
        let mut set = std::collections::HashSet::with_capacity(elements.len());
        for element in elements {
            let key = MapKey::try_from(element)?;
            set.insert(key);
        }
        Ok(Value::Set(set))
    }
}
