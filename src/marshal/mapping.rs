//! Marshaler for keyed mappings, ordered and unordered.
//!
//! Every entry becomes a child named by the escaped canonical rendering
//! of its key. The key names and kind tags are recorded as attributes
//! so non-text keys survive the trip; two keys rendering to the same
//! name are a collision, reported before anything is written.

use std::collections::HashMap;

use super::{
    mode::{KEY_KINDS_ATTR, KEY_NAMES_ATTR, TYPE_ATTR},
    Marshaler, ReadContext, WriteContext,
};
use crate::{
    config::Mode,
    path,
    store::{AttrValue, HierStore, NodeId, NodeKind},
    value::{MapKey, OrderedMap, Value},
    StoreError, StoreResult,
};

pub struct MappingMarshaler;

impl MappingMarshaler {
    /// Renders and escapes every key up front, rejecting name
    /// collisions.
    fn entry_names<'v>(
        entries: &[(&'v MapKey, &'v Value)],
    ) -> StoreResult<Vec<(String, &'v MapKey, &'v Value)>> {
        let mut out = Vec::with_capacity(entries.len());
        let mut seen: HashMap<String, &MapKey> = HashMap::with_capacity(entries.len());
        for &(key, value) in entries {
            let name = path::escape_name(&key.to_name());
            if let Some(first) = seen.insert(name.clone(), key) {
                return Err(StoreError::Collision(format!(
                    "keys {first:?} and {key:?} both store as {name:?}"
                )));
            }
            out.push((name, key, value));
        }
        Ok(out)
    }

    fn write_entries(
        &self,
        cx: &mut WriteContext<'_>,
        tag: &str,
        entries: &[(&MapKey, &Value)],
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let named = Self::entry_names(entries)?;
        let names: Vec<String> = named.iter().map(|(n, _, _)| n.clone()).collect();
        let node = cx.place_container(parent, name)?;
        cx.prune_children(node, &names)?;
        if cx.options.mode() != Mode::Bare {
            let kinds: Vec<String> = named
                .iter()
                .map(|(_, k, _)| k.kind_tag().to_string())
                .collect();
            cx.store
                .set_attr(node, KEY_NAMES_ATTR, AttrValue::StrList(names))?;
            cx.store
                .set_attr(node, KEY_KINDS_ATTR, AttrValue::StrList(kinds))?;
        }
        for (child_name, _, value) in &named {
            cx.write_child(value, node, child_name)?;
        }
        cx.annotate(node, tag, "struct", entries.is_empty())?;
        Ok(node)
    }

    /// Recovers the keys of a stored mapping. The recorded name/kind
    /// attributes are authoritative; without them every child name
    /// becomes a text key.
    fn stored_keys(
        cx: &ReadContext<'_>,
        node: NodeId,
    ) -> StoreResult<Vec<(String, MapKey)>> {
        let names = cx
            .store
            .get_attr(node, KEY_NAMES_ATTR)?
            .and_then(|a| a.as_str_list().map(|v| v.to_vec()));
        let kinds = cx
            .store
            .get_attr(node, KEY_KINDS_ATTR)?
            .and_then(|a| a.as_str_list().map(|v| v.to_vec()));
        match (names, kinds) {
            (Some(names), Some(kinds)) if names.len() == kinds.len() => names
                .into_iter()
                .zip(kinds)
                .map(|(name, kind)| {
                    let key = MapKey::from_name(&path::unescape_name(&name), &kind)?;
                    Ok((name, key))
                })
                .collect(),
            (Some(_), Some(_)) => Err(StoreError::Corrupted {
                location: "mapping".into(),
                reason: "key name and kind lists differ in length".into(),
            }),
            _ => {
                let mut names = cx.store.list_children(node)?;
                names.sort();
                Ok(names
                    .into_iter()
                    .map(|name| {
                        let key = MapKey::Str(path::unescape_name(&name));
                        (name, key)
                    })
                    .collect())
            }
        }
    }
}

impl Marshaler for MappingMarshaler {
    fn type_tag(&self) -> &'static str {
        "map"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["map", "omap"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_) | Value::OrdMap(_))
    }

    fn matches_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<bool> {
        Ok(class == "struct" && store.node_kind(node)? == NodeKind::Container)
    }

    fn matches_node(&self, store: &dyn HierStore, node: NodeId) -> StoreResult<bool> {
        // Last-resort rule for containers: anything the sequence rule
        // did not claim reads as a mapping with text keys.
        Ok(store.node_kind(node)? == NodeKind::Container)
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        match value {
            Value::Map(map) => {
                // Unordered maps are stored in canonical key order so
                // equal maps produce identical stores.
                let mut entries: Vec<(&MapKey, &Value)> = map.iter().collect();
                entries.sort_by_key(|(k, _)| (k.kind_tag(), k.to_name()));
                self.write_entries(cx, "map", &entries, parent, name)
            }
            Value::OrdMap(map) => {
                let entries: Vec<(&MapKey, &Value)> = map.iter().collect();
                self.write_entries(cx, "omap", &entries, parent, name)
            }
            other => Err(StoreError::TypeMismatch(format!(
                "{:?} is not a mapping",
                other.kind()
            ))),
        }
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let keys = Self::stored_keys(cx, node)?;
        let ordered = cx
            .store
            .get_attr(node, TYPE_ATTR)?
            .and_then(|a| a.as_str().map(|s| s == "omap"))
            .unwrap_or(false);
        let mut entries = Vec::with_capacity(keys.len());
        for (child_name, key) in keys {
            let child = cx
                .store
                .child(node, &child_name)?
                .ok_or_else(|| StoreError::Corrupted {
                    location: child_name.clone(),
                    reason: "recorded key has no child node".into(),
                })?;
            entries.push((key, cx.read_child(child)?));
        }
        Ok(if ordered {
            Value::OrdMap(entries.into_iter().collect::<OrderedMap>())
        } else {
            Value::Map(entries.into_iter().collect::<HashMap<MapKey, Value>>())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordered_float::OrderedFloat;

    /// An integer key and a text key with the same rendering collide.
    #[test]
    fn test_name_collision() {
        let int_key = MapKey::Int(1);
        let str_key = MapKey::Str("1".into());
        let v = Value::Null;
        let result = MappingMarshaler::entry_names(&[(&int_key, &v), (&str_key, &v)]);
        assert!(matches!(result, Err(StoreError::Collision(_))));
    }

    /// Float keys never collide with integer keys of the same value.
    #[test]
    fn test_float_int_disjoint() {
        let int_key = MapKey::Int(1);
        let float_key = MapKey::Float(OrderedFloat(1.0));
        let v = Value::Null;
        let named =
            MappingMarshaler::entry_names(&[(&int_key, &v), (&float_key, &v)]).unwrap();
        assert_eq!(named[0].0, "1");
        assert_eq!(named[1].0, "1.0");
    }

    /// Keys containing the path separator are escaped into legal names.
    #[test]
    fn test_separator_escaped() {
        let key = MapKey::Str("a/b".into());
        let v = Value::Null;
        let named = MappingMarshaler::entry_names(&[(&key, &v)]).unwrap();
        assert!(!named[0].0.contains('/'));
        assert_eq!(path::unescape_name(&named[0].0), "a/b");
    }
}
