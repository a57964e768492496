use serde::{Deserialize, Serialize};

use super::{AttrValue, HierStore, NodeId, NodeKind};
use crate::{config::StorageTuning, value::NdArray, StoreError, StoreResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct NodeRec {
    kind: NodeKind,
    attrs: Vec<(String, AttrValue)>,
    children: Vec<(String, NodeId)>,
    payload: Option<NdArray>,
}

impl NodeRec {
    fn container() -> Self {
        NodeRec {
            kind: NodeKind::Container,
            attrs: Vec::new(),
            children: Vec::new(),
            payload: None,
        }
    }

    fn leaf(payload: NdArray) -> Self {
        NodeRec {
            kind: NodeKind::Leaf,
            attrs: Vec::new(),
            children: Vec::new(),
            payload: Some(payload),
        }
    }
}

/// In-memory hierarchical store: a node arena rooted at a single
/// container.
///
/// This is the reference [`HierStore`] implementation and the test
/// substrate. Removed subtrees stay in the arena until the store is
/// dropped; node handles are never reused.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemStore {
    nodes: Vec<NodeRec>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore {
            nodes: vec![NodeRec::container()],
        }
    }

    fn node(&self, id: NodeId) -> StoreResult<&NodeRec> {
        self.nodes
            .get(id.0 as usize)
            .ok_or_else(|| StoreError::NotFound(format!("node #{}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> StoreResult<&mut NodeRec> {
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or_else(|| StoreError::NotFound(format!("node #{}", id.0)))
    }

    fn insert_child(&mut self, parent: NodeId, name: &str, rec: NodeRec) -> StoreResult<NodeId> {
        if self.child(parent, name)?.is_some() {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(rec);
        self.node_mut(parent)?.children.push((name.to_string(), id));
        Ok(id)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        MemStore::new()
    }
}

impl HierStore for MemStore {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node_kind(&self, node: NodeId) -> StoreResult<NodeKind> {
        Ok(self.node(node)?.kind)
    }

    fn create_container(&mut self, parent: NodeId, name: &str) -> StoreResult<NodeId> {
        if self.node(parent)?.kind != NodeKind::Container {
            return Err(StoreError::Path(format!(
                "cannot create {name:?} under a leaf node"
            )));
        }
        self.insert_child(parent, name, NodeRec::container())
    }

    fn create_leaf(
        &mut self,
        parent: NodeId,
        name: &str,
        payload: NdArray,
        _tuning: &StorageTuning,
    ) -> StoreResult<NodeId> {
        if self.node(parent)?.kind != NodeKind::Container {
            return Err(StoreError::Path(format!(
                "cannot create {name:?} under a leaf node"
            )));
        }
        self.insert_child(parent, name, NodeRec::leaf(payload))
    }

    fn leaf_data(&self, node: NodeId) -> StoreResult<&NdArray> {
        self.node(node)?
            .payload
            .as_ref()
            .ok_or_else(|| StoreError::TypeMismatch("container node has no payload".into()))
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: AttrValue) -> StoreResult<()> {
        let rec = self.node_mut(node)?;
        for (existing, slot) in &mut rec.attrs {
            if existing == name {
                *slot = value;
                return Ok(());
            }
        }
        rec.attrs.push((name.to_string(), value));
        Ok(())
    }

    fn get_attr(&self, node: NodeId, name: &str) -> StoreResult<Option<AttrValue>> {
        Ok(self
            .node(node)?
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    fn attr_names(&self, node: NodeId) -> StoreResult<Vec<String>> {
        Ok(self.node(node)?.attrs.iter().map(|(n, _)| n.clone()).collect())
    }

    fn child(&self, parent: NodeId, name: &str) -> StoreResult<Option<NodeId>> {
        Ok(self
            .node(parent)?
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id))
    }

    fn list_children(&self, parent: NodeId) -> StoreResult<Vec<String>> {
        Ok(self
            .node(parent)?
            .children
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    fn remove_child(&mut self, parent: NodeId, name: &str) -> StoreResult<()> {
        let rec = self.node_mut(parent)?;
        let before = rec.children.len();
        rec.children.retain(|(n, _)| n != name);
        if rec.children.len() == before {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ArrayData, ElementType};

    fn leaf() -> NdArray {
        NdArray::new(vec![2], ElementType::I64, ArrayData::I64(vec![1, 2])).unwrap()
    }

    /// Containers nest and children list in creation order.
    #[test]
    fn test_tree_building() {
        let mut store = MemStore::new();
        let root = store.root();
        let a = store.create_container(root, "a").unwrap();
        store.create_container(a, "y").unwrap();
        store.create_container(a, "x").unwrap();
        assert_eq!(store.list_children(a).unwrap(), vec!["y", "x"]);
        assert_eq!(store.node_kind(a).unwrap(), NodeKind::Container);
        assert_eq!(store.child(root, "a").unwrap(), Some(a));
        assert_eq!(store.child(root, "missing").unwrap(), None);
    }

    /// Duplicate child names are rejected at the store level.
    #[test]
    fn test_duplicate_child() {
        let mut store = MemStore::new();
        let root = store.root();
        store.create_container(root, "a").unwrap();
        let result = store.create_container(root, "a");
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    /// Leaves carry their payload; containers do not.
    #[test]
    fn test_leaf_payload() {
        let mut store = MemStore::new();
        let root = store.root();
        let node = store
            .create_leaf(root, "data", leaf(), &StorageTuning::default())
            .unwrap();
        assert_eq!(store.node_kind(node).unwrap(), NodeKind::Leaf);
        assert_eq!(store.leaf_data(node).unwrap().shape(), &[2]);
        assert!(store.leaf_data(root).is_err());
    }

    /// Attributes overwrite by name and list in creation order.
    #[test]
    fn test_attrs() {
        let mut store = MemStore::new();
        let root = store.root();
        store.set_attr(root, "a", AttrValue::Int(1)).unwrap();
        store.set_attr(root, "b", AttrValue::Str("x".into())).unwrap();
        store.set_attr(root, "a", AttrValue::Int(2)).unwrap();
        assert_eq!(store.get_attr(root, "a").unwrap(), Some(AttrValue::Int(2)));
        assert_eq!(store.attr_names(root).unwrap(), vec!["a", "b"]);
    }

    /// Removing a child detaches it; removing again is an error.
    #[test]
    fn test_remove_child() {
        let mut store = MemStore::new();
        let root = store.root();
        store.create_container(root, "a").unwrap();
        store.remove_child(root, "a").unwrap();
        assert_eq!(store.child(root, "a").unwrap(), None);
        assert!(matches!(
            store.remove_child(root, "a"),
            Err(StoreError::NotFound(_))
        ));
    }

    /// A snapshot serializes and loads back identically.
    #[test]
    fn test_snapshot_roundtrip() {
        let mut store = MemStore::new();
        let root = store.root();
        let a = store.create_container(root, "a").unwrap();
        store
            .create_leaf(a, "data", leaf(), &StorageTuning::default())
            .unwrap();
        store.set_attr(a, "tag", AttrValue::Str("t".into())).unwrap();

        let bytes = serde_json::to_vec(&store).unwrap();
        let loaded: MemStore = serde_json::from_slice(&bytes).unwrap();
        let a2 = loaded.child(loaded.root(), "a").unwrap().unwrap();
        assert_eq!(
            loaded.get_attr(a2, "tag").unwrap(),
            Some(AttrValue::Str("t".into()))
        );
        let data = loaded.child(a2, "data").unwrap().unwrap();
        assert_eq!(loaded.leaf_data(data).unwrap().shape(), &[2]);
    }
}
