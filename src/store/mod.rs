pub mod file;
pub mod memory;

pub use file::StoreFile;
pub use memory::MemStore;

use serde::{Deserialize, Serialize};

use crate::{config::StorageTuning, value::NdArray, StoreResult};

/// Opaque handle to one node inside a hierarchical store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Whether a node is a namespace or a payload holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Container,
    Leaf,
}

/// Small named metadata attached to a node. Attributes are not
/// addressable as paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    StrList(Vec<String>),
    IntList(Vec<i64>),
    UIntList(Vec<u64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::StrList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uint_list(&self) -> Option<&[u64]> {
        match self {
            AttrValue::UIntList(v) => Some(v),
            _ => None,
        }
    }
}

/// Capability surface the marshaling engine requires from a backing
/// hierarchical store.
///
/// The engine only ever creates containers and leaves, reads and writes
/// attributes, and walks children; file handle lifecycle, compression
/// and physical layout belong to the implementation. `StorageTuning` is
/// forwarded opaquely on leaf creation.
pub trait HierStore {
    fn root(&self) -> NodeId;

    fn node_kind(&self, node: NodeId) -> StoreResult<NodeKind>;

    fn create_container(&mut self, parent: NodeId, name: &str) -> StoreResult<NodeId>;

    fn create_leaf(
        &mut self,
        parent: NodeId,
        name: &str,
        payload: NdArray,
        tuning: &StorageTuning,
    ) -> StoreResult<NodeId>;

    fn leaf_data(&self, node: NodeId) -> StoreResult<&NdArray>;

    fn set_attr(&mut self, node: NodeId, name: &str, value: AttrValue) -> StoreResult<()>;

    fn get_attr(&self, node: NodeId, name: &str) -> StoreResult<Option<AttrValue>>;

    fn attr_names(&self, node: NodeId) -> StoreResult<Vec<String>>;

    fn child(&self, parent: NodeId, name: &str) -> StoreResult<Option<NodeId>>;

    /// Child names in creation order.
    fn list_children(&self, parent: NodeId) -> StoreResult<Vec<String>>;

    fn remove_child(&mut self, parent: NodeId, name: &str) -> StoreResult<()>;
}
