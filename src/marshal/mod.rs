//! The marshaling engine: bidirectional mapping between the dynamic
//! value model and the hierarchical store, driven by a registry of
//! per-kind codecs under three compatibility modes.

pub mod array;
pub mod collection;
pub mod driver;
pub mod mapping;
pub mod mode;
pub mod number;
pub mod record;
pub mod registry;
pub mod scalar;
pub mod time;
pub mod typedesc;

pub use driver::{read, read_many, write, write_many};
pub use mode::{style_for, ModeStyle, RESERVED_TAG_PREFIX};
pub use registry::MarshalerRegistry;

use tracing::trace;

use crate::{
    config::{OnExists, Options},
    store::{HierStore, NodeId, NodeKind},
    value::{NdArray, Value},
    StoreError, StoreResult,
};

/// Per-kind codec between a [`Value`] kind and its node layout.
///
/// `write` produces exactly one node under `parent` and returns it;
/// `read` reconstructs the value from that node. Composite codecs
/// recurse through the contexts, never directly into each other, so the
/// traversal depth guard sees every step.
pub trait Marshaler: Send + Sync {
    /// Representative type tag; used for override validation.
    fn type_tag(&self) -> &'static str;

    /// Every type tag this marshaler can read back.
    fn read_tags(&self) -> &'static [&'static str];

    fn handles_value(&self, value: &Value) -> bool;

    /// Whether this marshaler reads nodes carrying the given consumer
    /// class name. Layout checks (container vs leaf) disambiguate
    /// classes claimed by more than one marshaler.
    fn matches_class(
        &self,
        _class: &str,
        _store: &dyn HierStore,
        _node: NodeId,
    ) -> StoreResult<bool> {
        Ok(false)
    }

    /// Shape-only inference for nodes with no usable metadata. Ordered
    /// scanning of the builtin list makes the first match win, which is
    /// inherently heuristic and documented lossy.
    fn matches_node(&self, _store: &dyn HierStore, _node: NodeId) -> StoreResult<bool> {
        Ok(false)
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId>;

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value>;
}

/// Mutable state threaded through one top-level write.
pub struct WriteContext<'a> {
    pub store: &'a mut dyn HierStore,
    pub options: &'a Options,
    pub registry: &'a MarshalerRegistry,
    depth: usize,
}

impl<'a> WriteContext<'a> {
    pub fn new(
        store: &'a mut dyn HierStore,
        options: &'a Options,
        registry: &'a MarshalerRegistry,
    ) -> Self {
        WriteContext {
            store,
            options,
            registry,
            depth: 0,
        }
    }

    /// Dispatches a child value to its marshaler, guarding recursion
    /// depth against pathological nesting.
    pub fn write_child(
        &mut self,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        if self.depth >= self.options.max_depth() {
            return Err(StoreError::Path(format!(
                "maximum traversal depth {} exceeded at {name:?}",
                self.options.max_depth()
            )));
        }
        let marshaler = self.registry.by_value(value)?;
        trace!(name, tag = marshaler.type_tag(), "write dispatch");
        self.depth += 1;
        let result = marshaler.write(self, value, parent, name);
        self.depth -= 1;
        result
    }

    /// Creates a leaf at `parent/name`, applying the configured action
    /// for an existing name and forwarding the storage tuning.
    pub fn place_leaf(
        &mut self,
        parent: NodeId,
        name: &str,
        payload: NdArray,
    ) -> StoreResult<NodeId> {
        if self.store.child(parent, name)?.is_some() {
            match self.options.on_exists() {
                OnExists::Error => return Err(StoreError::AlreadyExists(name.to_string())),
                OnExists::Overwrite | OnExists::Merge => {
                    self.store.remove_child(parent, name)?;
                }
            }
        }
        let tuning = self.options.tuning().clone();
        self.store.create_leaf(parent, name, payload, &tuning)
    }

    /// Creates (or, under the merge action, reuses) a container at
    /// `parent/name`.
    pub fn place_container(&mut self, parent: NodeId, name: &str) -> StoreResult<NodeId> {
        if let Some(existing) = self.store.child(parent, name)? {
            match self.options.on_exists() {
                OnExists::Error => return Err(StoreError::AlreadyExists(name.to_string())),
                OnExists::Merge if self.store.node_kind(existing)? == NodeKind::Container => {
                    return Ok(existing);
                }
                OnExists::Overwrite | OnExists::Merge => {
                    self.store.remove_child(parent, name)?;
                }
            }
        }
        self.store.create_container(parent, name)
    }

    /// Removes children left over from a previous value when the merge
    /// action reused an existing container. `keep` names the children
    /// the current write produces; everything else goes, so a shorter
    /// collection never reads back stale tail elements.
    pub fn prune_children(&mut self, node: NodeId, keep: &[String]) -> StoreResult<()> {
        for name in self.store.list_children(node)? {
            if !keep.contains(&name) {
                self.store.remove_child(node, &name)?;
            }
        }
        Ok(())
    }

    /// Attaches the mode-appropriate identification attributes to a
    /// freshly written node.
    pub fn annotate(
        &mut self,
        node: NodeId,
        tag: &str,
        class: &str,
        empty: bool,
    ) -> StoreResult<()> {
        mode::annotate(self.store, self.options, node, tag, class, empty)
    }
}

/// State threaded through one top-level read.
pub struct ReadContext<'a> {
    pub store: &'a dyn HierStore,
    pub options: &'a Options,
    pub registry: &'a MarshalerRegistry,
    depth: usize,
}

impl<'a> ReadContext<'a> {
    pub fn new(
        store: &'a dyn HierStore,
        options: &'a Options,
        registry: &'a MarshalerRegistry,
    ) -> Self {
        ReadContext {
            store,
            options,
            registry,
            depth: 0,
        }
    }

    /// Reconstructs the value stored at `node`, picking the marshaler
    /// from the node's metadata or layout.
    pub fn read_child(&mut self, node: NodeId) -> StoreResult<Value> {
        if self.depth >= self.options.max_depth() {
            return Err(StoreError::Path(format!(
                "maximum traversal depth {} exceeded",
                self.options.max_depth()
            )));
        }
        let marshaler = self.registry.by_node(self.store, node, self.options)?;
        trace!(tag = marshaler.type_tag(), "read dispatch");
        self.depth += 1;
        let result = marshaler.read(self, node);
        self.depth -= 1;
        result
    }
}
