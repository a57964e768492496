use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{
    array::ArrayMarshaler,
    collection::{SequenceMarshaler, SetMarshaler},
    mapping::MappingMarshaler,
    mode::{MATLAB_CLASS_ATTR, TYPE_ATTR},
    number::{RangeSliceMarshaler, RationalMarshaler},
    record::RecordArrayMarshaler,
    scalar::{NullMarshaler, ScalarMarshaler, StringMarshaler},
    time::TimeMarshaler,
    typedesc::DtypeMarshaler,
    Marshaler,
};
use crate::{
    config::{Mode, Options},
    store::{HierStore, NodeId},
    value::Value,
    StoreError, StoreResult,
};

/// Builtin marshalers in dispatch precedence order. The record array
/// rule precedes the generic array rule; the generic array rule
/// precedes the container rules so shape inference tries leaves first.
static BUILTINS: Lazy<Vec<Arc<dyn Marshaler>>> = Lazy::new(|| {
    vec![
        Arc::new(NullMarshaler) as Arc<dyn Marshaler>,
        Arc::new(ScalarMarshaler),
        Arc::new(StringMarshaler),
        Arc::new(RecordArrayMarshaler),
        Arc::new(ArrayMarshaler),
        Arc::new(SequenceMarshaler),
        Arc::new(SetMarshaler),
        Arc::new(MappingMarshaler),
        Arc::new(TimeMarshaler),
        Arc::new(RationalMarshaler),
        Arc::new(RangeSliceMarshaler),
        Arc::new(DtypeMarshaler),
    ]
});

/// Maps values and nodes to the marshaler responsible for them.
///
/// Custom overrides from [`Options`] are consulted first, in insertion
/// order; the builtin precedence list follows. Registries are plain
/// values constructed per operation or session, never process-global
/// state.
pub struct MarshalerRegistry {
    overrides: Vec<(crate::value::ValueKind, Arc<dyn Marshaler>)>,
    builtins: &'static [Arc<dyn Marshaler>],
}

impl MarshalerRegistry {
    /// Builds a registry for the given options, validating that no
    /// override claims a tag a builtin already reads.
    pub fn for_options(options: &Options) -> StoreResult<Self> {
        let overrides = options.overrides().to_vec();
        for (kind, m) in &overrides {
            for tag in m.read_tags() {
                if BUILTINS.iter().any(|b| b.read_tags().contains(tag)) {
                    return Err(StoreError::Config(format!(
                        "override for {kind:?} claims builtin tag {tag:?}"
                    )));
                }
            }
        }
        Ok(MarshalerRegistry {
            overrides,
            builtins: &BUILTINS,
        })
    }

    /// Picks the marshaler for a value: overrides first, first match
    /// wins, then the builtin precedence list.
    pub fn by_value(&self, value: &Value) -> StoreResult<&dyn Marshaler> {
        let kind = value.kind();
        for (override_kind, m) in &self.overrides {
            if *override_kind == kind && m.handles_value(value) {
                return Ok(m.as_ref());
            }
        }
        for m in self.builtins {
            if m.handles_value(value) {
                return Ok(m.as_ref());
            }
        }
        Err(StoreError::UnsupportedValue(format!("{kind:?}")))
    }

    fn by_tag(&self, tag: &str) -> Option<&dyn Marshaler> {
        for (_, m) in &self.overrides {
            if m.read_tags().contains(&tag) {
                return Some(m.as_ref());
            }
        }
        self.builtins
            .iter()
            .find(|m| m.read_tags().contains(&tag))
            .map(|m| m.as_ref())
    }

    fn by_class(
        &self,
        class: &str,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<Option<&dyn Marshaler>> {
        for (_, m) in &self.overrides {
            if m.matches_class(class, store, node)? {
                return Ok(Some(m.as_ref()));
            }
        }
        for m in self.builtins {
            if m.matches_class(class, store, node)? {
                return Ok(Some(m.as_ref()));
            }
        }
        Ok(None)
    }

    fn by_inference(
        &self,
        store: &dyn HierStore,
        node: NodeId,
    ) -> StoreResult<Option<&dyn Marshaler>> {
        for (_, m) in &self.overrides {
            if m.matches_node(store, node)? {
                return Ok(Some(m.as_ref()));
            }
        }
        for m in self.builtins {
            if m.matches_node(store, node)? {
                return Ok(Some(m.as_ref()));
            }
        }
        Ok(None)
    }

    /// Picks the marshaler for a stored node.
    ///
    /// Native mode trusts the node's type tag, falling back to the
    /// consumer class attribute and then shape inference for nodes
    /// written under another mode (best effort, no round-trip
    /// guarantee). Matlab mode consults the class attribute and then
    /// inference. Bare mode ignores attributes entirely and infers from
    /// layout alone.
    pub fn by_node(
        &self,
        store: &dyn HierStore,
        node: NodeId,
        options: &Options,
    ) -> StoreResult<&dyn Marshaler> {
        if options.mode() == Mode::Native {
            if let Some(attr) = store.get_attr(node, TYPE_ATTR)? {
                if let Some(tag) = attr.as_str() {
                    return self.by_tag(tag).ok_or_else(|| {
                        StoreError::UnsupportedValue(format!("no marshaler reads tag {tag:?}"))
                    });
                }
            }
        }
        if options.mode() != Mode::Bare {
            if let Some(attr) = store.get_attr(node, MATLAB_CLASS_ATTR)? {
                if let Some(class) = attr.as_str() {
                    if let Some(m) = self.by_class(class, store, node)? {
                        return Ok(m);
                    }
                }
            }
        }
        self.by_inference(store, node)?
            .ok_or_else(|| StoreError::UnsupportedValue("node layout matches no marshaler".into()))
    }
}
