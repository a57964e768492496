//! Top-level write/read orchestration: path resolution, marshaler
//! dispatch and container navigation.

use tracing::debug;

use super::{
    mode::{MATLAB_FORMAT_ATTR, MATLAB_FORMAT_VERSION},
    MarshalerRegistry, ReadContext, WriteContext,
};
use crate::{
    config::{Mode, OnExists, Options},
    path,
    store::{AttrValue, HierStore, NodeId, NodeKind},
    value::Value,
    StoreError, StoreResult,
};

/// Writes `value` at `target` (a `/`-separated path), creating
/// intermediate containers as needed.
///
/// The operation is synchronous and not transactional: a failure
/// partway through a nested write leaves whatever nodes were already
/// created.
pub fn write(
    store: &mut dyn HierStore,
    value: &Value,
    target: &str,
    options: &Options,
) -> StoreResult<()> {
    let segments = path::resolve(target)?;
    debug!(target, mode = ?options.mode(), "write");
    let registry = MarshalerRegistry::for_options(options)?;
    if options.mode() == Mode::Matlab {
        let root = store.root();
        store.set_attr(
            root,
            MATLAB_FORMAT_ATTR,
            AttrValue::Str(MATLAB_FORMAT_VERSION.to_string()),
        )?;
    }
    let (last, parents) = segments.split_last().expect("resolve yields segments");
    let mut at = store.root();
    for segment in parents {
        at = descend_or_create(store, at, segment, options)?;
    }
    let mut cx = WriteContext::new(store, options, &registry);
    cx.write_child(value, at, last)?;
    Ok(())
}

/// Writes several path/value pairs in one pass over the store.
pub fn write_many(
    store: &mut dyn HierStore,
    entries: &[(&str, &Value)],
    options: &Options,
) -> StoreResult<()> {
    for (target, value) in entries {
        write(store, value, target, options)?;
    }
    Ok(())
}

/// Reads the value stored at `target`.
pub fn read(store: &dyn HierStore, target: &str, options: &Options) -> StoreResult<Value> {
    let segments = path::resolve(target)?;
    debug!(target, mode = ?options.mode(), "read");
    let registry = MarshalerRegistry::for_options(options)?;
    let mut at = store.root();
    for segment in &segments {
        at = store
            .child(at, segment)?
            .ok_or_else(|| StoreError::NotFound(target.to_string()))?;
    }
    let mut cx = ReadContext::new(store, options, &registry);
    cx.read_child(at)
}

/// Reads several paths, returning values in the same order.
pub fn read_many(
    store: &dyn HierStore,
    targets: &[&str],
    options: &Options,
) -> StoreResult<Vec<Value>> {
    targets
        .iter()
        .map(|target| read(store, target, options))
        .collect()
}

/// Walks one intermediate path segment, creating a container when the
/// name is absent. An existing leaf in the way is a path error except
/// under the overwrite action, which replaces it.
fn descend_or_create(
    store: &mut dyn HierStore,
    at: NodeId,
    segment: &str,
    options: &Options,
) -> StoreResult<NodeId> {
    if let Some(existing) = store.child(at, segment)? {
        if store.node_kind(existing)? == NodeKind::Container {
            return Ok(existing);
        }
        if options.on_exists() == OnExists::Overwrite {
            store.remove_child(at, segment)?;
        } else {
            return Err(StoreError::Path(format!(
                "intermediate segment {segment:?} is a leaf node"
            )));
        }
    }
    store.create_container(at, segment)
}
