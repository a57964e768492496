//! File-backed scoped store handle.
//!
//! A [`StoreFile`] owns an in-memory node tree loaded from (or destined
//! for) a JSON snapshot on disk. Mutations stay in memory until
//! [`StoreFile::flush`]; `close` and `Drop` flush automatically, with
//! `Drop` downgrading a flush failure to a warning because it cannot
//! return one.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use super::{HierStore, MemStore};
use crate::{config::Options, marshal, value::Value, StoreError, StoreResult};

pub struct StoreFile {
    path: PathBuf,
    store: MemStore,
    writable: bool,
    dirty: bool,
}

impl StoreFile {
    /// Creates a new empty store at `path`, truncating any existing
    /// file on the first flush.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "create store file");
        Ok(StoreFile {
            path,
            store: MemStore::new(),
            writable: true,
            dirty: true,
        })
    }

    /// Opens an existing store file. A read-only handle rejects writes
    /// and never touches the file again.
    pub fn open(path: impl AsRef<Path>, writable: bool) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), writable, "open store file");
        let text = fs::read_to_string(&path)?;
        let store: MemStore = serde_json::from_str(&text)?;
        Ok(StoreFile {
            path,
            store,
            writable,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The backing node tree, for direct inspection.
    pub fn store(&self) -> &MemStore {
        &self.store
    }

    fn require_writable(&self) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::Config(format!(
                "store file {} is opened read-only",
                self.path.display()
            )))
        }
    }

    /// Marshals `value` at `target` under `options`.
    pub fn write(&mut self, value: &Value, target: &str, options: &Options) -> StoreResult<()> {
        self.require_writable()?;
        marshal::write(&mut self.store, value, target, options)?;
        self.dirty = true;
        Ok(())
    }

    /// Marshals several path/value pairs in order.
    pub fn write_many(
        &mut self,
        entries: &[(&str, &Value)],
        options: &Options,
    ) -> StoreResult<()> {
        self.require_writable()?;
        marshal::write_many(&mut self.store, entries, options)?;
        self.dirty = true;
        Ok(())
    }

    /// Reconstructs the value stored at `target`.
    pub fn read(&self, target: &str, options: &Options) -> StoreResult<Value> {
        marshal::read(&self.store, target, options)
    }

    /// Reads several paths, returning values in the same order.
    pub fn read_many(&self, targets: &[&str], options: &Options) -> StoreResult<Vec<Value>> {
        marshal::read_many(&self.store, targets, options)
    }

    /// Persists pending changes. The snapshot lands in a sibling temp
    /// file first and is renamed into place, so a crash mid-flush never
    /// truncates the previous snapshot.
    pub fn flush(&mut self) -> StoreResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.require_writable()?;
        let text = serde_json::to_string(&self.store)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        debug!(path = %self.path.display(), "flushed store file");
        Ok(())
    }

    /// Flushes and consumes the handle.
    pub fn close(mut self) -> StoreResult<()> {
        self.flush()
    }
}

impl Drop for StoreFile {
    fn drop(&mut self) {
        if self.dirty && self.writable {
            if let Err(err) = self.flush() {
                warn!(path = %self.path.display(), %err, "flush on drop failed");
            }
        }
    }
}

impl HierStore for StoreFile {
    fn root(&self) -> super::NodeId {
        self.store.root()
    }

    fn node_kind(&self, node: super::NodeId) -> StoreResult<super::NodeKind> {
        self.store.node_kind(node)
    }

    fn create_container(
        &mut self,
        parent: super::NodeId,
        name: &str,
    ) -> StoreResult<super::NodeId> {
        self.dirty = true;
        self.store.create_container(parent, name)
    }

    fn create_leaf(
        &mut self,
        parent: super::NodeId,
        name: &str,
        payload: crate::value::NdArray,
        tuning: &crate::config::StorageTuning,
    ) -> StoreResult<super::NodeId> {
        self.dirty = true;
        self.store.create_leaf(parent, name, payload, tuning)
    }

    fn leaf_data(&self, node: super::NodeId) -> StoreResult<&crate::value::NdArray> {
        self.store.leaf_data(node)
    }

    fn set_attr(
        &mut self,
        node: super::NodeId,
        name: &str,
        value: super::AttrValue,
    ) -> StoreResult<()> {
        self.dirty = true;
        self.store.set_attr(node, name, value)
    }

    fn get_attr(
        &self,
        node: super::NodeId,
        name: &str,
    ) -> StoreResult<Option<super::AttrValue>> {
        self.store.get_attr(node, name)
    }

    fn attr_names(&self, node: super::NodeId) -> StoreResult<Vec<String>> {
        self.store.attr_names(node)
    }

    fn child(&self, parent: super::NodeId, name: &str) -> StoreResult<Option<super::NodeId>> {
        self.store.child(parent, name)
    }

    fn list_children(&self, parent: super::NodeId) -> StoreResult<Vec<String>> {
        self.store.list_children(parent)
    }

    fn remove_child(&mut self, parent: super::NodeId, name: &str) -> StoreResult<()> {
        self.dirty = true;
        self.store.remove_child(parent, name)
    }
}
