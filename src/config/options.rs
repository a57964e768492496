use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    marshal::{Marshaler, RESERVED_TAG_PREFIX},
    value::ValueKind,
    StoreError, StoreResult,
};

/// Compatibility mode of a write or read operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Self-describing layout with rich type-tag metadata; maximal
    /// round-trip fidelity.
    #[default]
    Native,
    /// Layout conforming to the MATLAB v7.3 consumer convention:
    /// class-name attributes, column-major axis order, minimum-2-D
    /// shapes.
    Matlab,
    /// No type metadata at all; reads fall back to shape inference and
    /// some kind distinctions are lost by design.
    Bare,
}

/// What to do when writing to a name that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnExists {
    Error,
    #[default]
    Overwrite,
    /// Keep the existing container and write children into it;
    /// non-container nodes are still replaced.
    Merge,
}

/// Storage tuning forwarded opaquely to the backing store. The engine
/// never interprets these.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageTuning {
    pub chunk_shape: Option<Vec<usize>>,
    pub compression_level: Option<u32>,
}

/// Immutable, validated bundle of marshaling behavior switches.
///
/// Built once via [`Options::builder`] and shared read-only by every
/// component of an operation.
#[derive(Clone)]
pub struct Options {
    mode: Mode,
    store_metadata: bool,
    on_exists: OnExists,
    tuning: StorageTuning,
    max_depth: usize,
    overrides: Vec<(ValueKind, Arc<dyn Marshaler>)>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether rich type metadata is attached. Matlab mode has its own
    /// fixed convention and Bare mode writes none, so the flag only
    /// matters in native mode.
    pub fn store_metadata(&self) -> bool {
        self.mode == Mode::Native && self.store_metadata
    }

    pub fn on_exists(&self) -> OnExists {
        self.on_exists
    }

    pub fn tuning(&self) -> &StorageTuning {
        &self.tuning
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn overrides(&self) -> &[(ValueKind, Arc<dyn Marshaler>)] {
        &self.overrides
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::builder().build().expect("default options are valid")
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("mode", &self.mode)
            .field("store_metadata", &self.store_metadata)
            .field("on_exists", &self.on_exists)
            .field("tuning", &self.tuning)
            .field("max_depth", &self.max_depth)
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

/// Builder for [`Options`]; `build` validates the whole bundle and
/// fails fast on conflicting settings.
pub struct OptionsBuilder {
    mode: Mode,
    store_metadata: bool,
    on_exists: OnExists,
    tuning: StorageTuning,
    max_depth: usize,
    overrides: Vec<(ValueKind, Arc<dyn Marshaler>)>,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        OptionsBuilder {
            mode: Mode::Native,
            store_metadata: true,
            on_exists: OnExists::Overwrite,
            tuning: StorageTuning::default(),
            max_depth: 64,
            overrides: Vec::new(),
        }
    }
}

impl OptionsBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store_metadata(mut self, yes: bool) -> Self {
        self.store_metadata = yes;
        self
    }

    pub fn on_exists(mut self, action: OnExists) -> Self {
        self.on_exists = action;
        self
    }

    pub fn tuning(mut self, tuning: StorageTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Registers a custom marshaler consulted before the builtins for
    /// values of `kind`. Overrides are consulted in insertion order and
    /// the first match wins.
    pub fn override_marshaler(mut self, kind: ValueKind, m: Arc<dyn Marshaler>) -> Self {
        self.overrides.push((kind, m));
        self
    }

    pub fn build(self) -> StoreResult<Options> {
        if self.max_depth == 0 {
            return Err(StoreError::Config("max_depth must be at least 1".into()));
        }
        if let Some(shape) = &self.tuning.chunk_shape {
            if shape.iter().any(|&n| n == 0) {
                return Err(StoreError::Config("chunk shape axes must be nonzero".into()));
            }
        }
        for (kind, m) in &self.overrides {
            if m.type_tag().starts_with(RESERVED_TAG_PREFIX) {
                return Err(StoreError::Config(format!(
                    "override for {kind:?} uses reserved type tag {:?}",
                    m.type_tag()
                )));
            }
        }
        Ok(Options {
            mode: self.mode,
            store_metadata: self.store_metadata,
            on_exists: self.on_exists,
            tuning: self.tuning,
            max_depth: self.max_depth,
            overrides: self.overrides,
        })
    }
}
