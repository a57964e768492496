/// Marshaling behavior switches: compatibility mode, existing-name
/// actions, storage tuning, custom marshaler overrides.
pub mod config;
/// Common error type and result alias.
pub mod error;
/// Validation and flattening for the legacy-format bridge.
pub mod legacy;
/// The marshaling engine: marshalers, registry, traversal driver and
/// compatibility mode policy.
pub mod marshal;
/// Path resolution and name escaping.
pub mod path;
/// The hierarchical store capability trait and its in-memory and
/// file-backed implementations.
pub mod store;
/// The dynamic value model: scalars, arrays, element descriptors,
/// collections, mappings and calendar values.
pub mod value;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Operation configuration.
pub use config::{Mode, OnExists, Options, OptionsBuilder, StorageTuning};
/// Operation errors and result type.
pub use error::{StoreError, StoreResult};
/// Top-level operations, the marshaler extension point and mode policy.
pub use marshal::{
    read, read_many, write, write_many, Marshaler, MarshalerRegistry, ReadContext, WriteContext,
};
/// Store backends.
pub use store::{AttrValue, HierStore, MemStore, NodeId, NodeKind, StoreFile};
/// The value model.
pub use value::{
    ArrayData, Complex64, ElementType, MapKey, NdArray, OrderedMap, RecordField, RecordLayout,
    Value, ValueKind,
};
