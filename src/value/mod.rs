pub mod array;
pub mod dtype;
pub mod map;
pub mod types;

pub use array::{ArrayData, Complex64, NdArray};
pub use dtype::{ElementType, RecordField, RecordLayout};
pub use map::{MapKey, OrderedMap};
pub use types::{Value, ValueKind};
