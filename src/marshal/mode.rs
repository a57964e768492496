//! Cross-cutting compatibility mode policy: which identification
//! attributes each node gets and how shapes and text are normalized
//! under each mode.

use crate::{
    config::{Mode, Options},
    store::{AttrValue, HierStore, NodeId},
    value::ValueKind,
    StoreResult,
};

/// Attribute namespace reserved for the engine's own metadata. Custom
/// marshaler tags must stay outside it.
pub const RESERVED_TAG_PREFIX: &str = "hive.";

/// Native-mode type tag naming the marshaler that produced a node.
pub const TYPE_ATTR: &str = "hive.type";
/// Logical shape of a container-shaped composite (record or cell
/// array).
pub const SHAPE_ATTR: &str = "hive.shape";
/// Marks a node whose payload has zero elements.
pub const EMPTY_ATTR: &str = "hive.empty";
/// Escaped field names of a record array, in field order.
pub const FIELDS_ATTR: &str = "hive.fields";
/// Escaped key names of a mapping, in entry order.
pub const KEY_NAMES_ATTR: &str = "hive.key_names";
/// Kind tags of the mapping keys, aligned with `KEY_NAMES_ATTR`.
pub const KEY_KINDS_ATTR: &str = "hive.key_kinds";
/// UTC offset in seconds attached to a date-time leaf.
pub const TZ_OFFSET_ATTR: &str = "hive.tz_offset";

/// Consumer-convention class name attribute.
pub const MATLAB_CLASS_ATTR: &str = "MATLAB_class";
/// Consumer-convention empty marker.
pub const MATLAB_EMPTY_ATTR: &str = "MATLAB_empty";
/// Escaped field names of a struct leaf.
pub const MATLAB_FIELDS_ATTR: &str = "MATLAB_fields";
/// Store-root format marker, written once per store.
pub const MATLAB_FORMAT_ATTR: &str = "MATLAB_format";
pub const MATLAB_FORMAT_VERSION: &str = "MATLAB 7.3";

/// How a marshaler must shape and annotate its output for one mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeStyle {
    /// Write the native `hive.type` tag (plus `hive.empty` where
    /// relevant).
    pub type_tag: bool,
    /// Write the consumer `MATLAB_class` attribute (plus
    /// `MATLAB_empty`).
    pub class_name: bool,
    /// Store arrays with reversed (column-major) axis order.
    pub reversed_axes: bool,
    /// Normalize shapes below rank 2 up to rank 2.
    pub min_two_d: bool,
    /// Store text as UTF-16 code units instead of native strings.
    pub text_as_u16: bool,
}

/// Pure mode policy consulted by every marshaler.
///
/// Containers (sequences, sets, mappings) are never shape-normalized;
/// everything that lands in a leaf follows the array rules of the
/// selected mode.
pub fn style_for(kind: ValueKind, mode: Mode) -> ModeStyle {
    let container_kind = matches!(
        kind,
        ValueKind::List
            | ValueKind::Tuple
            | ValueKind::Set
            | ValueKind::Map
            | ValueKind::OrdMap
    );
    match mode {
        Mode::Native => ModeStyle {
            type_tag: true,
            class_name: false,
            reversed_axes: false,
            min_two_d: false,
            text_as_u16: false,
        },
        Mode::Matlab => ModeStyle {
            type_tag: false,
            class_name: true,
            reversed_axes: !container_kind,
            min_two_d: !container_kind,
            text_as_u16: true,
        },
        Mode::Bare => ModeStyle {
            type_tag: false,
            class_name: false,
            reversed_axes: false,
            min_two_d: false,
            text_as_u16: false,
        },
    }
}

/// Consumer class name for an element type.
pub fn matlab_class(elem: &crate::value::ElementType) -> &'static str {
    use crate::value::ElementType as E;
    match elem {
        E::Bool => "logical",
        E::I8 => "int8",
        E::I16 => "int16",
        E::I32 => "int32",
        E::I64 => "int64",
        E::U8 => "uint8",
        E::U16 => "uint16",
        E::U32 => "uint32",
        E::U64 => "uint64",
        E::F32 => "single",
        E::F64 | E::Complex => "double",
        E::FixedStr(_) | E::VarStr => "char",
        E::FixedBytes(_) | E::VarBytes => "uint8",
        E::Record(_) => "struct",
        E::Cell => "cell",
    }
}

/// Writes the identification attributes a freshly written node gets
/// under the current options.
pub fn annotate(
    store: &mut dyn HierStore,
    options: &Options,
    node: NodeId,
    tag: &str,
    class: &str,
    empty: bool,
) -> StoreResult<()> {
    match options.mode() {
        Mode::Native => {
            if options.store_metadata() {
                store.set_attr(node, TYPE_ATTR, AttrValue::Str(tag.to_string()))?;
                if empty {
                    store.set_attr(node, EMPTY_ATTR, AttrValue::Bool(true))?;
                }
            }
        }
        Mode::Matlab => {
            store.set_attr(node, MATLAB_CLASS_ATTR, AttrValue::Str(class.to_string()))?;
            if empty {
                store.set_attr(node, MATLAB_EMPTY_ATTR, AttrValue::Int(1))?;
            }
        }
        Mode::Bare => {}
    }
    Ok(())
}
