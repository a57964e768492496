use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// Element type of an [`NdArray`](super::NdArray), or a standalone type
/// descriptor carried by [`Value::Dtype`](super::Value::Dtype).
///
/// Fixed-width text counts characters (code points), fixed-width bytes
/// count octets. `Record` describes a structured element with named,
/// ordered, possibly nested fields. `Cell` marks an element that is an
/// arbitrary opaque [`Value`](super::Value).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ElementType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Complex,
    /// Text with a fixed maximum length in characters.
    FixedStr(usize),
    /// Variable-length text.
    VarStr,
    /// Byte string with a fixed length in octets.
    FixedBytes(usize),
    /// Variable-length byte string.
    VarBytes,
    /// Structured record element with a nested field schema.
    Record(RecordLayout),
    /// Each element is an arbitrary `Value`.
    Cell,
}

impl ElementType {
    /// Size of one element in bytes, when it is statically known.
    ///
    /// Variable-width and opaque elements have no fixed size. Fixed text
    /// is counted at four bytes per character.
    pub fn itemsize(&self) -> Option<usize> {
        match self {
            ElementType::Bool | ElementType::I8 | ElementType::U8 => Some(1),
            ElementType::I16 | ElementType::U16 => Some(2),
            ElementType::I32 | ElementType::U32 | ElementType::F32 => Some(4),
            ElementType::I64 | ElementType::U64 | ElementType::F64 => Some(8),
            ElementType::Complex => Some(16),
            ElementType::FixedStr(n) => Some(4 * n),
            ElementType::FixedBytes(n) => Some(*n),
            ElementType::VarStr | ElementType::VarBytes | ElementType::Cell => None,
            ElementType::Record(layout) => layout.itemsize(),
        }
    }

    /// Short stable name used in type attributes and error messages.
    pub fn name(&self) -> String {
        match self {
            ElementType::Bool => "bool".into(),
            ElementType::I8 => "i8".into(),
            ElementType::I16 => "i16".into(),
            ElementType::I32 => "i32".into(),
            ElementType::I64 => "i64".into(),
            ElementType::U8 => "u8".into(),
            ElementType::U16 => "u16".into(),
            ElementType::U32 => "u32".into(),
            ElementType::U64 => "u64".into(),
            ElementType::F32 => "f32".into(),
            ElementType::F64 => "f64".into(),
            ElementType::Complex => "complex".into(),
            ElementType::FixedStr(n) => format!("str{n}"),
            ElementType::VarStr => "str".into(),
            ElementType::FixedBytes(n) => format!("bytes{n}"),
            ElementType::VarBytes => "bytes".into(),
            ElementType::Record(_) => "record".into(),
            ElementType::Cell => "cell".into(),
        }
    }
}

/// One field of a structured record layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub elem: ElementType,
    /// Per-field sub-array shape; empty for a plain scalar field.
    pub shape: Vec<usize>,
    /// Byte offset of the field inside one record, when computable.
    pub offset: Option<usize>,
}

impl RecordField {
    pub fn scalar(name: impl Into<String>, elem: ElementType) -> Self {
        RecordField {
            name: name.into(),
            elem,
            shape: Vec::new(),
            offset: None,
        }
    }

    pub fn with_shape(name: impl Into<String>, elem: ElementType, shape: Vec<usize>) -> Self {
        RecordField {
            name: name.into(),
            elem,
            shape,
            offset: None,
        }
    }

    fn field_size(&self) -> Option<usize> {
        let count: usize = self.shape.iter().product();
        self.elem.itemsize().map(|s| s * count)
    }
}

/// Named, ordered field schema of a structured record element.
///
/// Field names are unique within one layout; fields may themselves be
/// records, nested to arbitrary depth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordLayout {
    fields: Vec<RecordField>,
}

impl RecordLayout {
    /// Builds a layout, computing byte offsets where the element sizes
    /// are statically known. Duplicate field names are rejected.
    pub fn new(mut fields: Vec<RecordField>) -> StoreResult<Self> {
        for i in 0..fields.len() {
            for j in (i + 1)..fields.len() {
                if fields[i].name == fields[j].name {
                    return Err(StoreError::Collision(fields[i].name.clone()));
                }
            }
        }
        let mut offset = Some(0usize);
        for field in &mut fields {
            field.offset = offset;
            offset = match (offset, field.field_size()) {
                (Some(o), Some(s)) => Some(o + s),
                _ => None,
            };
        }
        Ok(RecordLayout { fields })
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total record size in bytes when every field has a fixed size.
    pub fn itemsize(&self) -> Option<usize> {
        self.fields
            .iter()
            .try_fold(0usize, |acc, f| f.field_size().map(|s| acc + s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Offsets accumulate across fixed-size fields, including sub-array
    /// shaped fields.
    #[test]
    fn test_offsets() {
        let layout = RecordLayout::new(vec![
            RecordField::scalar("x", ElementType::I32),
            RecordField::with_shape("q", ElementType::I8, vec![2]),
            RecordField::scalar("y", ElementType::F64),
        ])
        .unwrap();
        let offsets: Vec<_> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![Some(0), Some(4), Some(6)]);
        assert_eq!(layout.itemsize(), Some(14));
    }

    /// A variable-width field poisons every later offset but not the
    /// earlier ones.
    #[test]
    fn test_offsets_after_var_width() {
        let layout = RecordLayout::new(vec![
            RecordField::scalar("a", ElementType::I8),
            RecordField::scalar("s", ElementType::VarStr),
            RecordField::scalar("b", ElementType::I8),
        ])
        .unwrap();
        let offsets: Vec<_> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![Some(0), Some(1), None]);
        assert_eq!(layout.itemsize(), None);
    }

    /// Duplicate field names are a construction error.
    #[test]
    fn test_duplicate_field_names() {
        let result = RecordLayout::new(vec![
            RecordField::scalar("x", ElementType::I8),
            RecordField::scalar("x", ElementType::I16),
        ]);
        assert!(matches!(result, Err(StoreError::Collision(_))));
    }

    /// Nested record layouts compute a combined itemsize.
    #[test]
    fn test_nested_itemsize() {
        let inner = RecordLayout::new(vec![
            RecordField::scalar("p", ElementType::I8),
            RecordField::with_shape("q", ElementType::I8, vec![2]),
        ])
        .unwrap();
        let outer = RecordLayout::new(vec![
            RecordField::scalar("x", ElementType::I32),
            RecordField::scalar("y", ElementType::Record(inner)),
        ])
        .unwrap();
        assert_eq!(outer.itemsize(), Some(7));
    }
}
