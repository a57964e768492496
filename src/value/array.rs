use serde::{Deserialize, Serialize};

use super::{types::Value, ElementType};
use crate::{StoreError, StoreResult};

/// A complex number stored as an f64 pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    pub fn new(re: f64, im: f64) -> Self {
        Complex64 { re, im }
    }
}

/// Element payload of an [`NdArray`], in row-major (C) order.
///
/// The variant must agree with the array's [`ElementType`]: `Str` backs
/// both fixed- and variable-width text, `Bytes` both byte flavors,
/// `Records` holds one field-value vector per element in layout order,
/// and `Cells` holds one arbitrary `Value` per element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Complex(Vec<Complex64>),
    Str(Vec<String>),
    Bytes(Vec<Vec<u8>>),
    Records(Vec<Vec<Value>>),
    Cells(Vec<Value>),
}

macro_rules! per_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => $body,
            ArrayData::I8($v) => $body,
            ArrayData::I16($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::U8($v) => $body,
            ArrayData::U16($v) => $body,
            ArrayData::U32($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
            ArrayData::Complex($v) => $body,
            ArrayData::Str($v) => $body,
            ArrayData::Bytes($v) => $body,
            ArrayData::Records($v) => $body,
            ArrayData::Cells($v) => $body,
        }
    };
}

macro_rules! map_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => ArrayData::Bool($body),
            ArrayData::I8($v) => ArrayData::I8($body),
            ArrayData::I16($v) => ArrayData::I16($body),
            ArrayData::I32($v) => ArrayData::I32($body),
            ArrayData::I64($v) => ArrayData::I64($body),
            ArrayData::U8($v) => ArrayData::U8($body),
            ArrayData::U16($v) => ArrayData::U16($body),
            ArrayData::U32($v) => ArrayData::U32($body),
            ArrayData::U64($v) => ArrayData::U64($body),
            ArrayData::F32($v) => ArrayData::F32($body),
            ArrayData::F64($v) => ArrayData::F64($body),
            ArrayData::Complex($v) => ArrayData::Complex($body),
            ArrayData::Str($v) => ArrayData::Str($body),
            ArrayData::Bytes($v) => ArrayData::Bytes($body),
            ArrayData::Records($v) => ArrayData::Records($body),
            ArrayData::Cells($v) => ArrayData::Cells($body),
        }
    };
}

impl ArrayData {
    pub fn len(&self) -> usize {
        per_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(&self, elem: &ElementType) -> bool {
        matches!(
            (self, elem),
            (ArrayData::Bool(_), ElementType::Bool)
                | (ArrayData::I8(_), ElementType::I8)
                | (ArrayData::I16(_), ElementType::I16)
                | (ArrayData::I32(_), ElementType::I32)
                | (ArrayData::I64(_), ElementType::I64)
                | (ArrayData::U8(_), ElementType::U8)
                | (ArrayData::U16(_), ElementType::U16)
                | (ArrayData::U32(_), ElementType::U32)
                | (ArrayData::U64(_), ElementType::U64)
                | (ArrayData::F32(_), ElementType::F32)
                | (ArrayData::F64(_), ElementType::F64)
                | (ArrayData::Complex(_), ElementType::Complex)
                | (ArrayData::Str(_), ElementType::FixedStr(_))
                | (ArrayData::Str(_), ElementType::VarStr)
                | (ArrayData::Bytes(_), ElementType::FixedBytes(_))
                | (ArrayData::Bytes(_), ElementType::VarBytes)
                | (ArrayData::Records(_), ElementType::Record(_))
                | (ArrayData::Cells(_), ElementType::Cell)
        )
    }

    /// Reorders elements into `idx` order. `idx` must be a permutation
    /// of `0..len`.
    fn permuted(&self, idx: &[usize]) -> ArrayData {
        map_variant!(self, v => idx.iter().map(|&i| v[i].clone()).collect())
    }
}

/// An n-dimensional array: shape, element descriptor and row-major
/// payload. Zero-length axes are legal; the payload is then empty but
/// the shape and element type are preserved exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NdArray {
    shape: Vec<usize>,
    elem: ElementType,
    data: ArrayData,
}

impl NdArray {
    /// Builds an array, validating that the payload variant matches the
    /// element type and its length matches the shape product.
    pub fn new(shape: Vec<usize>, elem: ElementType, data: ArrayData) -> StoreResult<Self> {
        if !data.matches(&elem) {
            return Err(StoreError::TypeMismatch(format!(
                "array payload does not match element type {}",
                elem.name()
            )));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(StoreError::TypeMismatch(format!(
                "array payload has {} elements, shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(NdArray { shape, elem, data })
    }

    /// 0-dimensional array holding one element.
    pub fn scalar(elem: ElementType, data: ArrayData) -> StoreResult<Self> {
        NdArray::new(Vec::new(), elem, data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn elem(&self) -> &ElementType {
        &self.elem
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Number of elements (product of the shape).
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the same elements laid out for the reversed axis order,
    /// i.e. converts between row-major and column-major storage. An
    /// involution: applying it twice restores the original array.
    pub fn reversed_axes(&self) -> NdArray {
        if self.ndim() < 2 || self.is_empty() {
            let mut shape = self.shape.clone();
            shape.reverse();
            return NdArray {
                shape,
                elem: self.elem.clone(),
                data: self.data.clone(),
            };
        }
        let mut rev_shape = self.shape.clone();
        rev_shape.reverse();
        // Row-major strides of the original shape.
        let mut strides = vec![1usize; self.shape.len()];
        for i in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.shape[i + 1];
        }
        let mut idx = Vec::with_capacity(self.len());
        let mut coords = vec![0usize; rev_shape.len()];
        loop {
            // Coordinate j of the reversed array is coordinate
            // (n-1-j) of the original.
            let flat: usize = coords
                .iter()
                .rev()
                .zip(strides.iter())
                .map(|(c, s)| c * s)
                .sum();
            idx.push(flat);
            // Odometer increment over rev_shape.
            let mut axis = rev_shape.len();
            loop {
                if axis == 0 {
                    return NdArray {
                        shape: rev_shape,
                        elem: self.elem.clone(),
                        data: self.data.permuted(&idx),
                    };
                }
                axis -= 1;
                coords[axis] += 1;
                if coords[axis] < rev_shape[axis] {
                    break;
                }
                coords[axis] = 0;
            }
        }
    }
}
