//! # Multi-dimensional Arrays
//!
//! Marshalling between the flat, row-major buffers a dataset reader produces
//! and nested arrays that can be indexed one level at a time, for 1 to 3
//! dimensions and any [`ElementKind`].
//!
//! ## Layout
//!
//! A [`DimArray`] owns two regions that live and die together:
//!
//! - an **indirection table** holding one slot per index prefix for levels
//!   `0..N-1`. A slot at level `L < N-2` stores the first slot of its sub-table
//!   in level `L+1`; a slot at level `N-2` stores the byte offset of its row in
//!   the data region.
//! - a **data region** of `∏extents × width` bytes.
//!
//! One-dimensional arrays have no table at all and address the data region
//! directly.
//!
//! ## Ownership
//!
//! [`flatten_to_buffer`] consumes the nested array and returns a fresh
//! [`FlatBuffer`]; [`unflatten_from_buffer`] consumes the buffer and returns a
//! fresh [`DimArray`]. Neither mutates its input in place.
//!
//! ```rust
//! use h5lookup::array::{flatten_to_buffer, unflatten_from_buffer, FlatBuffer, Shape};
//!
//! let shape = Shape::new(&[2, 3])?;
//! let flat = FlatBuffer::from_values(shape, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0])?;
//! let nested = unflatten_from_buffer(flat)?;
//! assert_eq!(nested.get::<f32>(&[1, 2])?, 6.0);
//!
//! let flat = flatten_to_buffer(nested)?;
//! assert_eq!(flat.len(), 6);
//! # Ok::<(), h5lookup::array::ArrayError>(())
//! ```

use crate::kind::{Element, ElementKind, Scalar, readable_as};
use log::trace;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Largest supported rank.
pub const MAX_DIMS: usize = 3;

/// Errors raised while building or accessing arrays.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    #[error("Invalid shape {extents:?}: {reason}")]
    InvalidShape { extents: Vec<usize>, reason: String },

    #[error("Failed to allocate {bytes} bytes")]
    Allocation { bytes: usize },

    #[error("Buffer holds {actual} bytes but shape and kind require {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Array holds {actual} elements, cannot be read as {expected}")]
    KindMismatch {
        expected: ElementKind,
        actual: ElementKind,
    },

    #[error("Index {index:?} is out of bounds for shape {extents:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        extents: Vec<usize>,
    },
}

/// Ordered extents of a 1 to 3 dimensional variable.
///
/// Extents of zero are tolerated here because some files report fewer
/// populated dimensions than they declare; they are skipped when counting
/// elements. [`allocate`] still requires every extent to be positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Shape {
    extents: Vec<usize>,
}

impl Shape {
    pub fn new(extents: &[usize]) -> Result<Self, ArrayError> {
        if extents.is_empty() || extents.len() > MAX_DIMS {
            return Err(ArrayError::InvalidShape {
                extents: extents.to_vec(),
                reason: format!("rank must be between 1 and {}", MAX_DIMS),
            });
        }
        Ok(Shape {
            extents: extents.to_vec(),
        })
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Number of elements, with degenerate (zero) extents counted as 1.
    pub fn element_count(&self) -> usize {
        self.extents
            .iter()
            .filter(|&&extent| extent != 0)
            .product()
    }

    /// True when some extent is zero, e.g. an unlimited dimension with no
    /// records.
    pub fn has_zero_extent(&self) -> bool {
        self.extents.contains(&0)
    }

    /// The `MAX_DIMS` view of this shape, trailing slots padded with 1.
    pub fn padded(&self) -> [usize; MAX_DIMS] {
        let mut padded = [1; MAX_DIMS];
        padded[..self.extents.len()].copy_from_slice(&self.extents);
        padded
    }

    /// First two padded extents, read as `(rows, cols)`.
    pub fn rows_cols(&self) -> (usize, usize) {
        let padded = self.padded();
        (padded[0], padded[1])
    }

    /// Row-major strides in elements: `stride[i] = ∏extents[i+1..]`.
    fn strides(&self) -> [usize; MAX_DIMS] {
        let mut strides = [1; MAX_DIMS];
        for level in (0..self.rank().saturating_sub(1)).rev() {
            strides[level] = strides[level + 1] * self.extents[level + 1];
        }
        strides
    }

    /// Row-major flat position of `index`.
    pub fn flat_index(&self, index: &[usize]) -> usize {
        let strides = self.strides();
        index
            .iter()
            .zip(strides.iter())
            .map(|(i, stride)| i * stride)
            .sum()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.extents.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Bytes needed to hold a nested array: the indirection slots of levels
/// `0..N-1` plus the element storage.
///
/// Returns `None` on arithmetic overflow.
pub fn required_bytes(kind: ElementKind, extents: &[usize]) -> Option<usize> {
    let (slots, data) = region_sizes(kind, extents)?;
    slots
        .checked_mul(std::mem::size_of::<usize>())?
        .checked_add(data)
}

fn region_sizes(kind: ElementKind, extents: &[usize]) -> Option<(usize, usize)> {
    let (last, outer) = extents.split_last()?;
    let mut stride: usize = 1;
    let mut slots: usize = 0;
    for &extent in outer {
        slots = slots.checked_add(stride.checked_mul(extent)?)?;
        stride = stride.checked_mul(extent)?;
    }
    let data = stride.checked_mul(*last)?.checked_mul(kind.byte_width())?;
    Some((slots, data))
}

/// A nested, single-owner array indexable as `a[i]`, `a[i][j]` or `a[i][j][k]`.
#[derive(Clone, PartialEq, Eq)]
pub struct DimArray {
    kind: ElementKind,
    shape: Shape,
    table: Vec<usize>,
    data: Vec<u8>,
}

impl fmt::Debug for DimArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimArray")
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("table_slots", &self.table.len())
            .field("data_bytes", &self.data.len())
            .finish()
    }
}

/// Allocates a zeroed nested array of `kind` with the given extents.
///
/// Every extent must be positive. Allocation failure is reported as
/// [`ArrayError::Allocation`] and nothing is kept.
pub fn allocate(kind: ElementKind, shape: &Shape) -> Result<DimArray, ArrayError> {
    let extents = shape.extents();
    if extents.iter().any(|&extent| extent == 0) {
        return Err(ArrayError::InvalidShape {
            extents: extents.to_vec(),
            reason: "every extent must be positive".to_string(),
        });
    }

    let overflow = || ArrayError::Allocation { bytes: usize::MAX };
    let (slots, data_bytes) = region_sizes(kind, extents).ok_or_else(overflow)?;
    let total = required_bytes(kind, extents).ok_or_else(overflow)?;
    trace!("allocating {} bytes for {} array {}", total, kind, shape);

    let mut table: Vec<usize> = Vec::new();
    table
        .try_reserve_exact(slots)
        .map_err(|_| ArrayError::Allocation { bytes: total })?;
    let mut data: Vec<u8> = Vec::new();
    data.try_reserve_exact(data_bytes)
        .map_err(|_| ArrayError::Allocation { bytes: total })?;
    data.resize(data_bytes, 0);

    // Rank 1 keeps an empty table; the handle is the data region itself.
    if extents.len() > 1 {
        let rank = extents.len();
        let mut stride = 1;
        let mut base = 0;
        for level in 0..rank - 2 {
            let count = stride * extents[level];
            base += count;
            for j in 0..count {
                table.push(base + j * extents[level + 1]);
            }
            stride *= extents[level];
        }

        let row_bytes = extents[rank - 1] * kind.byte_width();
        for j in 0..stride * extents[rank - 2] {
            table.push(j * row_bytes);
        }
    }
    debug_assert_eq!(table.len(), slots);

    Ok(DimArray {
        kind,
        shape: shape.clone(),
        table,
        data,
    })
}

impl DimArray {
    /// Builds a nested array from row-major values.
    pub fn from_values<T: Element>(shape: Shape, values: &[T]) -> Result<Self, ArrayError> {
        unflatten_from_buffer(FlatBuffer::from_values(shape, values)?)
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Total bytes held by the table and data regions.
    pub fn footprint(&self) -> usize {
        self.table.len() * std::mem::size_of::<usize>() + self.data.len()
    }

    /// The outermost level of the array.
    pub fn root(&self) -> Slab<'_> {
        Slab {
            array: self,
            level: 0,
            base: 0,
        }
    }

    /// Shorthand for `self.root().slab(i)`.
    pub fn slab(&self, i: usize) -> Option<Slab<'_>> {
        self.root().slab(i)
    }

    fn element_offset(&self, index: &[usize]) -> Result<usize, ArrayError> {
        let out_of_bounds = || ArrayError::IndexOutOfBounds {
            index: index.to_vec(),
            extents: self.shape.extents().to_vec(),
        };
        let (last, outer) = index.split_last().ok_or_else(out_of_bounds)?;
        if index.len() != self.rank() {
            return Err(out_of_bounds());
        }

        let mut slab = self.root();
        for &i in outer {
            slab = slab.slab(i).ok_or_else(out_of_bounds)?;
        }
        slab.offset_of(*last).ok_or_else(out_of_bounds)
    }

    /// Raw native-endian bytes of the element at `index`.
    pub fn get_bytes(&self, index: &[usize]) -> Result<&[u8], ArrayError> {
        let offset = self.element_offset(index)?;
        Ok(&self.data[offset..offset + self.kind.byte_width()])
    }

    pub fn get_bytes_mut(&mut self, index: &[usize]) -> Result<&mut [u8], ArrayError> {
        let offset = self.element_offset(index)?;
        let width = self.kind.byte_width();
        Ok(&mut self.data[offset..offset + width])
    }

    /// Typed read of the element at `index`.
    pub fn get<T: Element>(&self, index: &[usize]) -> Result<T, ArrayError> {
        if !readable_as::<T>(self.kind) {
            return Err(ArrayError::KindMismatch {
                expected: T::KIND,
                actual: self.kind,
            });
        }
        Ok(bytemuck::pod_read_unaligned(self.get_bytes(index)?))
    }

    /// Typed write of the element at `index`.
    pub fn set<T: Element>(&mut self, index: &[usize], value: T) -> Result<(), ArrayError> {
        if !readable_as::<T>(self.kind) {
            return Err(ArrayError::KindMismatch {
                expected: T::KIND,
                actual: self.kind,
            });
        }
        self.get_bytes_mut(index)?
            .copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// Decoded value at `index`, or `None` when out of bounds or undecodable.
    pub fn value_at(&self, index: &[usize]) -> Option<Scalar> {
        let bytes = self.get_bytes(index).ok()?;
        self.kind.decode(bytes)
    }

    /// Value at `index` widened to `f64`, whatever the element kind.
    pub fn get_f64(&self, index: &[usize]) -> Option<f64> {
        self.value_at(index).map(Scalar::as_f64)
    }
}

/// A borrowed sub-array: the array with its leading indices fixed.
///
/// At the innermost level a slab is a single row and yields elements.
#[derive(Debug, Clone, Copy)]
pub struct Slab<'a> {
    array: &'a DimArray,
    level: usize,
    // Below the innermost level: first table slot of this sub-table.
    // At the innermost level: byte offset of this row in the data region.
    base: usize,
}

impl<'a> Slab<'a> {
    /// Number of entries at this level.
    pub fn len(&self) -> usize {
        self.array.shape.extents()[self.level]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when this slab is a row of elements.
    pub fn is_row(&self) -> bool {
        self.level + 1 == self.array.rank()
    }

    /// Descends one level. `None` at the innermost level or when out of bounds.
    pub fn slab(&self, i: usize) -> Option<Slab<'a>> {
        if self.is_row() || i >= self.len() {
            return None;
        }
        Some(Slab {
            array: self.array,
            level: self.level + 1,
            base: self.array.table[self.base + i],
        })
    }

    fn offset_of(&self, k: usize) -> Option<usize> {
        if !self.is_row() || k >= self.len() {
            return None;
        }
        Some(self.base + k * self.array.kind.byte_width())
    }

    /// Bytes of element `k` of this row.
    pub fn element(&self, k: usize) -> Option<&'a [u8]> {
        let offset = self.offset_of(k)?;
        Some(&self.array.data[offset..offset + self.array.kind.byte_width()])
    }

    /// All bytes of this row.
    pub fn row_bytes(&self) -> Option<&'a [u8]> {
        if !self.is_row() {
            return None;
        }
        let row_len = self.len() * self.array.kind.byte_width();
        Some(&self.array.data[self.base..self.base + row_len])
    }
}

/// A contiguous, row-major buffer of elements of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatBuffer {
    kind: ElementKind,
    shape: Shape,
    bytes: Vec<u8>,
}

impl FlatBuffer {
    /// Wraps `bytes`, checking it holds exactly `element_count × width` bytes.
    pub fn new(kind: ElementKind, shape: Shape, bytes: Vec<u8>) -> Result<Self, ArrayError> {
        let expected = shape.element_count() * kind.byte_width();
        if bytes.len() != expected {
            return Err(ArrayError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(FlatBuffer { kind, shape, bytes })
    }

    pub fn from_values<T: Element>(shape: Shape, values: &[T]) -> Result<Self, ArrayError> {
        let bytes: &[u8] = bytemuck::cast_slice(values);
        FlatBuffer::new(T::KIND, shape, bytes.to_vec())
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.bytes.len() / self.kind.byte_width()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes of the element at row-major position `flat_index`.
    pub fn element(&self, flat_index: usize) -> Option<&[u8]> {
        let width = self.kind.byte_width();
        let start = flat_index.checked_mul(width)?;
        self.bytes.get(start..start + width)
    }

    pub fn value_at(&self, flat_index: usize) -> Option<Scalar> {
        self.kind.decode(self.element(flat_index)?)
    }
}

/// Iterates every index of `extents` in row-major order, last index fastest.
struct RowMajor {
    extents: [usize; MAX_DIMS],
    rank: usize,
    next: Option<[usize; MAX_DIMS]>,
}

impl RowMajor {
    fn new(shape: &Shape) -> Self {
        let empty = shape.extents().iter().any(|&e| e == 0);
        RowMajor {
            extents: shape.padded(),
            rank: shape.rank(),
            next: if empty { None } else { Some([0; MAX_DIMS]) },
        }
    }
}

impl Iterator for RowMajor {
    type Item = [usize; MAX_DIMS];

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let mut following = current;
        let mut level = self.rank;
        self.next = loop {
            if level == 0 {
                break None;
            }
            level -= 1;
            following[level] += 1;
            if following[level] < self.extents[level] {
                break Some(following);
            }
            following[level] = 0;
        };
        Some(current)
    }
}

/// Copies a nested array into a fresh flat buffer, consuming the array.
pub fn flatten_to_buffer(array: DimArray) -> Result<FlatBuffer, ArrayError> {
    let width = array.kind.byte_width();
    let rank = array.rank();
    let total = array.shape.element_count() * width;

    let mut bytes: Vec<u8> = Vec::new();
    bytes
        .try_reserve_exact(total)
        .map_err(|_| ArrayError::Allocation { bytes: total })?;
    bytes.resize(total, 0);

    for index in RowMajor::new(&array.shape) {
        let index = &index[..rank];
        let flat = array.shape.flat_index(index) * width;
        bytes[flat..flat + width].copy_from_slice(array.get_bytes(index)?);
    }

    trace!("flattened {} array {} into {} bytes", array.kind, array.shape, total);
    FlatBuffer::new(array.kind, array.shape, bytes)
}

/// Copies a flat buffer into a freshly allocated nested array, consuming the buffer.
pub fn unflatten_from_buffer(buffer: FlatBuffer) -> Result<DimArray, ArrayError> {
    let width = buffer.kind.byte_width();
    let rank = buffer.shape.rank();
    let mut array = allocate(buffer.kind, &buffer.shape)?;

    for index in RowMajor::new(&buffer.shape) {
        let index = &index[..rank];
        let flat = buffer.shape.flat_index(index) * width;
        array
            .get_bytes_mut(index)?
            .copy_from_slice(&buffer.bytes[flat..flat + width]);
    }

    trace!("unflattened {} buffer into {:?}", buffer.kind, array);
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_shape_validation() {
        assert!(Shape::new(&[]).is_err());
        assert!(Shape::new(&[1, 2, 3, 4]).is_err());
        assert_eq!(Shape::new(&[4, 5]).unwrap().rank(), 2);
    }

    #[test]
    fn test_element_count_skips_degenerate_extents() {
        assert_eq!(Shape::new(&[4, 5, 6]).unwrap().element_count(), 120);
        assert_eq!(Shape::new(&[4, 0, 6]).unwrap().element_count(), 24);
        assert_eq!(Shape::new(&[7, 0]).unwrap().element_count(), 7);
        assert!(Shape::new(&[7, 0]).unwrap().has_zero_extent());
        assert!(!Shape::new(&[7, 1]).unwrap().has_zero_extent());
    }

    #[test]
    fn test_padded_shape() {
        assert_eq!(Shape::new(&[10]).unwrap().padded(), [10, 1, 1]);
        assert_eq!(Shape::new(&[10, 20]).unwrap().padded(), [10, 20, 1]);
        assert_eq!(Shape::new(&[10, 20]).unwrap().rows_cols(), (10, 20));
    }

    #[test]
    fn test_flat_index() {
        let shape = Shape::new(&[2, 3, 4]).unwrap();
        assert_eq!(shape.flat_index(&[0, 0, 0]), 0);
        assert_eq!(shape.flat_index(&[0, 0, 3]), 3);
        assert_eq!(shape.flat_index(&[0, 1, 0]), 4);
        assert_eq!(shape.flat_index(&[1, 2, 3]), 23);
    }

    #[test]
    fn test_required_bytes() {
        let ptr = std::mem::size_of::<usize>();
        // 1-D: data only
        assert_eq!(required_bytes(ElementKind::Float, &[10]), Some(40));
        // 2-D: 3 row slots + 3*4 floats
        assert_eq!(required_bytes(ElementKind::Float, &[3, 4]), Some(3 * ptr + 48));
        // 3-D: 2 + 2*3 slots + 24 doubles
        assert_eq!(
            required_bytes(ElementKind::Double, &[2, 3, 4]),
            Some(8 * ptr + 24 * 8)
        );
    }

    #[test]
    fn test_allocate_rejects_zero_extent() {
        let shape = Shape::new(&[3, 0]).unwrap();
        assert!(matches!(
            allocate(ElementKind::Float, &shape),
            Err(ArrayError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_allocate_footprint_matches_required_bytes() {
        for extents in [&[5][..], &[3, 4], &[2, 3, 4]] {
            let shape = Shape::new(extents).unwrap();
            let array = allocate(ElementKind::UnsignedShort, &shape).unwrap();
            assert_eq!(
                Some(array.footprint()),
                required_bytes(ElementKind::UnsignedShort, extents)
            );
        }
    }

    #[test]
    fn test_nested_indexing_3d() {
        let shape = Shape::new(&[2, 3, 4]).unwrap();
        let mut array = allocate(ElementKind::Double, &shape).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    let value = i as f64 * 10.0 + j as f64 + k as f64 / 10.0;
                    array.set(&[i, j, k], value).unwrap();
                }
            }
        }

        assert_eq!(array.get::<f64>(&[0, 0, 0]).unwrap(), 0.0);
        let expected = 10.0 + 2.0 + 3.0 / 10.0;
        assert_eq!(array.get::<f64>(&[1, 2, 3]).unwrap(), expected);

        let row = array.slab(1).unwrap().slab(2).unwrap();
        assert!(row.is_row());
        assert_eq!(row.len(), 4);
        let bytes = row.element(3).unwrap();
        assert_eq!(bytemuck::pod_read_unaligned::<f64>(bytes), expected);
        assert!(row.slab(0).is_none());
        assert!(array.slab(2).is_none());
    }

    #[test]
    fn test_one_dimensional_has_no_table() {
        let shape = Shape::new(&[5]).unwrap();
        let array = DimArray::from_values(shape, &[10i32, 20, 30, 40, 50]).unwrap();
        assert_eq!(array.footprint(), 20);
        assert!(array.root().is_row());
        assert_eq!(array.get::<i32>(&[4]).unwrap(), 50);
        assert_eq!(array.root().row_bytes().unwrap().len(), 20);
    }

    #[test]
    fn test_out_of_bounds_and_wrong_rank() {
        let shape = Shape::new(&[2, 2]).unwrap();
        let array = DimArray::from_values(shape, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            array.get::<f32>(&[2, 0]),
            Err(ArrayError::IndexOutOfBounds { .. })
        ));
        assert!(array.get::<f32>(&[0, 2]).is_err());
        assert!(array.get::<f32>(&[0]).is_err());
        assert!(array.get::<f32>(&[0, 0, 0]).is_err());
    }

    #[test]
    fn test_typed_read_checks_kind() {
        let shape = Shape::new(&[1, 2]).unwrap();
        let array = DimArray::from_values(shape, &[1.0f32, 2.0]).unwrap();
        assert!(matches!(
            array.get::<f64>(&[0, 0]),
            Err(ArrayError::KindMismatch { .. })
        ));
        assert_eq!(array.get_f64(&[0, 1]), Some(2.0));
    }

    #[test]
    fn test_flat_buffer_length_check() {
        let shape = Shape::new(&[2, 3]).unwrap();
        let result = FlatBuffer::new(ElementKind::Short, shape, vec![0u8; 10]);
        assert_eq!(
            result,
            Err(ArrayError::LengthMismatch {
                expected: 12,
                actual: 10
            })
        );
    }

    #[test]
    fn test_unflatten_places_values_row_major() {
        let shape = Shape::new(&[2, 3]).unwrap();
        let flat = FlatBuffer::from_values(shape, &[0u16, 1, 2, 3, 4, 5]).unwrap();
        let array = unflatten_from_buffer(flat).unwrap();
        assert_eq!(array.get::<u16>(&[0, 2]).unwrap(), 2);
        assert_eq!(array.get::<u16>(&[1, 0]).unwrap(), 3);
        assert_eq!(array.get::<u16>(&[1, 2]).unwrap(), 5);
    }

    #[test]
    fn test_round_trip_every_kind_and_rank() {
        let shapes: [&[usize]; 5] = [&[1], &[7], &[3, 5], &[1, 4], &[2, 3, 4]];
        for kind in ElementKind::ALL {
            for extents in shapes {
                let shape = Shape::new(extents).unwrap();
                let bytes = pattern(shape.element_count() * kind.byte_width());
                let original = FlatBuffer::new(kind, shape, bytes.clone()).unwrap();

                let nested = unflatten_from_buffer(original).unwrap();
                let flat = flatten_to_buffer(nested).unwrap();
                let nested = unflatten_from_buffer(flat).unwrap();
                let flat = flatten_to_buffer(nested).unwrap();

                assert_eq!(flat.kind(), kind);
                assert_eq!(flat.as_bytes(), &bytes[..], "{} {:?}", kind, extents);
            }
        }
    }

    #[test]
    fn test_row_major_order() {
        let shape = Shape::new(&[2, 2]).unwrap();
        let order: Vec<[usize; MAX_DIMS]> = RowMajor::new(&shape).collect();
        assert_eq!(order, vec![[0, 0, 0], [0, 1, 0], [1, 0, 0], [1, 1, 0]]);
    }
}
