//! [`DataBlock`] is a collection of [`ArrayImpl`]

use std::fmt::Display;

use snafu::{Snafu, ensure};

use crate::array::ArrayImpl;
use crate::types::LogicalType;
use tabled::builder::Builder as TableBuilder;

#[allow(missing_docs)]
#[derive(Debug, Snafu)]
pub enum DataBlockError {
    #[snafu(display("Arrays have different length. Lengths: {lengths:?}"))]
    InconsistentLength { lengths: Vec<usize> },
    #[snafu(display("Length `{len}` exceeds the capacity `{capacity}` of the data block"))]
    LengthExceedsCapacity { len: usize, capacity: usize },
}

type Result<T> = std::result::Result<T, DataBlockError>;

/// [`DataBlock`] is a collection of [`ArrayImpl`]
///
/// All of the arrays have same number of elements, which is the capacity of the
/// data block. The length of the data block is the number of leading rows that
/// are meaningful, it is smaller than the capacity when the block is used as a
/// write destination created by [`DataBlock::with_capacity`]
#[derive(Debug)]
pub struct DataBlock {
    arrays: Vec<ArrayImpl>,
    /// Number of meaningful rows in the data block. If the [`Self::arrays`] is
    /// empty and length > 0, it means we only pass the length to other operator
    length: usize,
}

impl DataBlock {
    /// Create a new [`DataBlock`] with all of the arrays have same length
    pub fn try_new(arrays: Vec<ArrayImpl>) -> Result<Self> {
        let mut iter = arrays.iter();
        let Some(length) = iter.next().map(|array| array.len()) else {
            return Ok(Self { arrays, length: 0 });
        };

        ensure!(
            iter.all(|array| array.len() == length),
            InconsistentLengthSnafu {
                lengths: arrays.iter().map(|array| array.len()).collect::<Vec<_>>()
            }
        );

        Ok(Self { arrays, length })
    }

    /// Create a new [`DataBlock`] with no arrays, only provide length to it
    #[inline]
    pub fn new_length_only(length: usize) -> Self {
        Self {
            arrays: Vec::new(),
            length,
        }
    }

    /// Create a new empty [`DataBlock`] with given logical types
    #[inline]
    pub fn with_logical_types(logical_types: Vec<LogicalType>) -> Self {
        Self::with_capacity(logical_types, 0)
    }

    /// Create a new [`DataBlock`] whose arrays have `capacity` `NULL`s, the length
    /// of the data block is 0. Writers fill the slots with [`ArrayImpl::set`] and
    /// publish the rows with [`Self::set_len`]
    pub fn with_capacity(logical_types: Vec<LogicalType>, capacity: usize) -> Self {
        Self {
            arrays: logical_types
                .into_iter()
                .map(|logical_type| ArrayImpl::new_nulls(logical_type, capacity))
                .collect(),
            length: 0,
        }
    }

    /// Get number of meaningful rows in the data block
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the length is 0
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of rows the arrays can hold without growing
    #[inline]
    pub fn capacity(&self) -> usize {
        self.arrays.first().map_or(self.length, |array| array.len())
    }

    /// Set the number of meaningful rows
    #[inline]
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        let capacity = self.capacity();
        ensure!(
            len <= capacity,
            LengthExceedsCapacitySnafu { len, capacity }
        );
        self.length = len;
        Ok(())
    }

    /// Get number of arrays in the data block
    #[inline]
    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Get a reference to the array with given index
    #[inline]
    pub fn get_array(&self, index: usize) -> Option<&ArrayImpl> {
        self.arrays.get(index)
    }

    /// Get a mutable reference to the array with given index
    #[inline]
    pub fn get_mutable_array(&mut self, index: usize) -> Option<&mut ArrayImpl> {
        self.arrays.get_mut(index)
    }

    /// Get arrays
    #[inline]
    pub fn arrays(&self) -> &[ArrayImpl] {
        &self.arrays
    }

    /// Get mutable arrays
    #[inline]
    pub fn mutable_arrays(&mut self) -> &mut [ArrayImpl] {
        &mut self.arrays
    }

    /// Consume the data block, return its arrays
    #[inline]
    pub fn into_arrays(self) -> Vec<ArrayImpl> {
        self.arrays
    }

    /// Iterator of the logical types of the arrays
    #[inline]
    pub fn logical_types(&self) -> impl ExactSizeIterator<Item = &LogicalType> {
        self.arrays.iter().map(|array| array.logical_type())
    }

    /// Format the data block with given table builder
    pub fn fmt_table(&self, table_builder: &mut TableBuilder, with_logical_type: bool) {
        if with_logical_type {
            table_builder.push_record(
                self.arrays
                    .iter()
                    .map(|array| format!("{:?}", array.logical_type())),
            );
        }

        (0..self.length).for_each(|index| {
            table_builder.push_record(self.arrays.iter().map(|array| {
                array
                    .get(index)
                    .map_or_else(|| "Null".to_string(), |element| element.to_string())
            }));
        });
    }
}

impl Display for DataBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut table_builder = TableBuilder::default();
        self.fmt_table(&mut table_builder, true);
        write!(
            f,
            "{}",
            table_builder
                .build()
                .with(tabled::settings::style::Style::modern())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Float64Array, Int32Array};
    use crate::scalar::ScalarRef;

    #[test]
    fn test_display_data_block() {
        let block = DataBlock::try_new(vec![
            ArrayImpl::Int32(Int32Array::from_iter([Some(10), None, Some(-1)])),
            ArrayImpl::Float64(Float64Array::from_iter([None, Some(-1.0), Some(9.9)])),
        ])
        .unwrap();

        let expect = expect_test::expect![[r#"
            ┌─────────┬────────┐
            │ Integer │ Double │
            ├─────────┼────────┤
            │ 10      │ Null   │
            ├─────────┼────────┤
            │ Null    │ -1.0   │
            ├─────────┼────────┤
            │ -1      │ 9.9    │
            └─────────┴────────┘"#]];
        expect.assert_eq(&block.to_string());
    }

    #[test]
    fn test_inconsistent_length() {
        let err = DataBlock::try_new(vec![
            ArrayImpl::Int32(Int32Array::from_iter([Some(10), None])),
            ArrayImpl::Float64(Float64Array::from_iter([None])),
        ])
        .unwrap_err();
        expect_test::expect!["Arrays have different length. Lengths: [2, 1]"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn test_with_capacity() {
        let mut block = DataBlock::with_capacity(vec![LogicalType::BigInt], 4);
        assert_eq!(block.len(), 0);
        assert_eq!(block.capacity(), 4);

        block.mutable_arrays()[0]
            .set(0, Some(ScalarRef::Int64(42)))
            .unwrap();
        block.set_len(1).unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(
            block.get_array(0).unwrap().get(0),
            Some(ScalarRef::Int64(42))
        );
        assert!(block.set_len(5).is_err());
    }
}
