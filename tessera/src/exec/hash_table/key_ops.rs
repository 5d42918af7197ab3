//! Key operations plugged into the [`ChainedHashTable`]
//!
//! The table itself only knows the chains, it asks the [`KeyOps`] to hash the
//! input rows, compare them with the stored keys, copy the keys into its segments
//! and write them into the output.
//!
//! Lookups of a join come from the probe side, whose key columns may live at
//! other positions than the build side. [`KeyOps::hash_probe`] and
//! [`KeyOps::key_equals_probe`] read the probe side layout
//!
//! [`ChainedHashTable`]: super::ChainedHashTable

use std::fmt::Debug;
use std::hash::{BuildHasher, Hash, Hasher};

use data_block::block::DataBlock;
use data_block::types::LogicalType;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use super::config::KeyColumnSpec;
use crate::common::types::HashValue;
use crate::common::utils::hash::{BUILD_HASHER_DEFAULT, fold_hash};
use crate::error::SendableError;

/// Operations on the keys of the hash table
///
/// # Contract
///
/// - [`KeyOps::hash`] must be pure: the same input row always produces the same
///   [`HashValue`], otherwise rows with equal keys may land in different chains
/// - [`KeyOps::key_equals`] must be consistent with [`KeyOps::hash`]: equal keys
///   have equal hashes
/// - [`KeyOps::hash_probe`] of a probe row equals [`KeyOps::hash`] of the build
///   row with the same key
pub trait KeyOps: Debug {
    /// Compute the hash of the key at `row` of the `input`
    fn hash(&self, input: &DataBlock, row: usize) -> HashValue;

    /// Returns true if the key at `row` of the `input` equals to the key stored
    /// in `slot` of the `keys`
    fn key_equals(&self, input: &DataBlock, row: usize, keys: &DataBlock, slot: usize) -> bool;

    /// Compute the hash of the key at `row` of the `probe` side input. The build
    /// side layout is used by default
    #[inline]
    fn hash_probe(&self, probe: &DataBlock, row: usize) -> HashValue {
        self.hash(probe, row)
    }

    /// Returns true if the key at `row` of the `probe` side input equals to the
    /// key stored in `slot` of the `keys`. The build side layout is used by default
    #[inline]
    fn key_equals_probe(
        &self,
        probe: &DataBlock,
        row: usize,
        keys: &DataBlock,
        slot: usize,
    ) -> bool {
        self.key_equals(probe, row, keys, slot)
    }

    /// Copy the key at `row` of the `input` into `slot` of the `keys`
    fn copy_key_into(
        &self,
        input: &DataBlock,
        row: usize,
        keys: &mut DataBlock,
        slot: usize,
    ) -> Result<(), SendableError>;

    /// Write the key stored in `slot` of the `keys` into `out_row` of the `output`.
    /// Returns `Ok(false)` if the output is full
    fn output_key_row(
        &self,
        keys: &DataBlock,
        slot: usize,
        output: &mut DataBlock,
        out_row: usize,
    ) -> Result<bool, SendableError>;
}

/// How the `NULL` in the key is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullEquality {
    /// `NULL` equals to `NULL`, used by grouping
    NullEqualsNull,
    /// `NULL` never equals to anything, used by join
    NullNeverMatches,
}

#[allow(missing_docs)]
/// Error returned by [`ColumnKeyOps`]
#[derive(Debug, Snafu)]
pub enum KeyOpsError {
    #[snafu(display(
        "Number of key indexes `{num_indexes}` does not equal to the number of key columns `{num_key_columns}`"
    ))]
    KeyCountMismatch {
        num_indexes: usize,
        num_key_columns: usize,
    },
    #[snafu(display(
        "Key index `{index}` is out of range, the input only has `{num_columns}` columns"
    ))]
    KeyIndexOutOfRange { index: usize, num_columns: usize },
    #[snafu(display(
        "Key column `{name}` has type `{expected}`, however the input column `{index}` has type `{found}`"
    ))]
    KeyTypeMismatch {
        name: String,
        index: usize,
        expected: LogicalType,
        found: LogicalType,
    },
    #[snafu(display(
        "Output has `{found}` columns, it can not hold `{required}` key columns"
    ))]
    OutputColumnsMissing { required: usize, found: usize },
}

/// [`KeyOps`] that reads the key from the columns of the input [`DataBlock`]
#[derive(Debug)]
pub struct ColumnKeyOps {
    /// Index of the `i`th key column in the build side input
    key_indexes: Vec<usize>,
    /// Index of the `i`th key column in the probe side input
    probe_key_indexes: Vec<usize>,
    null_equality: NullEquality,
}

impl ColumnKeyOps {
    /// Create a new [`ColumnKeyOps`], the `i`th key column is read from the input
    /// column `key_indexes[i]`. The probe side has the same layout until
    /// [`Self::with_probe_side`] is called
    pub fn try_new(
        key_indexes: Vec<usize>,
        input_types: &[LogicalType],
        key_columns: &[KeyColumnSpec],
        null_equality: NullEquality,
    ) -> Result<Self, KeyOpsError> {
        check_key_columns(&key_indexes, input_types, key_columns)?;
        Ok(Self {
            probe_key_indexes: key_indexes.clone(),
            key_indexes,
            null_equality,
        })
    }

    /// Read the `i`th key column of the probe side from the probe column
    /// `probe_key_indexes[i]`
    pub fn with_probe_side(
        mut self,
        probe_key_indexes: Vec<usize>,
        probe_types: &[LogicalType],
        key_columns: &[KeyColumnSpec],
    ) -> Result<Self, KeyOpsError> {
        check_key_columns(&probe_key_indexes, probe_types, key_columns)?;
        self.probe_key_indexes = probe_key_indexes;
        Ok(self)
    }

    /// Index of the key columns in the build side input
    #[inline]
    pub fn key_indexes(&self) -> &[usize] {
        &self.key_indexes
    }

    /// Index of the key columns in the probe side input
    #[inline]
    pub fn probe_key_indexes(&self) -> &[usize] {
        &self.probe_key_indexes
    }

    fn hash_columns(key_indexes: &[usize], input: &DataBlock, row: usize) -> HashValue {
        let mut hasher = BUILD_HASHER_DEFAULT.build_hasher();
        let arrays = input.arrays();
        key_indexes
            .iter()
            .for_each(|&index| arrays[index].get(row).hash(&mut hasher));
        fold_hash(hasher.finish())
    }

    fn columns_equal(
        &self,
        key_indexes: &[usize],
        input: &DataBlock,
        row: usize,
        keys: &DataBlock,
        slot: usize,
    ) -> bool {
        let arrays = input.arrays();
        key_indexes
            .iter()
            .zip(keys.arrays())
            .all(|(&index, stored)| match (arrays[index].get(row), stored.get(slot)) {
                (Some(lhs), Some(rhs)) => lhs == rhs,
                (None, None) => self.null_equality == NullEquality::NullEqualsNull,
                _ => false,
            })
    }
}

/// Check the `key_indexes` point to the input columns with the type of the keys
fn check_key_columns(
    key_indexes: &[usize],
    input_types: &[LogicalType],
    key_columns: &[KeyColumnSpec],
) -> Result<(), KeyOpsError> {
    ensure!(
        key_indexes.len() == key_columns.len(),
        KeyCountMismatchSnafu {
            num_indexes: key_indexes.len(),
            num_key_columns: key_columns.len(),
        }
    );

    key_indexes
        .iter()
        .zip(key_columns)
        .try_for_each(|(&index, column)| -> Result<(), KeyOpsError> {
            let found = input_types.get(index).context(KeyIndexOutOfRangeSnafu {
                index,
                num_columns: input_types.len(),
            })?;
            ensure!(
                *found == column.logical_type,
                KeyTypeMismatchSnafu {
                    name: column.name.clone(),
                    index,
                    expected: column.logical_type.clone(),
                    found: found.clone(),
                }
            );
            Ok(())
        })
}

impl KeyOps for ColumnKeyOps {
    fn hash(&self, input: &DataBlock, row: usize) -> HashValue {
        Self::hash_columns(&self.key_indexes, input, row)
    }

    fn key_equals(&self, input: &DataBlock, row: usize, keys: &DataBlock, slot: usize) -> bool {
        self.columns_equal(&self.key_indexes, input, row, keys, slot)
    }

    fn hash_probe(&self, probe: &DataBlock, row: usize) -> HashValue {
        Self::hash_columns(&self.probe_key_indexes, probe, row)
    }

    fn key_equals_probe(
        &self,
        probe: &DataBlock,
        row: usize,
        keys: &DataBlock,
        slot: usize,
    ) -> bool {
        self.columns_equal(&self.probe_key_indexes, probe, row, keys, slot)
    }

    fn copy_key_into(
        &self,
        input: &DataBlock,
        row: usize,
        keys: &mut DataBlock,
        slot: usize,
    ) -> Result<(), SendableError> {
        let arrays = input.arrays();
        self.key_indexes
            .iter()
            .zip(keys.mutable_arrays())
            .try_for_each(|(&index, stored)| stored.set_from(slot, &arrays[index], row))
            .boxed()
    }

    fn output_key_row(
        &self,
        keys: &DataBlock,
        slot: usize,
        output: &mut DataBlock,
        out_row: usize,
    ) -> Result<bool, SendableError> {
        ensure!(
            output.num_arrays() >= keys.num_arrays(),
            OutputColumnsMissingSnafu {
                required: keys.num_arrays(),
                found: output.num_arrays(),
            }
        );
        if out_row >= output.capacity() {
            return Ok(false);
        }

        output
            .mutable_arrays()
            .iter_mut()
            .zip(keys.arrays())
            .try_for_each(|(target, stored)| target.set_from(out_row, stored, slot))
            .boxed()?;

        if out_row >= output.len() {
            output.set_len(out_row + 1).boxed()?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_block::array::{ArrayImpl, Int64Array, StringArray};
    use data_block::scalar::ScalarRef;
    use expect_test::expect;

    fn key_columns() -> Vec<KeyColumnSpec> {
        vec![
            KeyColumnSpec::new("name", LogicalType::VarChar),
            KeyColumnSpec::new("id", LogicalType::BigInt),
        ]
    }

    fn input() -> DataBlock {
        DataBlock::try_new(vec![
            ArrayImpl::Int64(Int64Array::from_iter([Some(1), Some(1), None, None])),
            ArrayImpl::String(StringArray::from_iter([
                Some("curry"),
                Some("curry"),
                None,
                None,
            ])),
        ])
        .unwrap()
    }

    #[test]
    fn test_try_new() {
        let input_types = [LogicalType::BigInt, LogicalType::VarChar];
        ColumnKeyOps::try_new(
            vec![1, 0],
            &input_types,
            &key_columns(),
            NullEquality::NullEqualsNull,
        )
        .unwrap();

        let err = ColumnKeyOps::try_new(
            vec![1, 2],
            &input_types,
            &key_columns(),
            NullEquality::NullEqualsNull,
        )
        .unwrap_err();
        expect!["Key index `2` is out of range, the input only has `2` columns"]
            .assert_eq(&err.to_string());

        let err = ColumnKeyOps::try_new(
            vec![0, 1],
            &input_types,
            &key_columns(),
            NullEquality::NullEqualsNull,
        )
        .unwrap_err();
        expect!["Key column `name` has type `VARCHAR`, however the input column `0` has type `BIGINT`"]
            .assert_eq(&err.to_string());

        let err = ColumnKeyOps::try_new(
            vec![0],
            &input_types,
            &key_columns(),
            NullEquality::NullEqualsNull,
        )
        .unwrap_err();
        expect!["Number of key indexes `1` does not equal to the number of key columns `2`"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn test_hash_copy_and_compare() {
        let input = input();
        let input_types: Vec<_> = input.logical_types().cloned().collect();
        let ops = ColumnKeyOps::try_new(
            vec![1, 0],
            &input_types,
            &key_columns(),
            NullEquality::NullEqualsNull,
        )
        .unwrap();

        assert_eq!(ops.hash(&input, 0), ops.hash(&input, 1));
        assert_eq!(ops.hash(&input, 2), ops.hash(&input, 3));
        assert_ne!(ops.hash(&input, 0), ops.hash(&input, 2));

        let mut keys = DataBlock::with_capacity(
            vec![LogicalType::VarChar, LogicalType::BigInt],
            2,
        );
        ops.copy_key_into(&input, 0, &mut keys, 1).unwrap();
        ops.copy_key_into(&input, 2, &mut keys, 0).unwrap();
        assert!(ops.key_equals(&input, 1, &keys, 1));
        assert!(!ops.key_equals(&input, 1, &keys, 0));
        assert!(ops.key_equals(&input, 3, &keys, 0));

        let never = ColumnKeyOps::try_new(
            vec![1, 0],
            &input_types,
            &key_columns(),
            NullEquality::NullNeverMatches,
        )
        .unwrap();
        assert!(!never.key_equals(&input, 3, &keys, 0));
        assert!(never.key_equals(&input, 1, &keys, 1));
    }

    #[test]
    fn test_probe_side_layout() {
        let build = input();
        let build_types: Vec<_> = build.logical_types().cloned().collect();
        // Probe side carries an extra column, keys are at `[2, 0]`
        let probe = DataBlock::try_new(vec![
            ArrayImpl::Int64(Int64Array::from_iter([Some(1), None])),
            ArrayImpl::String(StringArray::from_iter([Some("ignored"), Some("x")])),
            ArrayImpl::String(StringArray::from_iter([Some("curry"), None])),
        ])
        .unwrap();
        let probe_types: Vec<_> = probe.logical_types().cloned().collect();

        let ops = ColumnKeyOps::try_new(
            vec![1, 0],
            &build_types,
            &key_columns(),
            NullEquality::NullNeverMatches,
        )
        .unwrap()
        .with_probe_side(vec![2, 0], &probe_types, &key_columns())
        .unwrap();
        assert_eq!(ops.probe_key_indexes(), &[2, 0]);
        assert_eq!(ops.hash_probe(&probe, 0), ops.hash(&build, 0));

        let mut keys = DataBlock::with_capacity(
            vec![LogicalType::VarChar, LogicalType::BigInt],
            2,
        );
        ops.copy_key_into(&build, 0, &mut keys, 0).unwrap();
        ops.copy_key_into(&build, 2, &mut keys, 1).unwrap();
        assert!(ops.key_equals_probe(&probe, 0, &keys, 0));
        assert!(!ops.key_equals_probe(&probe, 1, &keys, 1));

        let err = ColumnKeyOps::try_new(
            vec![1, 0],
            &build_types,
            &key_columns(),
            NullEquality::NullNeverMatches,
        )
        .unwrap()
        .with_probe_side(vec![0, 2], &probe_types, &key_columns())
        .unwrap_err();
        expect!["Key column `name` has type `VARCHAR`, however the input column `0` has type `BIGINT`"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn test_output_key_row() {
        let input = input();
        let input_types: Vec<_> = input.logical_types().cloned().collect();
        let ops = ColumnKeyOps::try_new(
            vec![1, 0],
            &input_types,
            &key_columns(),
            NullEquality::NullEqualsNull,
        )
        .unwrap();
        let mut keys = DataBlock::with_capacity(
            vec![LogicalType::VarChar, LogicalType::BigInt],
            1,
        );
        ops.copy_key_into(&input, 0, &mut keys, 0).unwrap();

        let mut output = DataBlock::with_capacity(
            vec![LogicalType::VarChar, LogicalType::BigInt],
            1,
        );
        assert!(ops.output_key_row(&keys, 0, &mut output, 0).unwrap());
        assert_eq!(output.len(), 1);
        assert_eq!(
            output.get_array(0).unwrap().get(0),
            Some(ScalarRef::String("curry"))
        );
        assert_eq!(
            output.get_array(1).unwrap().get(0),
            Some(ScalarRef::Int64(1))
        );
        assert!(!ops.output_key_row(&keys, 0, &mut output, 1).unwrap());

        let mut narrow = DataBlock::with_capacity(vec![LogicalType::VarChar], 1);
        let err = ops
            .output_key_row(&keys, 0, &mut narrow, 0)
            .unwrap_err();
        expect!["Output has `1` columns, it can not hold `2` key columns"]
            .assert_eq(&err.to_string());
    }
}
