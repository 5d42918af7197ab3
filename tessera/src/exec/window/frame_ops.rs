//! Frame operations plugged into the [`WindowFrameEngine`]
//!
//! [`WindowFrameEngine`]: super::WindowFrameEngine

use std::fmt::Debug;

use data_block::array::{ArrayError, ArrayImpl};
use data_block::block::DataBlock;
use data_block::scalar::ScalarRef;
use data_block::types::LogicalType;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::error::SendableError;

/// Operations used by the engine to find the partitions/frames and aggregate
/// the rows in the frame
pub trait FrameOps: Debug {
    /// Returns true if the two rows belong to the same partition
    fn is_same_partition(
        &self,
        lhs: &DataBlock,
        lhs_row: usize,
        rhs: &DataBlock,
        rhs_row: usize,
    ) -> bool;

    /// Returns true if the two rows are peers: they belong to the same partition
    /// and are equal under the ordering keys
    fn is_peer(&self, lhs: &DataBlock, lhs_row: usize, rhs: &DataBlock, rhs_row: usize) -> bool;

    /// Add the row into the aggregation state
    fn aggregate_row(&mut self, input: &DataBlock, row: usize) -> Result<(), SendableError>;

    /// Write the aggregation state into the `row` of the `output`
    fn write_aggregate_output(
        &mut self,
        output: &mut DataBlock,
        row: usize,
    ) -> Result<(), SendableError>;

    /// Reset the aggregation state at the start of a partition. Returns false if
    /// the state can not be reset
    fn reset_aggregation_state(&mut self) -> bool;
}

/// Aggregation computed over the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAggregate {
    /// `COUNT(*)`
    CountStar,
    /// `COUNT(column)`, counts the non-null values
    Count {
        /// Index of the column in the input
        column: usize,
    },
    /// `SUM(column)` of integer column
    Sum {
        /// Index of the column in the input
        column: usize,
    },
    /// `MIN(column)` of integer column
    Min {
        /// Index of the column in the input
        column: usize,
    },
    /// `MAX(column)` of integer column
    Max {
        /// Index of the column in the input
        column: usize,
    },
    /// `AVG(column)` of integer column
    Avg {
        /// Index of the column in the input
        column: usize,
    },
}

impl WindowAggregate {
    /// Logical type of the aggregation result
    pub fn output_type(&self) -> LogicalType {
        match self {
            Self::Avg { .. } => LogicalType::Double,
            _ => LogicalType::BigInt,
        }
    }

    fn column(&self) -> Option<usize> {
        match *self {
            Self::CountStar => None,
            Self::Count { column }
            | Self::Sum { column }
            | Self::Min { column }
            | Self::Max { column }
            | Self::Avg { column } => Some(column),
        }
    }

    fn requires_integer(&self) -> bool {
        !matches!(self, Self::CountStar | Self::Count { .. })
    }
}

#[allow(missing_docs)]
/// Error returned by the [`ColumnFrameOps`]
#[derive(Debug, Snafu)]
pub enum FrameOpsError {
    #[snafu(display("Column `{column}` is out of range, the input only has `{num_columns}` columns"))]
    ColumnOutOfRange { column: usize, num_columns: usize },
    #[snafu(display("`{aggregate:?}` only accepts integer column, column `{column}` has type `{logical_type}`"))]
    NonIntegerColumn {
        aggregate: WindowAggregate,
        column: usize,
        logical_type: LogicalType,
    },
    #[snafu(display("Sum of column `{column}` overflows `i64`"))]
    SumOverflow { column: usize },
    #[snafu(display("Output has `{found}` columns, it can not hold `{required}` aggregations"))]
    OutputColumnsMissing { required: usize, found: usize },
    #[snafu(display("Failed to write the aggregation result into output"))]
    WriteOutput { source: ArrayError },
}

/// Running state of a [`WindowAggregate`]
#[derive(Debug, Clone, Copy, PartialEq)]
enum AggregateState {
    CountStar(i64),
    Count { column: usize, count: i64 },
    Sum { column: usize, sum: Option<i64> },
    Min { column: usize, min: Option<i64> },
    Max { column: usize, max: Option<i64> },
    Avg { column: usize, sum: i64, count: i64 },
}

impl AggregateState {
    fn new(aggregate: &WindowAggregate) -> Self {
        match *aggregate {
            WindowAggregate::CountStar => Self::CountStar(0),
            WindowAggregate::Count { column } => Self::Count { column, count: 0 },
            WindowAggregate::Sum { column } => Self::Sum { column, sum: None },
            WindowAggregate::Min { column } => Self::Min { column, min: None },
            WindowAggregate::Max { column } => Self::Max { column, max: None },
            WindowAggregate::Avg { column } => Self::Avg {
                column,
                sum: 0,
                count: 0,
            },
        }
    }

    fn update(&mut self, arrays: &[ArrayImpl], row: usize) -> Result<(), FrameOpsError> {
        let integer_at = |column: usize| arrays[column].get(row).and_then(|value| value.as_i64());
        match self {
            Self::CountStar(count) => *count += 1,
            Self::Count { column, count } => {
                if arrays[*column].get(row).is_some() {
                    *count += 1;
                }
            }
            Self::Sum { column, sum } => {
                if let Some(value) = integer_at(*column) {
                    let updated = match *sum {
                        Some(sum) => sum
                            .checked_add(value)
                            .context(SumOverflowSnafu { column: *column })?,
                        None => value,
                    };
                    *sum = Some(updated);
                }
            }
            Self::Min { column, min } => {
                if let Some(value) = integer_at(*column) {
                    *min = Some(min.map_or(value, |min| min.min(value)));
                }
            }
            Self::Max { column, max } => {
                if let Some(value) = integer_at(*column) {
                    *max = Some(max.map_or(value, |max| max.max(value)));
                }
            }
            Self::Avg { column, sum, count } => {
                if let Some(value) = integer_at(*column) {
                    *sum = sum
                        .checked_add(value)
                        .context(SumOverflowSnafu { column: *column })?;
                    *count += 1;
                }
            }
        }
        Ok(())
    }

    fn value(&self) -> Option<ScalarRef<'static>> {
        match *self {
            Self::CountStar(count) | Self::Count { count, .. } => Some(ScalarRef::Int64(count)),
            Self::Sum { sum: value, .. }
            | Self::Min { min: value, .. }
            | Self::Max { max: value, .. } => value.map(ScalarRef::Int64),
            Self::Avg { sum, count, .. } => {
                (count > 0).then(|| ScalarRef::Float64(sum as f64 / count as f64))
            }
        }
    }
}

/// [`FrameOps`] that compares the rows with the partition/order key columns and
/// computes the [`WindowAggregate`]s with the default frame: from the start of
/// the partition to the last peer of the current row.
///
/// `NULL`s are equal to each other in the comparison. Without order keys, all
/// of the rows in the partition are peers
#[derive(Debug)]
pub struct ColumnFrameOps {
    partition_keys: Vec<usize>,
    order_keys: Vec<usize>,
    aggregates: Vec<WindowAggregate>,
    states: Vec<AggregateState>,
}

impl ColumnFrameOps {
    /// Create a new [`ColumnFrameOps`]
    pub fn try_new(
        partition_keys: Vec<usize>,
        order_keys: Vec<usize>,
        aggregates: Vec<WindowAggregate>,
        input_types: &[LogicalType],
    ) -> Result<Self, FrameOpsError> {
        let num_columns = input_types.len();
        partition_keys
            .iter()
            .chain(&order_keys)
            .try_for_each(|&column| -> Result<(), FrameOpsError> {
                ensure!(
                    column < num_columns,
                    ColumnOutOfRangeSnafu {
                        column,
                        num_columns
                    }
                );
                Ok(())
            })?;

        aggregates
            .iter()
            .try_for_each(|aggregate| -> Result<(), FrameOpsError> {
                let Some(column) = aggregate.column() else {
                    return Ok(());
                };
                let logical_type = input_types.get(column).context(ColumnOutOfRangeSnafu {
                    column,
                    num_columns,
                })?;
                ensure!(
                    !aggregate.requires_integer()
                        || matches!(logical_type, LogicalType::Integer | LogicalType::BigInt),
                    NonIntegerColumnSnafu {
                        aggregate: *aggregate,
                        column,
                        logical_type: logical_type.clone(),
                    }
                );
                Ok(())
            })?;

        let states = aggregates.iter().map(AggregateState::new).collect();
        Ok(Self {
            partition_keys,
            order_keys,
            aggregates,
            states,
        })
    }

    /// Logical types of the aggregation results, in the order of the aggregates
    pub fn aggregate_types(&self) -> Vec<LogicalType> {
        self.aggregates
            .iter()
            .map(WindowAggregate::output_type)
            .collect()
    }

    fn update(&mut self, input: &DataBlock, row: usize) -> Result<(), FrameOpsError> {
        let arrays = input.arrays();
        self.states
            .iter_mut()
            .try_for_each(|state| state.update(arrays, row))
    }

    fn write(&self, output: &mut DataBlock, row: usize) -> Result<(), FrameOpsError> {
        ensure!(
            output.num_arrays() >= self.states.len(),
            OutputColumnsMissingSnafu {
                required: self.states.len(),
                found: output.num_arrays(),
            }
        );
        output
            .mutable_arrays()
            .iter_mut()
            .zip(&self.states)
            .try_for_each(|(array, state)| array.set(row, state.value()))
            .context(WriteOutputSnafu)
    }

    fn keys_equal(
        keys: &[usize],
        lhs: &DataBlock,
        lhs_row: usize,
        rhs: &DataBlock,
        rhs_row: usize,
    ) -> bool {
        let (lhs, rhs) = (lhs.arrays(), rhs.arrays());
        keys.iter()
            .all(|&column| lhs[column].get(lhs_row) == rhs[column].get(rhs_row))
    }
}

impl FrameOps for ColumnFrameOps {
    fn is_same_partition(
        &self,
        lhs: &DataBlock,
        lhs_row: usize,
        rhs: &DataBlock,
        rhs_row: usize,
    ) -> bool {
        Self::keys_equal(&self.partition_keys, lhs, lhs_row, rhs, rhs_row)
    }

    fn is_peer(&self, lhs: &DataBlock, lhs_row: usize, rhs: &DataBlock, rhs_row: usize) -> bool {
        self.is_same_partition(lhs, lhs_row, rhs, rhs_row)
            && Self::keys_equal(&self.order_keys, lhs, lhs_row, rhs, rhs_row)
    }

    fn aggregate_row(&mut self, input: &DataBlock, row: usize) -> Result<(), SendableError> {
        self.update(input, row).boxed()
    }

    fn write_aggregate_output(
        &mut self,
        output: &mut DataBlock,
        row: usize,
    ) -> Result<(), SendableError> {
        self.write(output, row).boxed()
    }

    fn reset_aggregation_state(&mut self) -> bool {
        self.states
            .iter_mut()
            .zip(&self.aggregates)
            .for_each(|(state, aggregate)| *state = AggregateState::new(aggregate));
        true
    }
}
