//! Incremental engine of the window functions
//!
//! The input is sorted by the partition keys and the order keys. Data blocks are
//! pushed into a pending queue, the engine processes the head of the queue once
//! it can see the end of the frames that start in the head: the head's last row
//! and the tail's last row differ. Only the data blocks between the head and
//! the end of the current frame are buffered.
//!
//! For each row, the output contains the input columns, the aggregation results
//! of the frame (default frame: from the start of the partition to the last peer
//! of the current row) and the configured ranking functions

pub mod frame_ops;
pub mod partition;

use std::collections::VecDeque;
use std::time::Duration;

use data_block::array::{ArrayError, ArrayImpl};
use data_block::block::{DataBlock, DataBlockError};
use data_block::scalar::ScalarRef;
use data_block::types::LogicalType;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use self::frame_ops::FrameOps;
use self::partition::Partition;
use crate::common::profiler::timed;
use crate::error::SendableError;

#[allow(missing_docs)]
/// Error returned by the [`WindowFrameEngine`]
#[derive(Debug, Snafu)]
pub enum WindowError {
    #[snafu(display(
        "Data block has layout `{found:?}`, however the window is created for `{expected:?}`"
    ))]
    SchemaChange {
        expected: Vec<LogicalType>,
        found: Vec<LogicalType>,
    },
    #[snafu(display("Can not push data block after the input is finished"))]
    InputFinished,
    #[snafu(display("Window does not have pending data block to process"))]
    NoPendingBatch,
    #[snafu(display("Failed to reset the aggregation state at the start of the partition"))]
    ResetAggregation,
    #[snafu(display("Failed to aggregate row `{row}` of the frame"))]
    Aggregate { row: usize, source: SendableError },
    #[snafu(display("Failed to write the aggregation result of row `{row}`"))]
    WriteAggregate { row: usize, source: SendableError },
    #[snafu(display("Failed to write `{function}` of row `{row}`"))]
    WriteRanking {
        function: WindowFunction,
        row: usize,
        source: ArrayError,
    },
    #[snafu(display("Failed to assemble the output data block"))]
    AssembleOutput { source: DataBlockError },
}

type Result<T> = std::result::Result<T, WindowError>;

/// Ranking functions computed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFunction {
    /// `ROW_NUMBER()`
    RowNumber,
    /// `RANK()`
    Rank,
    /// `DENSE_RANK()`
    DenseRank,
    /// `PERCENT_RANK()`
    PercentRank,
    /// `CUME_DIST()`
    CumeDist,
}

impl WindowFunction {
    /// Logical type of the function output
    pub fn output_type(&self) -> LogicalType {
        match self {
            Self::RowNumber | Self::Rank | Self::DenseRank => LogicalType::BigInt,
            Self::PercentRank | Self::CumeDist => LogicalType::Double,
        }
    }

    /// Returns true if the function needs the length of the whole partition
    pub fn requires_full_partition(&self) -> bool {
        matches!(self, Self::PercentRank | Self::CumeDist)
    }

    fn value(&self, partition: &Partition) -> ScalarRef<'static> {
        match self {
            Self::RowNumber => ScalarRef::Int64(partition.row_number() as i64),
            Self::Rank => ScalarRef::Int64(partition.rank() as i64),
            Self::DenseRank => ScalarRef::Int64(partition.dense_rank() as i64),
            Self::PercentRank => ScalarRef::Float64(partition.percent_rank()),
            Self::CumeDist => ScalarRef::Float64(partition.cume_dist()),
        }
    }
}

impl std::fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RowNumber => "ROW_NUMBER",
            Self::Rank => "RANK",
            Self::DenseRank => "DENSE_RANK",
            Self::PercentRank => "PERCENT_RANK",
            Self::CumeDist => "CUME_DIST",
        };
        f.write_str(name)
    }
}

/// Configuration of the [`WindowFrameEngine`]
#[derive(Debug, Clone, Default)]
pub struct WindowConfig {
    /// Logical types of the input columns
    pub input_types: Vec<LogicalType>,
    /// Logical types of the columns written by [`FrameOps::write_aggregate_output`]
    pub aggregate_types: Vec<LogicalType>,
    /// Ranking functions appended after the aggregation columns
    pub functions: Vec<WindowFunction>,
}

impl WindowConfig {
    /// Logical types of the output data block
    pub fn output_types(&self) -> Vec<LogicalType> {
        self.input_types
            .iter()
            .chain(&self.aggregate_types)
            .cloned()
            .chain(self.functions.iter().map(WindowFunction::output_type))
            .collect()
    }
}

/// State of the [`WindowFrameEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No partition is open
    Idle,
    /// A partition is open, the next row starts a new frame
    PartitionOpen,
    /// A partition is open and the current frame has rows not processed yet
    FrameReady,
    /// Input is finished, remaining data blocks can be processed
    Draining,
}

/// Metrics of the window engine
#[derive(Debug, Default)]
pub struct WindowMetrics {
    /// Number of data blocks processed
    pub num_batches: u64,
    /// Number of rows processed
    pub num_rows: u64,
    /// Number of partitions opened
    pub num_partitions: u64,
    /// Number of frames opened
    pub num_frames: u64,
    /// Time spent in processing the data blocks
    pub process_time: Duration,
}

/// Engine that computes the window functions over the data blocks sorted by
/// the partition keys and the order keys.
///
/// The caller pushes the data blocks with [`Self::push_batch`] and calls
/// [`Self::process_head_batch`] whenever [`Self::can_advance`] returns true.
/// After an error is returned, the engine should be dropped
///
/// # Generics
///
/// - `F`: operations on the frame
#[derive(Debug)]
pub struct WindowFrameEngine<F: FrameOps> {
    config: WindowConfig,
    frame_ops: F,
    batches: VecDeque<DataBlock>,
    /// Partition that is being processed
    partition: Option<Partition>,
    input_finished: bool,
    requires_full_partition: bool,
    output_count: usize,

    /// Metrics
    pub metrics: WindowMetrics,
}

impl<F: FrameOps> WindowFrameEngine<F> {
    /// Create a new engine
    pub fn new(config: WindowConfig, frame_ops: F) -> Self {
        let requires_full_partition = config
            .functions
            .iter()
            .any(WindowFunction::requires_full_partition);
        Self {
            config,
            frame_ops,
            batches: VecDeque::new(),
            partition: None,
            input_finished: false,
            requires_full_partition,
            output_count: 0,
            metrics: WindowMetrics::default(),
        }
    }

    /// Config of the engine
    #[inline]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Number of rows in the data block returned by the last
    /// [`Self::process_head_batch`]
    #[inline]
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Number of data blocks that are not processed
    #[inline]
    pub fn num_pending_batches(&self) -> usize {
        self.batches.len()
    }

    /// State of the engine
    pub fn state(&self) -> EngineState {
        if self.input_finished {
            return EngineState::Draining;
        }
        match &self.partition {
            None => EngineState::Idle,
            Some(partition) if partition.is_frame_done() => EngineState::PartitionOpen,
            Some(_) => EngineState::FrameReady,
        }
    }

    /// Push the data block into the pending queue. Empty data block is ignored
    pub fn push_batch(&mut self, batch: DataBlock) -> Result<()> {
        ensure!(!self.input_finished, InputFinishedSnafu);
        ensure!(
            batch.num_arrays() == self.config.input_types.len()
                && batch.logical_types().eq(self.config.input_types.iter()),
            SchemaChangeSnafu {
                expected: self.config.input_types.clone(),
                found: batch.logical_types().cloned().collect::<Vec<_>>(),
            }
        );

        if !batch.is_empty() {
            self.batches.push_back(batch);
        }
        Ok(())
    }

    /// Input is exhausted, all of the pending data blocks can be processed
    pub fn finish_input(&mut self) {
        self.input_finished = true;
        tracing::debug!(
            "Window input is finished with `{}` pending data blocks",
            self.batches.len()
        );
    }

    /// Returns true if the head data block can be processed: the ends of all of
    /// the frames start in the head data block are buffered
    pub fn can_advance(&self) -> bool {
        let (Some(head), Some(tail)) = (self.batches.front(), self.batches.back()) else {
            return false;
        };
        if self.input_finished {
            return true;
        }
        if self.batches.len() < 2 {
            return false;
        }

        let (head_last, tail_last) = (head.len() - 1, tail.len() - 1);
        let is_same_partition = self
            .frame_ops
            .is_same_partition(head, head_last, tail, tail_last);
        if self.requires_full_partition {
            !is_same_partition
        } else {
            !is_same_partition || !self.frame_ops.is_peer(head, head_last, tail, tail_last)
        }
    }

    /// Process the head data block and release it. The caller should only call
    /// it when [`Self::can_advance`] returns true, otherwise the frames may be
    /// cut at the end of the buffered data blocks
    pub fn process_head_batch(&mut self) -> Result<DataBlock> {
        let mut process_time = Duration::ZERO;
        let output = timed(&mut process_time, || self.process_head_batch_inner());
        self.metrics.process_time += process_time;
        output
    }

    fn process_head_batch_inner(&mut self) -> Result<DataBlock> {
        ensure!(!self.batches.is_empty(), NoPendingBatchSnafu);
        self.extend_open_partition();

        let head = &self.batches[0];
        let num_rows = head.len();
        let capacity = head.capacity();
        let mut aggregates = DataBlock::with_capacity(self.config.aggregate_types.clone(), capacity);
        let mut rankings = self
            .config
            .functions
            .iter()
            .map(|function| ArrayImpl::new_nulls(function.output_type(), capacity))
            .collect::<Vec<_>>();

        let mut partition = self.partition.take();
        for row in 0..num_rows {
            let mut current = match partition.take() {
                Some(current) => current,
                None => self.open_partition(row)?,
            };

            if current.is_frame_done() {
                let head = &self.batches[0];
                let peers = rows_from(&self.batches, row)
                    .take(current.remaining() as usize)
                    .take_while(|&(batch, batch_row)| {
                        self.frame_ops.is_peer(head, row, batch, batch_row)
                    })
                    .count();
                current.new_frame(peers as u64);
                self.metrics.num_frames += 1;
                for (batch, batch_row) in rows_from(&self.batches, row).take(peers) {
                    self.frame_ops
                        .aggregate_row(batch, batch_row)
                        .context(AggregateSnafu { row })?;
                }
            }

            self.frame_ops
                .write_aggregate_output(&mut aggregates, row)
                .context(WriteAggregateSnafu { row })?;
            for (function, array) in self.config.functions.iter().zip(rankings.iter_mut()) {
                array
                    .set(row, Some(function.value(&current)))
                    .context(WriteRankingSnafu {
                        function: *function,
                        row,
                    })?;
            }

            current.row_aggregated();
            if !current.is_done() {
                partition = Some(current);
            }
        }
        self.partition = partition;

        let head = self.batches.pop_front().context(NoPendingBatchSnafu)?;
        let mut arrays = head.into_arrays();
        arrays.extend(aggregates.into_arrays());
        arrays.extend(rankings);
        let mut output = DataBlock::try_new(arrays).context(AssembleOutputSnafu)?;
        output.set_len(num_rows).context(AssembleOutputSnafu)?;

        self.output_count = num_rows;
        self.metrics.num_batches += 1;
        self.metrics.num_rows += num_rows as u64;
        tracing::trace!(
            "Window processes data block with `{}` rows, pending data blocks: `{}`, state: `{:?}`",
            num_rows,
            self.batches.len(),
            self.state()
        );

        Ok(output)
    }

    /// Open the partition that starts at `row` of the head data block. All of the
    /// buffered rows that belong to it are counted
    fn open_partition(&mut self, row: usize) -> Result<Partition> {
        let head = &self.batches[0];
        let num_buffered = num_rows_from(&self.batches, row);
        let length = rows_from(&self.batches, row)
            .take_while(|&(batch, batch_row)| {
                self.frame_ops.is_same_partition(head, row, batch, batch_row)
            })
            .count();
        let is_length_final = length < num_buffered || self.input_finished;

        ensure!(self.frame_ops.reset_aggregation_state(), ResetAggregationSnafu);
        self.metrics.num_partitions += 1;
        tracing::trace!(
            "Window opens partition with `{}` rows, length is final: `{}`",
            length,
            is_length_final
        );

        Ok(Partition::new(length as u64, is_length_final))
    }

    /// The open partition may continue in the data blocks pushed after it is
    /// counted, count the new rows
    fn extend_open_partition(&mut self) {
        let Some(partition) = self.partition.as_mut() else {
            return;
        };
        if partition.is_length_final() {
            return;
        }

        // Unprocessed rows of the open partition start at the first row of the head
        let counted = partition.remaining() as usize;
        let head = &self.batches[0];
        let num_buffered = num_rows_from(&self.batches, 0);
        let additional = rows_from(&self.batches, 0)
            .skip(counted)
            .take_while(|&(batch, batch_row)| {
                self.frame_ops.is_same_partition(head, 0, batch, batch_row)
            })
            .count();
        let is_length_final = counted + additional < num_buffered || self.input_finished;
        partition.extend(additional as u64, is_length_final);
    }
}

/// Iterate the buffered rows, starting from `row` of the head data block
fn rows_from(
    batches: &VecDeque<DataBlock>,
    row: usize,
) -> impl Iterator<Item = (&DataBlock, usize)> {
    batches
        .iter()
        .enumerate()
        .flat_map(move |(index, batch)| {
            let start = if index == 0 { row } else { 0 };
            (start..batch.len()).map(move |batch_row| (batch, batch_row))
        })
}

/// Number of the buffered rows, starting from `row` of the head data block
fn num_rows_from(batches: &VecDeque<DataBlock>, row: usize) -> usize {
    batches.iter().map(DataBlock::len).sum::<usize>() - row
}

#[cfg(test)]
mod tests {
    use super::frame_ops::{ColumnFrameOps, WindowAggregate};
    use super::*;
    use data_block::array::{Int32Array, Int64Array};
    use expect_test::expect;
    use snafu::Report;

    const INPUT_TYPES: [LogicalType; 3] =
        [LogicalType::Integer, LogicalType::Integer, LogicalType::BigInt];

    /// Block with columns `(partition, order, value)`
    fn block(rows: &[(i32, i32, i64)]) -> DataBlock {
        DataBlock::try_new(vec![
            ArrayImpl::Int32(Int32Array::from_iter(rows.iter().map(|r| Some(r.0)))),
            ArrayImpl::Int32(Int32Array::from_iter(rows.iter().map(|r| Some(r.1)))),
            ArrayImpl::Int64(Int64Array::from_iter(rows.iter().map(|r| Some(r.2)))),
        ])
        .unwrap()
    }

    fn engine(
        aggregates: Vec<WindowAggregate>,
        functions: Vec<WindowFunction>,
    ) -> WindowFrameEngine<ColumnFrameOps> {
        let frame_ops = ColumnFrameOps::try_new(vec![0], vec![1], aggregates, &INPUT_TYPES)
            .expect("Columns are in range");
        let config = WindowConfig {
            input_types: INPUT_TYPES.to_vec(),
            aggregate_types: frame_ops.aggregate_types(),
            functions,
        };
        WindowFrameEngine::new(config, frame_ops)
    }

    /// Collect the `column` of the output data blocks
    fn column(outputs: &[DataBlock], column: usize) -> Vec<String> {
        outputs
            .iter()
            .flat_map(|output| {
                let array = output.get_array(column).unwrap();
                (0..output.len()).map(|row| {
                    array
                        .get(row)
                        .map_or_else(|| "Null".to_string(), |value| value.to_string())
                })
            })
            .collect()
    }

    /// Push the blocks one by one, process the head whenever the engine can advance
    fn run(
        engine: &mut WindowFrameEngine<ColumnFrameOps>,
        blocks: Vec<DataBlock>,
    ) -> Result<Vec<DataBlock>> {
        let mut outputs = Vec::new();
        for block in blocks {
            engine.push_batch(block)?;
            while engine.can_advance() {
                outputs.push(engine.process_head_batch()?);
            }
        }
        engine.finish_input();
        while engine.can_advance() {
            outputs.push(engine.process_head_batch()?);
        }
        Ok(outputs)
    }

    #[test]
    fn test_ranking_of_peer_groups() -> Report<WindowError> {
        Report::capture(|| {
            let mut engine = engine(
                vec![],
                vec![
                    WindowFunction::RowNumber,
                    WindowFunction::Rank,
                    WindowFunction::DenseRank,
                ],
            );
            let outputs = run(
                &mut engine,
                vec![block(&[
                    (1, 10, 0),
                    (1, 10, 0),
                    (1, 20, 0),
                    (1, 20, 0),
                    (1, 20, 0),
                    (1, 30, 0),
                ])],
            )?;

            assert_eq!(column(&outputs, 3), ["1", "2", "3", "4", "5", "6"]);
            assert_eq!(column(&outputs, 4), ["1", "1", "3", "3", "3", "6"]);
            assert_eq!(column(&outputs, 5), ["1", "1", "2", "2", "2", "3"]);
            assert_eq!(engine.output_count(), 6);
            assert_eq!(engine.state(), EngineState::Draining);
            assert_eq!(engine.metrics.num_frames, 3);

            Ok(())
        })
    }

    #[test]
    fn test_single_peer_group() -> Report<WindowError> {
        Report::capture(|| {
            let mut engine = engine(vec![], vec![WindowFunction::Rank, WindowFunction::DenseRank]);
            let outputs = run(&mut engine, vec![block(&[(1, 7, 0); 4])])?;
            assert_eq!(column(&outputs, 3), ["1", "1", "1", "1"]);
            assert_eq!(column(&outputs, 4), ["1", "1", "1", "1"]);
            Ok(())
        })
    }

    #[test]
    fn test_partitions_span_batches() -> Report<WindowError> {
        Report::capture(|| {
            let mut engine = engine(
                vec![WindowAggregate::Sum { column: 2 }],
                vec![WindowFunction::RowNumber, WindowFunction::Rank],
            );
            let outputs = run(
                &mut engine,
                vec![
                    block(&[(1, 1, 1), (1, 2, 2)]),
                    block(&[(1, 2, 3), (1, 3, 4)]),
                    block(&[(1, 3, 5)]),
                    block(&[(1, 3, 6), (2, 1, 7)]),
                    block(&[(2, 1, 8), (2, 2, 9), (3, 1, 10)]),
                ],
            )?;

            assert_eq!(outputs.len(), 5);
            assert_eq!(
                column(&outputs, 3),
                ["1", "6", "6", "21", "21", "21", "15", "15", "24", "10"]
            );
            assert_eq!(
                column(&outputs, 4),
                ["1", "2", "3", "4", "5", "6", "1", "2", "3", "1"]
            );
            assert_eq!(
                column(&outputs, 5),
                ["1", "2", "2", "4", "4", "4", "1", "1", "3", "1"]
            );
            assert_eq!(engine.metrics.num_partitions, 3);
            assert_eq!(engine.metrics.num_rows, 10);
            assert_eq!(engine.num_pending_batches(), 0);

            Ok(())
        })
    }

    #[test]
    fn test_percent_rank_and_cume_dist_wait_for_partition_end() -> Report<WindowError> {
        Report::capture(|| {
            let mut engine = engine(
                vec![],
                vec![WindowFunction::PercentRank, WindowFunction::CumeDist],
            );
            engine.push_batch(block(&[(1, 1, 0), (1, 2, 0)]))?;
            engine.push_batch(block(&[(1, 2, 0), (1, 3, 0)]))?;
            // Last rows are not peers, however the partition continues
            assert!(!engine.can_advance());
            engine.push_batch(block(&[(1, 4, 0), (2, 1, 0)]))?;
            assert!(engine.can_advance());

            let mut outputs = Vec::new();
            while engine.can_advance() {
                outputs.push(engine.process_head_batch()?);
            }
            assert_eq!(outputs.len(), 2);
            engine.finish_input();
            while engine.can_advance() {
                outputs.push(engine.process_head_batch()?);
            }

            assert_eq!(
                column(&outputs, 3),
                ["0.0", "0.25", "0.25", "0.75", "1.0", "0.0"]
            );
            assert_eq!(
                column(&outputs, 4),
                ["0.2", "0.6", "0.6", "0.8", "1.0", "1.0"]
            );

            Ok(())
        })
    }

    #[test]
    fn test_can_advance() -> Report<WindowError> {
        Report::capture(|| {
            let mut engine = engine(vec![], vec![WindowFunction::RowNumber]);
            assert!(!engine.can_advance());
            assert_eq!(engine.state(), EngineState::Idle);

            engine.push_batch(block(&[(1, 1, 0), (1, 2, 0)]))?;
            assert!(!engine.can_advance());

            // Empty block is ignored
            engine.push_batch(block(&[]))?;
            assert_eq!(engine.num_pending_batches(), 1);

            engine.push_batch(block(&[(1, 2, 0)]))?;
            assert!(!engine.can_advance());

            engine.push_batch(block(&[(1, 3, 0)]))?;
            assert!(engine.can_advance());
            engine.process_head_batch()?;
            assert_eq!(engine.state(), EngineState::FrameReady);
            assert_eq!(engine.output_count(), 2);

            // Frame `(1, 2)` ends in the second block
            assert!(engine.can_advance());
            engine.process_head_batch()?;
            assert_eq!(engine.state(), EngineState::PartitionOpen);
            assert!(!engine.can_advance());

            engine.finish_input();
            assert!(engine.can_advance());
            let output = engine.process_head_batch()?;
            assert_eq!(column(&[output], 3), ["4"]);
            assert!(!engine.can_advance());

            let err = engine.process_head_batch().unwrap_err();
            expect!["Window does not have pending data block to process"]
                .assert_eq(&err.to_string());

            Ok(())
        })
    }

    #[test]
    fn test_schema_change() {
        let mut engine = engine(vec![], vec![WindowFunction::RowNumber]);
        let block = DataBlock::try_new(vec![ArrayImpl::Int32(Int32Array::from_iter([Some(1)]))])
            .unwrap();
        let err = engine.push_batch(block).unwrap_err();
        expect!["Data block has layout `[Integer]`, however the window is created for `[Integer, Integer, BigInt]`"]
            .assert_eq(&err.to_string());

        engine.finish_input();
        let err = engine.push_batch(DataBlock::with_logical_types(INPUT_TYPES.to_vec())).unwrap_err();
        expect!["Can not push data block after the input is finished"].assert_eq(&err.to_string());
    }

    #[test]
    fn test_output_layout() -> Report<WindowError> {
        Report::capture(|| {
            let mut engine = engine(
                vec![WindowAggregate::CountStar, WindowAggregate::Avg { column: 2 }],
                vec![WindowFunction::DenseRank, WindowFunction::CumeDist],
            );
            assert_eq!(
                engine.config().output_types(),
                vec![
                    LogicalType::Integer,
                    LogicalType::Integer,
                    LogicalType::BigInt,
                    LogicalType::BigInt,
                    LogicalType::Double,
                    LogicalType::BigInt,
                    LogicalType::Double,
                ]
            );

            let outputs = run(&mut engine, vec![block(&[(1, 1, 2), (1, 1, 4), (1, 2, 9)])])?;
            let types = outputs[0].logical_types().cloned().collect::<Vec<_>>();
            assert_eq!(types, engine.config().output_types());
            expect![[r#"
                ┌─────────┬─────────┬────────┬────────┬────────┬────────┬────────────────────┐
                │ Integer │ Integer │ BigInt │ BigInt │ Double │ BigInt │ Double             │
                ├─────────┼─────────┼────────┼────────┼────────┼────────┼────────────────────┤
                │ 1       │ 1       │ 2      │ 2      │ 3.0    │ 1      │ 0.6666666666666666 │
                ├─────────┼─────────┼────────┼────────┼────────┼────────┼────────────────────┤
                │ 1       │ 1       │ 4      │ 2      │ 3.0    │ 1      │ 0.6666666666666666 │
                ├─────────┼─────────┼────────┼────────┼────────┼────────┼────────────────────┤
                │ 1       │ 2       │ 9      │ 3      │ 5.0    │ 2      │ 1.0                │
                └─────────┴─────────┴────────┴────────┴────────┴────────┴────────────────────┘"#]]
            .assert_eq(&outputs[0].to_string());

            Ok(())
        })
    }
}
