//! Group the scores by player with the hash table, then rank the scores of each
//! player with the window engine. Run with `RUST_LOG=debug` to see the lifecycle
//! events of the structures

use data_block::array::{ArrayImpl, Int64Array, StringArray};
use data_block::block::DataBlock;
use data_block::types::LogicalType;
use tessera::exec::hash_table::ChainedHashTable;
use tessera::exec::hash_table::config::{HashTableConfig, KeyColumnSpec};
use tessera::exec::hash_table::key_ops::{ColumnKeyOps, NullEquality};
use tessera::exec::window::frame_ops::{ColumnFrameOps, WindowAggregate};
use tessera::exec::window::{WindowConfig, WindowFrameEngine, WindowFunction};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type Error = Box<dyn std::error::Error + Send + Sync>;

/// `(player, score)` sorted by player and score
fn scores() -> Vec<DataBlock> {
    let batches: [&[(&str, i64)]; 3] = [
        &[("curry", 30), ("curry", 30), ("curry", 42)],
        &[("curry", 51), ("james", 27)],
        &[("james", 27), ("james", 33), ("jokic", 29)],
    ];
    batches
        .into_iter()
        .map(|rows| {
            DataBlock::try_new(vec![
                ArrayImpl::String(StringArray::from_iter(
                    rows.iter().map(|(player, _)| Some(*player)),
                )),
                ArrayImpl::Int64(Int64Array::from_iter(rows.iter().map(|(_, score)| Some(*score)))),
            ])
            .expect("Arrays have same length")
        })
        .collect()
}

fn distinct_players(batches: &[DataBlock]) -> Result<(), Error> {
    let config = HashTableConfig::new(vec![KeyColumnSpec::new("player", LogicalType::VarChar)])
        .with_initial_capacity(4);
    let key_ops = ColumnKeyOps::try_new(
        vec![0],
        &[LogicalType::VarChar, LogicalType::BigInt],
        &config.key_columns,
        NullEquality::NullEqualsNull,
    )?;
    let mut table = ChainedHashTable::try_new(config, key_ops)?;
    for batch in batches {
        for row in 0..batch.len() {
            table.put(batch, row)?;
        }
    }

    // Output holds two players, `output_all` stops when it is full and resumes
    // from the player that does not fit
    loop {
        let mut output = DataBlock::with_capacity(vec![LogicalType::VarChar], 2);
        let finished = table.output_all(&mut output)?;
        tracing::info!("Distinct players:\n{}", output);
        if finished {
            break;
        }
    }
    tracing::info!("Output `{}` distinct players", table.output_count());
    Ok(())
}

fn rank_scores(batches: Vec<DataBlock>) -> Result<(), Error> {
    let input_types = vec![LogicalType::VarChar, LogicalType::BigInt];
    let frame_ops = ColumnFrameOps::try_new(
        vec![0],
        vec![1],
        vec![WindowAggregate::Sum { column: 1 }],
        &input_types,
    )?;
    let config = WindowConfig {
        input_types,
        aggregate_types: frame_ops.aggregate_types(),
        functions: vec![
            WindowFunction::RowNumber,
            WindowFunction::Rank,
            WindowFunction::DenseRank,
            WindowFunction::CumeDist,
        ],
    };
    let mut engine = WindowFrameEngine::new(config, frame_ops);

    let mut outputs = Vec::new();
    for batch in batches {
        engine.push_batch(batch)?;
        while engine.can_advance() {
            outputs.push(engine.process_head_batch()?);
        }
    }
    engine.finish_input();
    while engine.can_advance() {
        outputs.push(engine.process_head_batch()?);
    }

    for output in outputs {
        tracing::info!("\n{}", output);
    }
    tracing::info!("Window metrics: {:?}", engine.metrics);
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let batches = scores();
    distinct_players(&batches)?;
    rank_scores(batches)
}
