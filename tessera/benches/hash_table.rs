use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use data_block::array::{ArrayImpl, Int64Array};
use data_block::block::DataBlock;
use data_block::types::LogicalType;
use rand::{Rng, SeedableRng};
use tessera::exec::hash_table::ChainedHashTable;
use tessera::exec::hash_table::config::{HashTableConfig, KeyColumnSpec};
use tessera::exec::hash_table::key_ops::{ColumnKeyOps, NullEquality};

const NUM_ROWS: usize = 1 << 16;

fn new_table(initial_capacity: usize) -> ChainedHashTable<ColumnKeyOps> {
    let config = HashTableConfig::new(vec![KeyColumnSpec::new("key", LogicalType::BigInt)])
        .with_initial_capacity(initial_capacity);
    let key_ops = ColumnKeyOps::try_new(
        vec![0],
        &[LogicalType::BigInt],
        &config.key_columns,
        NullEquality::NullEqualsNull,
    )
    .unwrap();
    ChainedHashTable::try_new(config, key_ops).unwrap()
}

fn bench_put(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("put");
    for cardinality in [1 << 8, 1 << 12, 1 << 16] {
        let input = DataBlock::try_new(vec![ArrayImpl::Int64(Int64Array::from_iter(
            (0..NUM_ROWS).map(|_| Some(rng.gen_range(0..cardinality as i64))),
        ))])
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("bigint", cardinality),
            &input,
            |b, input| {
                b.iter(|| {
                    // Start small, such that resize is part of the measurement
                    let mut table = new_table(1024);
                    (0..input.len()).for_each(|row| {
                        black_box(table.put(input, row).unwrap());
                    });
                    table
                })
            },
        );
    }
    group.finish();
}

fn bench_probe(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(9);
    let input = DataBlock::try_new(vec![ArrayImpl::Int64(Int64Array::from_iter(
        (0..NUM_ROWS).map(|_| Some(rng.gen_range(0..(NUM_ROWS as i64) * 2))),
    ))])
    .unwrap();
    let mut table = new_table(NUM_ROWS);
    (0..NUM_ROWS / 2).for_each(|row| {
        table.put(&input, row).unwrap();
    });

    c.bench_function("contains_key", |b| {
        b.iter(|| {
            (0..input.len())
                .filter(|&row| black_box(table.contains_key(&input, row)).is_some())
                .count()
        })
    });
}

criterion_group!(benches, bench_put, bench_probe);
criterion_main!(benches);
