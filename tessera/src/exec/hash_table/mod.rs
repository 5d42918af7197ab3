//! Chained hash table whose keys are stored in fixed capacity segments
//!
//! Each key gets a [`GlobalIndex`] when it is inserted, the index is stable for
//! the lifetime of the table: resize only rebuilds the bucket heads and the links
//! of the chains, the keys never move. Callers can use the index to address the
//! states they associate with the key, for example the aggregation states of
//! the group or the build side rows of the join.
//!
//! The table does not interpret the keys, all of the key related operations are
//! delegated to the [`KeyOps`]

pub mod config;
pub mod index;
pub mod key_ops;
pub mod segment;

use std::time::Duration;

use data_block::block::DataBlock;
use data_block::types::LogicalType;
use snafu::{ResultExt, Snafu, ensure};

use self::config::{ConfigError, HashTableConfig, compute_threshold};
use self::index::{EMPTY, IndexLayout, MAX_GLOBAL_INDEX};
use self::key_ops::KeyOps;
use self::segment::Segment;
use crate::common::profiler::ScopedTimerGuard;
use crate::common::types::{GlobalIndex, HashValue};
use crate::error::SendableError;

#[allow(missing_docs)]
/// Error returned by the [`ChainedHashTable`]
#[derive(Debug, Snafu)]
pub enum HashTableError {
    #[snafu(display("Invalid configuration of the hash table"))]
    InvalidConfiguration { source: ConfigError },
    #[snafu(display("Failed to copy the key into slot `{index}`"))]
    InsertFailed {
        index: GlobalIndex,
        source: SendableError,
    },
    #[snafu(display("Hash table can not hold more than `{max_entries}` slots"))]
    IndexSpaceExhausted { max_entries: usize },
    #[snafu(display("Failed to write the key in slot `{index}` into the output"))]
    OutputFailed {
        index: GlobalIndex,
        source: SendableError,
    },
}

type Result<T> = std::result::Result<T, HashTableError>;

/// Result of [`ChainedHashTable::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutStatus {
    /// Key is new, it is stored in the slot
    Inserted(GlobalIndex),
    /// Key already exists in the slot, table is not modified
    AlreadyPresent(GlobalIndex),
}

impl PutStatus {
    /// Global index of the key
    #[inline]
    pub fn index(&self) -> GlobalIndex {
        match *self {
            Self::Inserted(index) | Self::AlreadyPresent(index) => index,
        }
    }

    /// Returns true if the key is inserted by this put
    #[inline]
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Metrics of the hash table
#[derive(Debug, Default)]
pub struct HashTableMetrics {
    /// Number of puts
    pub num_puts: u64,
    /// Number of slots visited while probing the chains in put
    pub num_probes: u64,
    /// Number of resizes
    pub num_resizes: u64,
    /// Time spent in rehash
    pub rehash_time: Duration,
    /// Time spent in writing the keys into output
    pub output_time: Duration,
}

/// Hash table that resolves collision with chaining. Keys are stored in the
/// [`Segment`]s, the chain of a bucket links the slots through their
/// [`GlobalIndex`].
///
/// # Invariants
///
/// - number of buckets is a power of two, bucket of a key is `hash & (num_buckets - 1)`
/// - `free_index` never decreases until [`ChainedHashTable::clear`], slots that
///   failed to copy the key are burned
/// - `len() <= free_index`
///
/// # Generics
///
/// - `K`: operations on the keys
#[derive(Debug)]
pub struct ChainedHashTable<K: KeyOps> {
    config: HashTableConfig,
    key_ops: K,
    key_types: Vec<LogicalType>,
    layout: IndexLayout,
    /// Head of the chain of each bucket
    buckets: Vec<GlobalIndex>,
    segments: Vec<Segment>,
    /// Next global index to be allocated
    free_index: usize,
    num_entries: usize,
    /// Resize is triggered before inserting when `num_entries >= threshold`
    threshold: usize,
    /// Next global index to be written by `output_all`
    output_cursor: usize,
    output_count: usize,

    /// Metrics
    pub metrics: HashTableMetrics,
}

impl<K: KeyOps> ChainedHashTable<K> {
    /// Create a new hash table
    pub fn try_new(config: HashTableConfig, key_ops: K) -> Result<Self> {
        config.validate().context(InvalidConfigurationSnafu)?;

        let num_buckets = config.initial_num_buckets();
        let key_types = config.key_types();
        let layout = IndexLayout::new(config.segment_capacity);
        let segments = vec![Segment::new(
            key_types.clone(),
            config.segment_capacity,
            config.varchar_bytes_per_slot,
        )];
        let threshold = compute_threshold(num_buckets, config.load_factor);

        tracing::debug!(
            "Create ChainedHashTable with `{}` buckets, threshold: `{}`, segment capacity: `{}`",
            num_buckets,
            threshold,
            config.segment_capacity
        );

        Ok(Self {
            config,
            key_ops,
            key_types,
            layout,
            buckets: vec![EMPTY; num_buckets],
            segments,
            free_index: 0,
            num_entries: 0,
            threshold,
            output_cursor: 0,
            output_count: 0,
            metrics: HashTableMetrics::default(),
        })
    }

    /// Number of keys in the table
    #[inline]
    pub fn len(&self) -> usize {
        self.num_entries
    }

    /// Returns true if the table does not have any key
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    /// Number of buckets, always a power of two
    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Number of segments allocated
    #[inline]
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Next global index that will be allocated
    #[inline]
    pub fn free_index(&self) -> usize {
        self.free_index
    }

    /// Number of keys written by [`Self::output_all`] since creation or the last
    /// [`Self::reset_output`]
    #[inline]
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Config of the table
    #[inline]
    pub fn config(&self) -> &HashTableConfig {
        &self.config
    }

    /// Key operations of the table
    #[inline]
    pub fn key_ops(&self) -> &K {
        &self.key_ops
    }

    #[inline]
    fn bucket_of(&self, hash: HashValue) -> usize {
        hash as usize & (self.buckets.len() - 1)
    }

    /// Iterate the global indexes in the chain of the bucket
    fn chain(&self, bucket: usize) -> impl Iterator<Item = GlobalIndex> + '_ {
        let head = self.buckets[bucket];
        std::iter::successors((head != EMPTY).then_some(head), move |&index| {
            let address = self.layout.split(index);
            let next = self.segments[address.segment as usize].link(address.offset as usize);
            (next != EMPTY).then_some(next)
        })
    }

    /// Walk the chain of the `hash`, `is_match` compares the key with the slot.
    /// Returns the matched index, or the tail of the chain if the key does not
    /// exist. The number of visited slots is returned as well
    fn probe(
        &self,
        hash: HashValue,
        is_match: impl Fn(&Segment, usize) -> bool,
    ) -> (std::result::Result<GlobalIndex, GlobalIndex>, u64) {
        let mut tail = EMPTY;
        let mut num_probes = 0;
        for index in self.chain(self.bucket_of(hash)) {
            num_probes += 1;
            let address = self.layout.split(index);
            let segment = &self.segments[address.segment as usize];
            let offset = address.offset as usize;
            if segment.hash_at(offset) == hash && is_match(segment, offset) {
                return (Ok(index), num_probes);
            }
            tail = index;
        }
        (Err(tail), num_probes)
    }

    /// Find the key at `row` of the `input`, returns its global index if exists
    pub fn contains_key(&self, input: &DataBlock, row: usize) -> Option<GlobalIndex> {
        let hash = self.key_ops.hash(input, row);
        self.probe(hash, |segment, offset| {
            segment.is_key_match(&self.key_ops, input, row, offset)
        })
        .0
        .ok()
    }

    /// Find the key at `row` of the probe side input, the key columns are read
    /// with the probe side layout of the [`KeyOps`]. Used by the lookups of join
    pub fn contains_probe_key(&self, probe: &DataBlock, row: usize) -> Option<GlobalIndex> {
        let hash = self.key_ops.hash_probe(probe, row);
        self.probe(hash, |segment, offset| {
            self.key_ops
                .key_equals_probe(probe, row, segment.keys(), offset)
        })
        .0
        .ok()
    }

    /// Insert the key at `row` of the `input` if it does not exist
    ///
    /// If the [`KeyOps`] fails to copy the key, [`HashTableError::InsertFailed`]
    /// is returned. The allocated slot keeps vacant and no chain points to it, the
    /// table is still usable
    pub fn put(&mut self, input: &DataBlock, row: usize) -> Result<PutStatus> {
        self.metrics.num_puts += 1;
        let hash = self.key_ops.hash(input, row);
        let (probed, num_probes) = self.probe(hash, |segment, offset| {
            segment.is_key_match(&self.key_ops, input, row, offset)
        });
        self.metrics.num_probes += num_probes;
        let mut tail = match probed {
            Ok(index) => return Ok(PutStatus::AlreadyPresent(index)),
            Err(tail) => tail,
        };

        let index = self.allocate()?;
        if self.num_entries >= self.threshold {
            self.resize();
            // Chains are rebuilt, find the new tail
            tail = self.chain(self.bucket_of(hash)).last().unwrap_or(EMPTY);
        }

        let address = self.layout.split(index);
        self.segments[address.segment as usize]
            .insert_entry(
                &self.key_ops,
                input,
                row,
                address.offset as usize,
                hash,
            )
            .context(InsertFailedSnafu { index })?;

        if tail == EMPTY {
            let bucket = self.bucket_of(hash);
            self.buckets[bucket] = index;
        } else {
            let tail = self.layout.split(tail);
            self.segments[tail.segment as usize].set_link(tail.offset as usize, index);
        }
        self.num_entries += 1;

        Ok(PutStatus::Inserted(index))
    }

    /// Allocate the next global index, grow a segment if the index is out of the
    /// existing segments
    fn allocate(&mut self) -> Result<GlobalIndex> {
        ensure!(
            self.free_index <= MAX_GLOBAL_INDEX as usize,
            IndexSpaceExhaustedSnafu {
                max_entries: MAX_GLOBAL_INDEX as usize + 1
            }
        );

        let index = self.free_index as GlobalIndex;
        let address = self.layout.split(index);
        if address.segment as usize == self.segments.len() {
            self.segments.push(Segment::new(
                self.key_types.clone(),
                self.config.segment_capacity,
                self.config.varchar_bytes_per_slot,
            ));
            tracing::debug!(
                "ChainedHashTable allocates segment `{}`, free index: `{}`",
                address.segment,
                self.free_index
            );
        }
        self.free_index += 1;
        Ok(index)
    }

    /// Double the number of buckets and relink all of the occupied slots with
    /// their cached hash
    fn resize(&mut self) {
        let num_buckets = self.buckets.len();
        if num_buckets >= self.config.max_table_capacity {
            self.threshold = usize::MAX;
            tracing::debug!(
                "ChainedHashTable reaches the maximum capacity `{}` with `{}` entries, chains will grow without resize",
                num_buckets,
                self.num_entries
            );
            return;
        }

        self.metrics.num_resizes += 1;
        let num_buckets = num_buckets * 2;
        {
            let _guard = ScopedTimerGuard::new(&mut self.metrics.rehash_time);
            let mask = num_buckets - 1;
            let mut buckets = vec![EMPTY; num_buckets];
            let mut tails = vec![EMPTY; num_buckets];
            for segment_index in 0..self.segments.len() {
                let Some(max_occupied) = self.segments[segment_index].max_occupied() else {
                    continue;
                };
                for offset in 0..=max_occupied {
                    let segment = &mut self.segments[segment_index];
                    if !segment.is_occupied(offset) {
                        continue;
                    }
                    let index = self.layout.join(segment_index, offset);
                    let bucket = segment.hash_at(offset) as usize & mask;
                    segment.set_link(offset, EMPTY);

                    let tail = tails[bucket];
                    if tail == EMPTY {
                        buckets[bucket] = index;
                    } else {
                        let tail = self.layout.split(tail);
                        self.segments[tail.segment as usize].set_link(tail.offset as usize, index);
                    }
                    tails[bucket] = index;
                }
            }
            self.buckets = buckets;
        }
        self.threshold = compute_threshold(num_buckets, self.config.load_factor);

        tracing::debug!(
            "ChainedHashTable resizes to `{}` buckets, threshold: `{}`, entries: `{}`, rehash takes: `{:?}`",
            num_buckets,
            self.threshold,
            self.num_entries,
            self.metrics.rehash_time
        );
    }

    /// Write the keys into the `output` in the order of the global index, starting
    /// from the row after the last row of the `output`.
    ///
    /// Returns `Ok(false)` if the `output` is full. The table remembers the key
    /// that does not fit, the next call continues from it with a fresh output.
    /// Returns `Ok(true)` after all of the keys are written, keys inserted later
    /// are written by the next call
    pub fn output_all(&mut self, output: &mut DataBlock) -> Result<bool> {
        let _guard = ScopedTimerGuard::new(&mut self.metrics.output_time);
        let mut out_row = output.len();
        // Slots below `free_index` are either occupied or burned, the cursor never
        // passes `free_index`
        while self.output_cursor < self.free_index {
            let index = self.output_cursor as GlobalIndex;
            let address = self.layout.split(index);
            let segment = &self.segments[address.segment as usize];
            let offset = address.offset as usize;
            if segment.is_occupied(offset) {
                let written = segment
                    .output_key(&self.key_ops, offset, output, out_row)
                    .context(OutputFailedSnafu { index })?;
                if !written {
                    return Ok(false);
                }
                out_row += 1;
                self.output_count += 1;
            }
            self.output_cursor += 1;
        }
        Ok(true)
    }

    /// Restart the [`Self::output_all`] from the first key
    #[inline]
    pub fn reset_output(&mut self) {
        self.output_cursor = 0;
        self.output_count = 0;
    }

    /// Release all of the segments and reset the table to the configured initial
    /// state. Global indexes allocated before are invalid
    pub fn clear(&mut self) {
        let num_buckets = self.config.initial_num_buckets();
        self.segments.clear();
        self.segments.push(Segment::new(
            self.key_types.clone(),
            self.config.segment_capacity,
            self.config.varchar_bytes_per_slot,
        ));
        self.buckets.clear();
        self.buckets.resize(num_buckets, EMPTY);
        self.threshold = compute_threshold(num_buckets, self.config.load_factor);
        self.free_index = 0;
        self.num_entries = 0;
        self.reset_output();
    }

    /// Log the chain of the bucket, used for debugging the collisions
    pub fn dump_chain(&self, bucket: usize) {
        let chain = self
            .chain(bucket)
            .map(|index| {
                let address = self.layout.split(index);
                let hash = self.segments[address.segment as usize].hash_at(address.offset as usize);
                format!("{index}(hash: {hash:#010x})")
            })
            .collect::<Vec<_>>();
        tracing::debug!("Chain of bucket `{}`: [{}]", bucket, chain.join(" -> "));
    }
}
