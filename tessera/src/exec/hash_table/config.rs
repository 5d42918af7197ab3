//! Configuration of the [`ChainedHashTable`]
//!
//! [`ChainedHashTable`]: super::ChainedHashTable

use data_block::types::LogicalType;
use snafu::{Snafu, ensure};

/// Default number of buckets when the table is created
pub const DEFAULT_INITIAL_CAPACITY: usize = 1 << 16;

/// Default load factor
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Largest number of buckets the table can have. After reaching it, the table
/// stops resizing and the chains grow longer
pub const MAXIMUM_CAPACITY: usize = 1 << 30;

/// Default number of slots in each segment
pub const DEFAULT_SEGMENT_CAPACITY: usize = 1 << 16;

/// Largest number of slots in each segment
pub const MAX_SEGMENT_CAPACITY: usize = 1 << 24;

/// Default byte budget per slot of the variable width key columns
pub const DEFAULT_VARCHAR_BYTES_PER_SLOT: usize = 50;

#[allow(missing_docs)]
/// Error returned by validating the [`HashTableConfig`]
#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Load factor `{load_factor}` should be a positive number"))]
    InvalidLoadFactor { load_factor: f32 },
    #[snafu(display("Initial capacity should be greater than 0"))]
    ZeroInitialCapacity,
    #[snafu(display(
        "Initial capacity `{initial_capacity}` exceeds the maximum capacity `{max_capacity}`"
    ))]
    InitialCapacityExceedsMaximum {
        initial_capacity: usize,
        max_capacity: usize,
    },
    #[snafu(display("Maximum capacity `{max_capacity}` should be a power of two in range [1, {MAXIMUM_CAPACITY}]"))]
    InvalidMaxCapacity { max_capacity: usize },
    #[snafu(display("Segment capacity `{segment_capacity}` should be a power of two in range [1, {MAX_SEGMENT_CAPACITY}]"))]
    InvalidSegmentCapacity { segment_capacity: usize },
    #[snafu(display("Hash table should have at least one key column"))]
    EmptyKeyColumns,
}

/// Name and type of a key column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumnSpec {
    /// Name of the column
    pub name: String,
    /// Logical type of the column
    pub logical_type: LogicalType,
}

impl KeyColumnSpec {
    /// Create a new key column
    #[inline]
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

/// Configuration of the hash table
#[derive(Debug, Clone)]
pub struct HashTableConfig {
    /// Number of buckets requested when the table is created. Rounded up to the
    /// power of two
    pub initial_capacity: usize,
    /// Ratio of entries to buckets that triggers a resize
    pub load_factor: f32,
    /// Upper bound of the number of buckets
    pub max_table_capacity: usize,
    /// Number of slots in each segment
    pub segment_capacity: usize,
    /// Byte budget per slot of the variable width key columns. Copying a key
    /// that does not fit into the budget of its segment fails
    pub varchar_bytes_per_slot: usize,
    /// Key columns stored in the table
    pub key_columns: Vec<KeyColumnSpec>,
}

impl HashTableConfig {
    /// Create a new config with default capacities
    pub fn new(key_columns: Vec<KeyColumnSpec>) -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            max_table_capacity: MAXIMUM_CAPACITY,
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
            varchar_bytes_per_slot: DEFAULT_VARCHAR_BYTES_PER_SLOT,
            key_columns,
        }
    }

    /// Set the initial capacity
    #[inline]
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Set the load factor
    #[inline]
    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Set the maximum number of buckets
    #[inline]
    pub fn with_max_table_capacity(mut self, max_table_capacity: usize) -> Self {
        self.max_table_capacity = max_table_capacity;
        self
    }

    /// Set the number of slots in each segment
    #[inline]
    pub fn with_segment_capacity(mut self, segment_capacity: usize) -> Self {
        self.segment_capacity = segment_capacity;
        self
    }

    /// Set the byte budget per slot of the variable width key columns
    #[inline]
    pub fn with_varchar_bytes_per_slot(mut self, varchar_bytes_per_slot: usize) -> Self {
        self.varchar_bytes_per_slot = varchar_bytes_per_slot;
        self
    }

    /// Logical types of the key columns
    pub fn key_types(&self) -> Vec<LogicalType> {
        self.key_columns
            .iter()
            .map(|column| column.logical_type.clone())
            .collect()
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.load_factor > 0.0 && self.load_factor.is_finite(),
            InvalidLoadFactorSnafu {
                load_factor: self.load_factor
            }
        );
        ensure!(
            self.max_table_capacity.is_power_of_two() && self.max_table_capacity <= MAXIMUM_CAPACITY,
            InvalidMaxCapacitySnafu {
                max_capacity: self.max_table_capacity
            }
        );
        ensure!(self.initial_capacity > 0, ZeroInitialCapacitySnafu);
        ensure!(
            self.initial_capacity <= self.max_table_capacity,
            InitialCapacityExceedsMaximumSnafu {
                initial_capacity: self.initial_capacity,
                max_capacity: self.max_table_capacity,
            }
        );
        ensure!(
            self.segment_capacity.is_power_of_two()
                && self.segment_capacity <= MAX_SEGMENT_CAPACITY,
            InvalidSegmentCapacitySnafu {
                segment_capacity: self.segment_capacity
            }
        );
        ensure!(!self.key_columns.is_empty(), EmptyKeyColumnsSnafu);
        Ok(())
    }

    /// Number of buckets the table starts with. Only valid after the validation
    #[inline]
    pub(super) fn initial_num_buckets(&self) -> usize {
        self.initial_capacity
            .next_power_of_two()
            .min(self.max_table_capacity)
    }
}

impl Default for HashTableConfig {
    /// Default capacities without key columns, the caller has to fill them
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Number of entries that triggers the next resize
#[inline]
pub(super) fn compute_threshold(num_buckets: usize, load_factor: f32) -> usize {
    (num_buckets as f64 * load_factor as f64).ceil() as usize
}
