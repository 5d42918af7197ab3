//! Fixed capacity storage of the keys and their chain metadata

use data_block::block::DataBlock;
use data_block::types::LogicalType;

use super::index::{EMPTY, VACANT};
use super::key_ops::KeyOps;
use crate::common::types::{GlobalIndex, HashValue};
use crate::error::SendableError;

/// Segment stores `capacity` keys in columnar format. For each slot, it also
/// stores the next [`GlobalIndex`] in the chain and the cached hash of the key.
///
/// Segment knows nothing about other segments, the links it stores are opaque
/// to it. Slots are append only: once written, a slot is never moved or freed
/// until the table is cleared
#[derive(Debug)]
pub struct Segment {
    /// Key columns, each array has `capacity` elements
    keys: DataBlock,
    /// Next global index in the chain of the slot, [`EMPTY`] at the end of the
    /// chain and [`VACANT`] if the slot is not written
    links: Vec<GlobalIndex>,
    /// Cached hash of the key in the slot
    hashes: Vec<HashValue>,
    /// Largest occupied offset
    max_occupied: Option<usize>,
}

impl Segment {
    /// Create a new segment
    pub fn new(key_types: Vec<LogicalType>, capacity: usize, varchar_bytes_per_slot: usize) -> Self {
        let mut keys = DataBlock::with_capacity(key_types, capacity);
        let byte_limit = capacity.saturating_mul(varchar_bytes_per_slot);
        keys.mutable_arrays()
            .iter_mut()
            .filter(|array| array.logical_type().is_variable_width())
            .for_each(|array| array.set_byte_limit(Some(byte_limit)));

        Self {
            keys,
            links: vec![VACANT; capacity],
            hashes: vec![0; capacity],
            max_occupied: None,
        }
    }

    /// Number of slots in the segment
    #[inline]
    pub fn capacity(&self) -> usize {
        self.links.len()
    }

    /// Key columns of the segment
    #[inline]
    pub fn keys(&self) -> &DataBlock {
        &self.keys
    }

    /// Largest offset that is occupied
    #[inline]
    pub fn max_occupied(&self) -> Option<usize> {
        self.max_occupied
    }

    /// Returns true if the slot is written
    #[inline]
    pub fn is_occupied(&self, offset: usize) -> bool {
        self.links[offset] != VACANT
    }

    /// Next global index in the chain
    #[inline]
    pub fn link(&self, offset: usize) -> GlobalIndex {
        self.links[offset]
    }

    /// Point the slot to the next global index in the chain
    #[inline]
    pub fn set_link(&mut self, offset: usize, next: GlobalIndex) {
        debug_assert!(self.is_occupied(offset), "Link a vacant slot");
        self.links[offset] = next;
    }

    /// Cached hash of the key in the slot
    #[inline]
    pub fn hash_at(&self, offset: usize) -> HashValue {
        self.hashes[offset]
    }

    /// Returns true if the key at `row` of the `input` matches the key in the slot
    #[inline]
    pub fn is_key_match<K: KeyOps>(
        &self,
        key_ops: &K,
        input: &DataBlock,
        row: usize,
        offset: usize,
    ) -> bool {
        key_ops.key_equals(input, row, &self.keys, offset)
    }

    /// Write the key at `row` of the `input` into the vacant slot, the slot
    /// becomes the end of a chain.
    ///
    /// If the copy fails, the slot keeps vacant
    pub fn insert_entry<K: KeyOps>(
        &mut self,
        key_ops: &K,
        input: &DataBlock,
        row: usize,
        offset: usize,
        hash: HashValue,
    ) -> Result<(), SendableError> {
        debug_assert!(!self.is_occupied(offset), "Overwrite occupied slot");
        key_ops.copy_key_into(input, row, &mut self.keys, offset)?;
        self.links[offset] = EMPTY;
        self.hashes[offset] = hash;
        self.max_occupied = Some(self.max_occupied.map_or(offset, |max| max.max(offset)));
        Ok(())
    }

    /// Write the key in the slot into `out_row` of the `output`
    #[inline]
    pub fn output_key<K: KeyOps>(
        &self,
        key_ops: &K,
        offset: usize,
        output: &mut DataBlock,
        out_row: usize,
    ) -> Result<bool, SendableError> {
        key_ops.output_key_row(&self.keys, offset, output, out_row)
    }
}
