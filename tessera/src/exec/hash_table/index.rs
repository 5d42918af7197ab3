//! Layout of the [`GlobalIndex`]
//!
//! A global index packs `(segment, offset)` into a single `u32`: the high bits are
//! the index of the segment, the low `log2(segment_capacity)` bits are the offset
//! in the segment. The two largest values are reserved as sentinels

use crate::common::types::GlobalIndex;

/// End of the hash chain / empty bucket
pub const EMPTY: GlobalIndex = GlobalIndex::MAX;

/// Slot that is allocated but never written. Only the `links` of the segment
/// store it, it never appears in a chain
pub const VACANT: GlobalIndex = GlobalIndex::MAX - 1;

/// Largest index that can be assigned to an entry
pub const MAX_GLOBAL_INDEX: GlobalIndex = GlobalIndex::MAX - 2;

/// Unpacked [`GlobalIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAddress {
    /// Index of the segment in the table
    pub segment: u32,
    /// Offset in the segment
    pub offset: u32,
}

/// Split/join the [`GlobalIndex`] with shift and mask
#[derive(Debug, Clone, Copy)]
pub struct IndexLayout {
    shift: u32,
    mask: u32,
}

impl IndexLayout {
    /// Create a new layout. `segment_capacity` must be a power of two that fits
    /// into `u32`, checked by the config validation
    #[inline]
    pub fn new(segment_capacity: usize) -> Self {
        debug_assert!(segment_capacity.is_power_of_two());
        debug_assert!(segment_capacity <= u32::MAX as usize);
        Self {
            shift: segment_capacity.trailing_zeros(),
            mask: (segment_capacity - 1) as u32,
        }
    }

    /// Number of slots in each segment
    #[inline]
    pub fn segment_capacity(&self) -> usize {
        1 << self.shift
    }

    /// Split the global index into segment and offset
    #[inline]
    pub fn split(&self, index: GlobalIndex) -> SlotAddress {
        debug_assert!(index <= MAX_GLOBAL_INDEX, "Sentinel can not be split");
        SlotAddress {
            segment: index >> self.shift,
            offset: index & self.mask,
        }
    }

    /// Join the segment and offset into global index
    #[inline]
    pub fn join(&self, segment: usize, offset: usize) -> GlobalIndex {
        debug_assert!(offset as u32 <= self.mask);
        ((segment as u32) << self.shift) | offset as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join() {
        let layout = IndexLayout::new(65536);
        assert_eq!(layout.segment_capacity(), 65536);
        assert_eq!(
            layout.split(0x0003_0005),
            SlotAddress {
                segment: 3,
                offset: 5
            }
        );
        assert_eq!(layout.join(3, 5), 0x0003_0005);

        let layout = IndexLayout::new(4);
        assert_eq!(
            layout.split(11),
            SlotAddress {
                segment: 2,
                offset: 3
            }
        );
        assert_eq!(layout.join(2, 3), 11);
    }

    #[test]
    fn test_largest_index() {
        let layout = IndexLayout::new(1 << 16);
        let address = layout.split(MAX_GLOBAL_INDEX);
        assert_eq!(address.segment, 0xFFFF);
        assert_eq!(address.offset, 0xFFFD);
        assert_eq!(layout.join(0xFFFF, 0xFFFD), MAX_GLOBAL_INDEX);
    }
}
