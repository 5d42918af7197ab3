//! Common type alias

/// Result type of the hash function. Hash values are cached per entry, 32 bits
/// keep the per-slot metadata small
pub type HashValue = u32;

/// Index of an entry in the hash table, it packs the segment index and the offset
/// in the segment into a single integer. See
/// [`IndexLayout`](crate::exec::hash_table::index::IndexLayout)
pub type GlobalIndex = u32;
