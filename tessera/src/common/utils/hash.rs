//! Utils for hash

use crate::common::types::HashValue;

/// Default hash builder
pub type BuildHasherDefault = ahash::RandomState;

/// Constant build hasher default. Seeds are fixed, such that the hash of a key is
/// stable within the process and can be cached
pub const BUILD_HASHER_DEFAULT: BuildHasherDefault = BuildHasherDefault::with_seeds(9, 7, 9, 8);

/// Fold the 64-bit hash into the [`HashValue`], high bits are mixed into the low
/// bits that select the bucket
#[inline]
pub fn fold_hash(hash: u64) -> HashValue {
    ((hash >> 32) ^ hash) as HashValue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(
            BUILD_HASHER_DEFAULT.hash_one(("tessera", 7_i64)),
            BuildHasherDefault::with_seeds(9, 7, 9, 8).hash_one(("tessera", 7_i64))
        );
        assert_eq!(fold_hash(0x0000_0001_0000_0001), 0);
        assert_eq!(fold_hash(0xFFFF_0000_0000_00FF), 0xFFFF_00FF);
    }
}
