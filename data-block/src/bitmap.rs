//! Bitmap

use std::fmt::Debug;

/// Underling type that stores the bitmap
pub(crate) type BitStore = u64;

const BITS: usize = BitStore::BITS as usize;

/// Bitmap in data-block, each boolean is stored as a single bit. Bits beyond
/// [`Bitmap::len`] in the last word are always zero
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    /// Internal buffer stores the bits
    buffer: Vec<BitStore>,
    /// Number of live bits in the allocation
    num_bits: usize,
}

#[inline]
fn bit_mask(index: usize) -> BitStore {
    1 << (index % BITS)
}

#[inline]
fn elts(num_bits: usize) -> usize {
    num_bits.div_ceil(BITS)
}

impl Bitmap {
    /// Create a new empty [`Bitmap`]
    #[inline]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            num_bits: 0,
        }
    }

    /// Create a new [`Bitmap`] that has `num_bits` bits, all of them are `value`
    pub fn from_elem(value: bool, num_bits: usize) -> Self {
        let word = if value { BitStore::MAX } else { 0 };
        let mut bitmap = Self {
            buffer: vec![word; elts(num_bits)],
            num_bits,
        };
        bitmap.clear_tail();
        bitmap
    }

    /// Returns true if the bitmap is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    /// Get number of bits in the bitmap
    #[inline]
    pub fn len(&self) -> usize {
        self.num_bits
    }

    /// Get the underling raw_slice for the bitmap
    #[inline]
    pub fn as_raw_slice(&self) -> &[BitStore] {
        &self.buffer
    }

    /// Get the bit at `index`. It will panic if the index out of bounds
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.num_bits,
            "Index `{index}` out of bitmap with length `{}`",
            self.num_bits
        );
        self.buffer[index / BITS] & bit_mask(index) != 0
    }

    /// Set the bit at `index`. It will panic if the index out of bounds
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(
            index < self.num_bits,
            "Index `{index}` out of bitmap with length `{}`",
            self.num_bits
        );
        let word = &mut self.buffer[index / BITS];
        let mask = bit_mask(index);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Append a bit to the end of the bitmap
    #[inline]
    pub fn push(&mut self, value: bool) {
        if self.num_bits % BITS == 0 {
            self.buffer.push(0);
        }
        self.num_bits += 1;
        self.set(self.num_bits - 1, value);
    }

    /// Number of bits that are `true`
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.buffer.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Number of bits that are `false`
    #[inline]
    pub fn count_zeros(&self) -> usize {
        self.num_bits - self.count_ones()
    }

    /// Returns true if all of the bits are `true`
    #[inline]
    pub fn all_valid(&self) -> bool {
        self.count_zeros() == 0
    }

    /// Get the iterator that produce bool
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + '_ {
        (0..self.num_bits).map(|index| self.buffer[index / BITS] & bit_mask(index) != 0)
    }

    /// Clear the bitmap, the allocation is kept
    #[inline]
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.num_bits = 0;
    }

    fn clear_tail(&mut self) {
        let rem = self.num_bits % BITS;
        if rem != 0 {
            if let Some(last) = self.buffer.last_mut() {
                *last &= bit_mask(rem) - 1;
            }
        }
    }
}

impl FromIterator<bool> for Bitmap {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut bitmap = Self {
            buffer: Vec::with_capacity(elts(iter.size_hint().0)),
            num_bits: 0,
        };
        iter.for_each(|value| bitmap.push(value));
        bitmap
    }
}

impl Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitmap {{ len: {}, bits: ", self.num_bits)?;
        f.debug_list().entries(self.iter().map(u8::from)).finish()?;
        write!(f, " }}")
    }
}
