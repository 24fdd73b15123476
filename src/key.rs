//! Fixed-width integer keys.
//!
//! Bits are addressed by *depth*: depth `0` is the most significant bit, depth
//! `W - 1` the least significant one. This is the order in which the trie
//! consumes a key while descending.

use std::fmt;
use std::hash::Hash;

mod sealed {
    pub trait Sealed {}
}

/// An unsigned integer usable as a trie key.
///
/// Implemented for `u32` and `u64`; the trait is sealed.
pub trait Key: Copy + Eq + Ord + Hash + Default + fmt::Debug + fmt::Binary + sealed::Sealed {
    /// Key width `W` in bits.
    const WIDTH: u8;

    /// Returns the bit at `depth` (MSB first) as a child slot index, `0` or `1`.
    fn bit(self, depth: u8) -> usize;

    /// Keeps the `bits` most significant bits and zeroes the rest.
    fn masked(self, bits: u8) -> Self;

    /// Mask covering the `bits` most significant bits.
    fn prefix_mask(bits: u8) -> Self;
}

macro_rules! impl_key {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Key for $t {
                const WIDTH: u8 = <$t>::BITS as u8;

                #[inline]
                fn bit(self, depth: u8) -> usize {
                    debug_assert!(depth < Self::WIDTH, "bit depth {depth} out of range");
                    ((self >> (Self::WIDTH - 1 - depth)) & 1) as usize
                }

                #[inline]
                fn masked(self, bits: u8) -> Self {
                    self & Self::prefix_mask(bits)
                }

                #[inline]
                fn prefix_mask(bits: u8) -> Self {
                    debug_assert!(bits <= Self::WIDTH, "prefix length {bits} out of range");
                    // A shift by the full width yields the empty mask.
                    <$t>::MAX
                        .checked_shl(u32::from(Self::WIDTH.saturating_sub(bits)))
                        .unwrap_or(0)
                }
            }
        )*
    };
}

impl_key!(u32, u64);
