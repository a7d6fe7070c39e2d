//! A 128-bit block.

use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign};

use bytemuck::{Pod, Zeroable};
use rand::{distributions::Standard, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};

/// A 128-bit block.
///
/// Bit `i` of a block is bit `i % 8` of byte `i / 8`, which is the same as bit `i` of its
/// little-endian `u128` value. Blocks are 16-byte aligned, so any `&[Block]` is too.
#[repr(C, align(16))]
#[derive(
    Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct Block([u8; 16]);

impl Block {
    /// The length of a block in bytes.
    pub const LEN: usize = 16;
    /// The number of bits in a block.
    pub const BITS: usize = 128;
    /// A zero block.
    pub const ZERO: Self = Self([0; 16]);
    /// A block with all bits set to 1.
    pub const ONES: Self = Self([0xff; 16]);
    /// A block with only the least significant bit set.
    pub const ONE: Self = Self([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    /// Creates a new block.
    #[inline]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the byte representation of the block.
    #[inline]
    pub fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Returns a reference to the bytes of the block.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns the block as two little-endian 64-bit words, low word first.
    #[inline]
    pub fn to_words(self) -> [u64; 2] {
        let v = u128::from_le_bytes(self.0);
        [v as u64, (v >> 64) as u64]
    }

    /// Creates a block from two little-endian 64-bit words, low word first.
    #[inline]
    pub fn from_words(words: [u64; 2]) -> Self {
        Self::from(words[0] as u128 | ((words[1] as u128) << 64))
    }

    /// Returns the least significant bit of the block.
    #[inline]
    pub fn lsb(&self) -> bool {
        self.0[0] & 1 == 1
    }

    /// Returns bit `i` of the block.
    ///
    /// # Panics
    ///
    /// Panics if `i >= 128`.
    #[inline]
    pub fn bit(&self, i: usize) -> bool {
        (self.0[i / 8] >> (i % 8)) & 1 == 1
    }

    /// Returns the block with its least significant bit cleared.
    #[inline]
    pub fn clear_lsb(mut self) -> Self {
        self.0[0] &= 0xfe;
        self
    }

    /// Returns the parity of the block, i.e. the XOR of all its bits.
    #[inline]
    pub fn parity(&self) -> bool {
        u128::from_le_bytes(self.0).count_ones() & 1 == 1
    }
}

impl From<[u8; 16]> for Block {
    #[inline]
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl From<Block> for [u8; 16] {
    #[inline]
    fn from(block: Block) -> Self {
        block.0
    }
}

impl From<u128> for Block {
    #[inline]
    fn from(value: u128) -> Self {
        Self(value.to_le_bytes())
    }
}

impl From<Block> for u128 {
    #[inline]
    fn from(block: Block) -> Self {
        u128::from_le_bytes(block.0)
    }
}

impl TryFrom<&[u8]> for Block {
    type Error = std::array::TryFromSliceError;

    #[inline]
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        <[u8; 16]>::try_from(value).map(Self)
    }
}

impl AsRef<[u8]> for Block {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Block {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Distribution<Block> for Standard {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block(rng.gen())
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block({})", hex::encode(self.0))
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

macro_rules! impl_bit_op {
    ($trait:ident, $fn:ident, $assign_trait:ident, $assign_fn:ident, $op:tt) => {
        impl $trait for Block {
            type Output = Self;

            #[inline]
            fn $fn(self, rhs: Self) -> Self {
                Self::from(u128::from_le_bytes(self.0) $op u128::from_le_bytes(rhs.0))
            }
        }

        impl $assign_trait for Block {
            #[inline]
            fn $assign_fn(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_bit_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);
impl_bit_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_bit_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_alignment() {
        assert_eq!(std::mem::align_of::<Block>(), 16);
        assert_eq!(std::mem::size_of::<Block>(), 16);
    }

    #[test]
    fn test_block_words_roundtrip_order() {
        let block = Block::from((1u128 << 64) | 7);
        assert_eq!(block.to_words(), [7, 1]);
        assert_eq!(Block::from_words([7, 1]), block);
    }

    #[test]
    fn test_block_bits() {
        let block = Block::from((1u128 << 100) | 1);
        assert!(block.lsb());
        assert!(block.bit(100));
        assert!(!block.bit(99));
        assert!(!block.clear_lsb().lsb());
        assert!(!block.parity());
        assert!(Block::ONE.parity());
    }

    #[test]
    fn test_block_as_mut_bytes() {
        let mut block = Block::ZERO;
        block.as_mut()[15] = 0x80;
        assert_eq!(block, Block::from(1u128 << 127));
        assert_eq!(block.as_ref(), block.as_bytes());
    }

    #[test]
    fn test_block_ops() {
        let a = Block::from(0b1100u128);
        let b = Block::from(0b1010u128);
        assert_eq!(a ^ b, Block::from(0b0110u128));
        assert_eq!(a & b, Block::from(0b1000u128));
        assert_eq!(a | b, Block::from(0b1110u128));
        assert_eq!(Block::ONES ^ Block::ONES, Block::ZERO);
    }
}
