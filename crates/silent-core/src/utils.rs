//! Miscellaneous helpers.

use crate::Block;

/// Computes the blake3 hash of `data`.
#[inline]
pub fn blake3(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Expands a block into a 32-byte key for keyed blake3.
#[inline]
pub fn derive_key(block: Block) -> [u8; 32] {
    blake3(block.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_separates_blocks() {
        assert_eq!(derive_key(Block::ONE), blake3(Block::ONE.as_bytes()));
        assert_ne!(derive_key(Block::ZERO), derive_key(Block::ONE));
    }
}
