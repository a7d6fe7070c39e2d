//! AES-128 wrappers operating on [`Block`]s.

use aes::Aes128;
use cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use once_cell::sync::Lazy;

use crate::Block;

/// A fixed AES key, nothing-up-my-sleeve digits of pi.
const FIXED_KEY: [u8; 16] = [
    0x24, 0x3f, 0x6a, 0x88, 0x85, 0xa3, 0x08, 0xd3, 0x13, 0x19, 0x8a, 0x2e, 0x03, 0x70, 0x73, 0x44,
];

/// Fixed-key AES, used as a public random permutation.
pub static FIXED_KEY_AES: Lazy<FixedKeyAes> = Lazy::new(|| FixedKeyAes {
    aes: AesEncryptor::new(Block::new(FIXED_KEY)),
});

/// AES-128 encryptor.
#[derive(Clone)]
pub struct AesEncryptor(Aes128);

opaque_debug::implement!(AesEncryptor);

impl AesEncryptor {
    /// Number of blocks encrypted per batch by [`AesEncryptor::encrypt_many_blocks`].
    pub const AES_BLOCK_COUNT: usize = 8;

    /// Creates a new encryptor keyed with `key`.
    #[inline]
    pub fn new(key: Block) -> Self {
        Self(Aes128::new(&GenericArray::from(key.to_bytes())))
    }

    /// Encrypts a single block.
    #[inline]
    pub fn encrypt_block(&self, block: Block) -> Block {
        let mut b = GenericArray::from(block.to_bytes());
        self.0.encrypt_block(&mut b);
        Block::new(b.into())
    }

    /// Encrypts a fixed number of blocks in place.
    #[inline]
    pub fn encrypt_many_blocks<const N: usize>(&self, blocks: &mut [Block; N]) {
        self.encrypt_blocks(blocks);
    }

    /// Encrypts a slice of blocks in place.
    ///
    /// Blocks go through a stack buffer of [`AesEncryptor::AES_BLOCK_COUNT`] blocks at a time.
    #[inline]
    pub fn encrypt_blocks(&self, blocks: &mut [Block]) {
        let mut buf = [GenericArray::from([0u8; 16]); Self::AES_BLOCK_COUNT];
        for chunk in blocks.chunks_mut(Self::AES_BLOCK_COUNT) {
            let buf = &mut buf[..chunk.len()];
            for (b, block) in buf.iter_mut().zip(chunk.iter()) {
                *b = GenericArray::from(block.to_bytes());
            }
            self.0.encrypt_blocks(buf);
            for (block, b) in chunk.iter_mut().zip(buf.iter()) {
                *block = Block::new((*b).into());
            }
        }
    }
}

/// A fixed-key AES permutation `π` with derived hash functions.
pub struct FixedKeyAes {
    aes: AesEncryptor,
}

opaque_debug::implement!(FixedKeyAes);

impl FixedKeyAes {
    /// Applies the permutation.
    #[inline]
    pub fn permute(&self, block: Block) -> Block {
        self.aes.encrypt_block(block)
    }

    /// Tweakable circular correlation-robust hash.
    ///
    /// `TCCR(t, x) = π(π(x) ⊕ t) ⊕ π(x)`
    #[inline]
    pub fn tccr(&self, tweak: Block, block: Block) -> Block {
        let h = self.permute(block);
        self.permute(h ^ tweak) ^ h
    }

    /// Applies [`FixedKeyAes::tccr`] to `block` under each of `tweaks`.
    #[inline]
    pub fn tccr_many(&self, tweaks: &[Block], block: Block, out: &mut [Block]) {
        debug_assert_eq!(tweaks.len(), out.len());
        let h = self.permute(block);
        for (o, &t) in out.iter_mut().zip(tweaks) {
            *o = h ^ t;
        }
        self.aes.encrypt_blocks(out);
        for o in out.iter_mut() {
            *o ^= h;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_known_answer() {
        // FIPS-197 appendix C.1.
        let key = Block::new([
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ]);
        let pt = Block::new([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        let ct = Block::new([
            0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4,
            0xc5, 0x5a,
        ]);

        let aes = AesEncryptor::new(key);
        assert_eq!(aes.encrypt_block(pt), ct);

        let mut many = [pt; 3];
        aes.encrypt_many_blocks(&mut many);
        assert_eq!(many, [ct; 3]);
    }

    #[test]
    fn test_tccr_many_matches_tccr() {
        let x = Block::from(42u128);
        let tweaks = [Block::ZERO, Block::ONE, Block::from(7u128)];
        let mut out = [Block::ZERO; 3];
        FIXED_KEY_AES.tccr_many(&tweaks, x, &mut out);

        for (o, t) in out.iter().zip(tweaks) {
            assert_eq!(*o, FIXED_KEY_AES.tccr(t, x));
        }
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn test_encrypt_blocks_across_buffer_chunks() {
        let aes = AesEncryptor::new(Block::ONES);
        let blocks: Vec<Block> = (0..19u128).map(Block::from).collect();

        let mut many = blocks.clone();
        aes.encrypt_blocks(&mut many);

        let single: Vec<Block> = blocks.iter().map(|&b| aes.encrypt_block(b)).collect();
        assert_eq!(many, single);

        let tweaks: Vec<Block> = (0..19u128).map(|t| Block::from(t << 64)).collect();
        let mut out = vec![Block::ZERO; tweaks.len()];
        FIXED_KEY_AES.tccr_many(&tweaks, Block::ONE, &mut out);
        for (o, &t) in out.iter().zip(&tweaks) {
            assert_eq!(*o, FIXED_KEY_AES.tccr(t, Block::ONE));
        }
    }
}
