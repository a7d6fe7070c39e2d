//! Polynomial arithmetic over GF(2)\[x\].
//!
//! A polynomial is stored as little-endian 64-bit words: coefficient `i` is bit `i % 64` of
//! word `i / 64`. Multiplication is Karatsuba on word vectors with a carry-less schoolbook
//! base case.

use silent_core::Block;

use crate::Error;

/// Operand length, in words, below which multiplication falls back to schoolbook.
const KARATSUBA_THRESHOLD: usize = 16;

/// A polynomial over GF(2).
#[derive(Debug, Clone, Default)]
pub struct Poly {
    words: Vec<u64>,
}

/// Scratch space for [`Poly::decode`], reused across rows.
#[derive(Debug, Default)]
pub struct DecodeCache {
    buf: Vec<Block>,
}

impl Poly {
    /// Encodes a bit-string as a polynomial, bit `i` becoming the coefficient of `x^i`.
    pub fn encode(blocks: &[Block]) -> Self {
        Self {
            words: blocks.iter().flat_map(|b| b.to_words()).collect(),
        }
    }

    /// Returns the number of words in the representation.
    pub fn len_words(&self) -> usize {
        self.words.len()
    }

    /// Returns the product `a * b`.
    pub fn mul(a: &Poly, b: &Poly) -> Poly {
        let n = a.words.len().max(b.words.len());
        if n == 0 {
            return Poly::default();
        }

        let mut a = a.words.clone();
        let mut b = b.words.clone();
        a.resize(n, 0);
        b.resize(n, 0);

        let mut words = vec![0u64; 2 * n];
        karatsuba(&a, &b, &mut words);

        Poly { words }
    }

    /// Sets `self = self * other`.
    pub fn mul_assign(&mut self, other: &Poly) {
        *self = Poly::mul(self, other);
    }

    /// Sets `self = self + a * b`.
    pub fn mul_add_assign(&mut self, a: &Poly, b: &Poly) {
        self.add_assign(&Poly::mul(a, b));
    }

    /// Sets `self = self + other`.
    pub fn add_assign(&mut self, other: &Poly) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        self.words
            .iter_mut()
            .zip(&other.words)
            .for_each(|(a, b)| *a ^= b);
    }

    /// Decodes the polynomial into `len_blocks` blocks held by `cache`.
    ///
    /// Coefficients beyond the polynomial's degree are zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if the polynomial does not fit in `len_blocks` blocks.
    pub fn decode<'a>(
        &self,
        len_blocks: usize,
        cache: &'a mut DecodeCache,
    ) -> Result<&'a [Block], Error> {
        let significant = self
            .words
            .iter()
            .rposition(|&w| w != 0)
            .map_or(0, |i| i + 1);

        if significant > 2 * len_blocks {
            return Err(Error::parameter(format!(
                "polynomial of {significant} words does not fit in {len_blocks} blocks"
            )));
        }

        cache.buf.clear();
        cache.buf.resize(len_blocks, Block::ZERO);
        for (block, words) in cache.buf.iter_mut().zip(self.words.chunks(2)) {
            *block = Block::from_words([words[0], words.get(1).copied().unwrap_or(0)]);
        }

        Ok(&cache.buf)
    }
}

/// Writes `a * b` into `out`. `a` and `b` have equal length `n` and `out` has length `2n`.
fn karatsuba(a: &[u64], b: &[u64], out: &mut [u64]) {
    let n = a.len();
    debug_assert_eq!(b.len(), n);
    debug_assert_eq!(out.len(), 2 * n);

    if n <= KARATSUBA_THRESHOLD {
        clmul::clmul_slice(a, b, out);
        return;
    }

    let lo = n / 2;
    let hi = n - lo;
    let (a0, a1) = a.split_at(lo);
    let (b0, b1) = b.split_at(lo);

    let mut z0 = vec![0u64; 2 * lo];
    let mut z2 = vec![0u64; 2 * hi];
    karatsuba(a0, b0, &mut z0);
    karatsuba(a1, b1, &mut z2);

    // (a0 + a1)(b0 + b1), the high halves being at least as long as the low ones.
    let mut sa = a1.to_vec();
    let mut sb = b1.to_vec();
    sa.iter_mut().zip(a0).for_each(|(s, x)| *s ^= x);
    sb.iter_mut().zip(b0).for_each(|(s, x)| *s ^= x);

    let mut z1 = vec![0u64; 2 * hi];
    karatsuba(&sa, &sb, &mut z1);
    z1.iter_mut().zip(&z0).for_each(|(m, x)| *m ^= x);
    z1.iter_mut().zip(&z2).for_each(|(m, x)| *m ^= x);

    out[..2 * lo].copy_from_slice(&z0);
    out[2 * lo..].copy_from_slice(&z2);
    out[lo..lo + 2 * hi]
        .iter_mut()
        .zip(&z1)
        .for_each(|(o, x)| *o ^= x);
}
