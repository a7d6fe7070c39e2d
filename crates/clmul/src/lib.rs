//! Carry-less multiplication of 64-bit words.
//!
//! Uses the `pclmulqdq` instruction when the CPU supports it, detected once at runtime,
//! and falls back to a constant-time software implementation otherwise.

#![deny(missing_docs, unused_imports, unused_must_use, unreachable_pub, clippy::all)]

mod backend;

pub use backend::clmul64;

/// Multiplies two polynomials over GF(2) given as little-endian 64-bit words.
///
/// `out` must hold exactly `a.len() + b.len()` words and is overwritten.
///
/// # Panics
///
/// Panics if `out` has the wrong length.
pub fn clmul_slice(a: &[u64], b: &[u64], out: &mut [u64]) {
    assert_eq!(out.len(), a.len() + b.len(), "output length mismatch");

    out.iter_mut().for_each(|w| *w = 0);
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            let p = clmul64(x, y);
            out[i + j] ^= p as u64;
            out[i + j + 1] ^= (p >> 64) as u64;
        }
    }
}
