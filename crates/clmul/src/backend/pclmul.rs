#![allow(unsafe_code)]

use core::arch::x86_64::{__m128i, _mm_clmulepi64_si128, _mm_set_epi64x};

/// Hardware carry-less multiplication.
///
/// Only called after `pclmulqdq` support has been detected.
#[inline]
pub(super) fn clmul64(a: u64, b: u64) -> u128 {
    // SAFETY: the caller has checked for `pclmulqdq` and `sse2` support.
    unsafe { clmul64_inner(a, b) }
}

#[target_feature(enable = "pclmulqdq", enable = "sse2")]
unsafe fn clmul64_inner(a: u64, b: u64) -> u128 {
    let a = _mm_set_epi64x(0, a as i64);
    let b = _mm_set_epi64x(0, b as i64);
    let r: __m128i = _mm_clmulepi64_si128(a, b, 0x00);
    core::mem::transmute::<__m128i, u128>(r)
}
