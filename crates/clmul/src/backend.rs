cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod pclmul;
        cpufeatures::new!(pclmul_cpuid, "pclmulqdq", "sse2");

        /// Carry-less multiplication of `a` and `b`.
        #[inline]
        pub fn clmul64(a: u64, b: u64) -> u128 {
            if pclmul_cpuid::get() {
                pclmul::clmul64(a, b)
            } else {
                soft::clmul64(a, b)
            }
        }
    } else {
        /// Carry-less multiplication of `a` and `b`.
        #[inline]
        pub fn clmul64(a: u64, b: u64) -> u128 {
            soft::clmul64(a, b)
        }
    }
}

mod soft {
    /// Constant-time shift-and-xor multiplication.
    #[inline]
    pub(super) fn clmul64(a: u64, b: u64) -> u128 {
        let a = a as u128;
        let mut r = 0u128;
        for i in 0..64 {
            let mask = 0u128.wrapping_sub(((b >> i) & 1) as u128);
            r ^= (a << i) & mask;
        }
        r
    }
}
