//! Code and partition parameters.

use serde::{Deserialize, Serialize};

use crate::{generator::noise_index, Error, SilentConfig};

/// Number of blocks in a DPF leaf group.
pub const GROUP_SIZE: usize = 8;

/// Parameters of one silent OT batch.
///
/// Derived from the requested count `count`:
///
/// * `prime` is the least prime `>= count`,
/// * `n` is `prime` rounded up to a multiple of 128,
/// * `n2` is `n * scaler`, the length of the noisy vector,
/// * `size_per` is `ceil(n2 / partitions)`, the domain of each partition's DPF.
///
/// The partitions must interleave into the noisy vector, so that every possible point of
/// every partition is a position below `n2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    count: usize,
    prime: usize,
    n: usize,
    n2: usize,
    scaler: usize,
    partitions: usize,
    size_per: usize,
    depth: usize,
}

impl Params {
    /// Derives the parameters for `count` OTs.
    pub fn new(count: usize, config: &SilentConfig) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::parameter("count must be non-zero"));
        }

        let prime = next_prime(count)
            .ok_or_else(|| Error::parameter(format!("no prime >= {count} fits in usize")))?;
        let n = prime
            .checked_next_multiple_of(128)
            .ok_or_else(|| Error::parameter("padded code length overflows"))?;
        let n2 = n
            .checked_mul(config.scaler())
            .ok_or_else(|| Error::parameter("noisy vector length overflows"))?;

        let partitions = config.partitions();
        let size_per = n2.div_ceil(partitions);
        let depth = log2_ceil(size_per.div_ceil(GROUP_SIZE)) + 1;

        // Every partition's point must land inside the noisy vector.
        let last = noise_index(size_per - 1, partitions - 1, partitions, GROUP_SIZE);
        if last >= n2 {
            return Err(Error::parameter(format!(
                "{partitions} partitions of {size_per} blocks do not interleave into {n2} blocks"
            )));
        }

        Ok(Self {
            count,
            prime,
            n,
            n2,
            scaler: config.scaler(),
            partitions,
            size_per,
            depth,
        })
    }

    /// Returns the requested number of OTs.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the prime modulus degree, `mP`.
    pub fn prime(&self) -> usize {
        self.prime
    }

    /// Returns the padded output length, `mN`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the noisy vector length, `mN2`.
    pub fn n2(&self) -> usize {
        self.n2
    }

    /// Returns the scaler, `mN2 / mN`.
    pub fn scaler(&self) -> usize {
        self.scaler
    }

    /// Returns the number of partitions.
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Returns the DPF domain size of each partition, `mSizePer`.
    pub fn size_per(&self) -> usize {
        self.size_per
    }

    /// Returns the DPF tree depth, counting the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the number of leaf groups evaluated per partition.
    pub fn leaves(&self) -> usize {
        self.size_per.div_ceil(GROUP_SIZE)
    }

    /// Returns `n / 128`.
    pub fn n_blocks(&self) -> usize {
        self.n / 128
    }

    /// Returns `n2 / 128`.
    pub fn n2_blocks(&self) -> usize {
        self.n2 / 128
    }
}

/// Returns `ceil(log2(x))`, with `log2_ceil(0) == log2_ceil(1) == 0`.
pub fn log2_ceil(x: usize) -> usize {
    if x <= 1 {
        0
    } else {
        (usize::BITS - (x - 1).leading_zeros()) as usize
    }
}

/// Returns whether `n` is prime.
pub fn is_prime(n: usize) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5usize;
    while i.checked_mul(i).is_some_and(|sq| sq <= n) {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Returns the least prime `>= n`, or `None` on overflow.
pub fn next_prime(n: usize) -> Option<usize> {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate = candidate.checked_add(1)?;
    }
    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(8, 3)]
    #[case(9, 4)]
    fn test_log2_ceil(#[case] x: usize, #[case] expected: usize) {
        assert_eq!(log2_ceil(x), expected);
    }

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(1), Some(2));
        assert_eq!(next_prime(2), Some(2));
        assert_eq!(next_prime(100), Some(101));
        assert_eq!(next_prime(127), Some(127));
        assert_eq!(next_prime(128), Some(131));
        assert_eq!(next_prime(1 << 20), Some(1_048_583));
        assert!(!is_prime(1));
        assert!(!is_prime(25));
        assert!(!is_prime(49));
        assert!(is_prime(7919));
    }

    #[test]
    fn test_params_n_100() {
        let config = SilentConfig::default();
        let params = Params::new(100, &config).unwrap();

        assert_eq!(params.prime(), 101);
        assert_eq!(params.n(), 128);
        assert_eq!(params.n2(), 128 * config.scaler());
        assert_eq!(params.n2() % 128, 0);
        assert_eq!(params.size_per(), 64);
        // 64 blocks is 8 groups, a tree with 3 levels below the root.
        assert_eq!(params.depth(), 4);
        assert_eq!(params.leaves(), 8);
    }

    #[rstest]
    #[case(1)]
    #[case(127)]
    #[case(129)]
    #[case(1000)]
    #[case(5003)]
    fn test_params_invariants(#[case] count: usize) {
        let config = SilentConfig::builder()
            .partitions(6)
            .scaler(3)
            .build()
            .unwrap();
        let params = Params::new(count, &config).unwrap();

        assert!(is_prime(params.prime()));
        assert!(params.prime() >= count);
        assert_eq!(params.n() % 128, 0);
        assert!(params.n() >= params.prime() && params.n() - params.prime() < 128);
        assert_eq!(params.n2(), 3 * params.n());
        assert!(params.size_per() * params.partitions() >= params.n2());
        assert!(GROUP_SIZE << (params.depth() - 1) >= params.size_per());
        assert!(
            noise_index(
                params.size_per() - 1,
                params.partitions() - 1,
                params.partitions(),
                GROUP_SIZE
            ) < params.n2()
        );
    }

    #[rstest]
    #[case(100, 1024, 1)]
    #[case(1, 5, 3)]
    #[case(1000, 5, 3)]
    #[case(5000, 7, 5)]
    fn test_params_rejects_partitions_past_n2(
        #[case] count: usize,
        #[case] partitions: usize,
        #[case] scaler: usize,
    ) {
        let config = SilentConfig::builder()
            .partitions(partitions)
            .scaler(scaler)
            .build()
            .unwrap();

        assert!(matches!(
            Params::new(count, &config),
            Err(Error::Parameter(_))
        ));
    }

    #[test]
    fn test_params_rejects_zero() {
        assert!(matches!(
            Params::new(0, &SilentConfig::default()),
            Err(Error::Parameter(_))
        ));
    }
}
