//! Bit kernels over block slices.
//!
//! A slice of blocks is treated as one bit-string: bit `i` of the slice is bit `i % 128` of
//! block `i / 128`. Source and destination are separate borrows, so they never alias.

use silent_core::Block;

use crate::Error;

/// XORs `src`, right-shifted by `shift` bits as one bit-string, into `dest`.
///
/// For every bit `t` of the first `min(dest.len(), src.len())` blocks of `dest`,
/// `dest[t] ^= src[t + shift]`, where bits past the end of `src` read as zero. Blocks of
/// `dest` beyond `src.len()` are left untouched. A shift of zero is a plain XOR.
///
/// # Errors
///
/// Returns [`Error::Parameter`] if `shift > 127`.
pub fn bit_shift_xor(dest: &mut [Block], src: &[Block], shift: u8) -> Result<(), Error> {
    if shift > 127 {
        return Err(Error::parameter(format!(
            "bit shift must be in [0, 127], got {shift}"
        )));
    }

    let len = dest.len().min(src.len());

    if shift == 0 {
        dest[..len]
            .iter_mut()
            .zip(src)
            .for_each(|(d, &s)| *d ^= s);
        return Ok(());
    }

    let offset = usize::from(shift / 64);
    let r = u32::from(shift % 64);
    // Words past the end of `src` read as zero, so the trailing block never over-reads.
    let word = |k: usize| src.get(k / 2).map_or(0, |b| b.to_words()[k % 2]);

    for (i, d) in dest[..len].iter_mut().enumerate() {
        let mut out = [0u64; 2];
        for (j, o) in out.iter_mut().enumerate() {
            let k = 2 * i + j + offset;
            *o = if r == 0 {
                word(k)
            } else {
                (word(k) >> r) | (word(k + 1) << (64 - r))
            };
        }
        *d ^= Block::from_words(out);
    }

    Ok(())
}

/// Reduces the bit-string `src` modulo `x^p - 1` into `dest`.
///
/// Every length-`p` window of `src` is XORed onto the first one. Afterwards the low `p` bits
/// of `dest` hold the fold and every other bit of `dest` is zero.
///
/// # Errors
///
/// Returns [`Error::Parameter`] if `p == 0` or if `dest` or `src` is shorter than
/// `ceil(p / 128)` blocks.
pub fn modp(dest: &mut [Block], src: &[Block], p: usize) -> Result<(), Error> {
    if p == 0 {
        return Err(Error::parameter("modulus degree must be non-zero"));
    }

    let p_blocks = p.div_ceil(Block::BITS);
    let p_bytes = p.div_ceil(8);

    if dest.len() < p_blocks {
        return Err(Error::parameter(format!(
            "modp destination has {} blocks, need {p_blocks}",
            dest.len()
        )));
    }
    if src.len() < p_blocks {
        return Err(Error::parameter(format!(
            "modp source has {} blocks, need {p_blocks}",
            src.len()
        )));
    }

    let src_bits = src.len() * Block::BITS;
    let windows = src_bits.div_ceil(p);

    bytemuck::cast_slice_mut::<Block, u8>(dest)[..p_bytes]
        .copy_from_slice(&bytemuck::cast_slice::<Block, u8>(src)[..p_bytes]);

    for i in 1..windows {
        let begin = i * p;
        let end = (begin + p).min(src_bits);
        let window = &src[begin / Block::BITS..end.div_ceil(Block::BITS)];

        bit_shift_xor(dest, window, (begin % Block::BITS) as u8)?;
    }

    let dest_bytes = bytemuck::cast_slice_mut::<Block, u8>(dest);
    let offset = p % 8;
    if offset != 0 {
        dest_bytes[p / 8] &= (1u8 << offset) - 1;
    }
    dest_bytes[p_bytes..].fill(0);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rstest::*;
    use silent_core::prg::Prg;

    fn random_blocks(prg: &mut Prg, n: usize) -> Vec<Block> {
        let mut blocks = vec![Block::ZERO; n];
        prg.random_blocks(&mut blocks);
        blocks
    }

    fn get_bit(blocks: &[Block], i: usize) -> bool {
        blocks[i / 128].bit(i % 128)
    }

    fn flip_bit(blocks: &mut [Block], i: usize) {
        blocks[i / 128] ^= Block::from(1u128 << (i % 128));
    }

    fn reference_shift_xor(dest: &mut [Block], src: &[Block], shift: usize) {
        let len = dest.len().min(src.len());
        let src_bits = src.len() * 128;
        for t in 0..len * 128 {
            if t + shift < src_bits && get_bit(src, t + shift) {
                flip_bit(dest, t);
            }
        }
    }

    #[test]
    fn test_shift_zero_is_xor() {
        let mut prg = Prg::from_seed(Block::ONE);
        let src = random_blocks(&mut prg, 5);

        for dest_len in [3, 5, 8] {
            let dest = random_blocks(&mut prg, dest_len);
            let mut got = dest.clone();
            bit_shift_xor(&mut got, &src, 0).unwrap();

            let expected: Vec<Block> = dest
                .iter()
                .enumerate()
                .map(|(i, &d)| if i < src.len() { d ^ src[i] } else { d })
                .collect();
            assert_eq!(got, expected);
        }
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(17)]
    #[case(128)]
    fn test_bit_shift_xor_reference(#[case] len: usize) {
        let mut prg = Prg::from_seed(Block::from(len as u128));
        let src = random_blocks(&mut prg, len);
        let dest = random_blocks(&mut prg, len);

        for shift in 0..128u8 {
            let mut got = dest.clone();
            bit_shift_xor(&mut got, &src, shift).unwrap();

            let mut expected = dest.clone();
            reference_shift_xor(&mut expected, &src, shift as usize);

            assert_eq!(got, expected, "shift {shift}");
        }
    }

    #[test]
    fn test_bit_shift_xor_longer_dest() {
        let mut prg = Prg::from_seed(Block::ZERO);
        let src = random_blocks(&mut prg, 2);
        let dest = random_blocks(&mut prg, 4);

        for shift in [1u8, 63, 64, 65, 127] {
            let mut got = dest.clone();
            bit_shift_xor(&mut got, &src, shift).unwrap();

            let mut expected = dest.clone();
            reference_shift_xor(&mut expected, &src, shift as usize);

            assert_eq!(got, expected);
            assert_eq!(got[2..], dest[2..]);
        }
    }

    #[test]
    fn test_bit_shift_xor_rejects_large_shift() {
        let mut dest = vec![Block::ZERO; 2];
        assert!(matches!(
            bit_shift_xor(&mut dest, &[Block::ONES; 2], 128),
            Err(Error::Parameter(_))
        ));
    }

    #[test]
    fn test_bit_shift_xor_empty_src() {
        let mut dest = vec![Block::ONE; 2];
        bit_shift_xor(&mut dest, &[], 5).unwrap();
        assert_eq!(dest, vec![Block::ONE; 2]);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(7, 3)]
    #[case(101, 2)]
    #[case(127, 2)]
    #[case(127, 5)]
    #[case(131, 4)]
    #[case(257, 9)]
    fn test_modp_reference(#[case] p: usize, #[case] src_len: usize) {
        let mut prg = Prg::from_seed(Block::from((p * 1000 + src_len) as u128));
        let src = random_blocks(&mut prg, src_len);
        let dest_len = p.div_ceil(128) + 1;
        let mut dest = random_blocks(&mut prg, dest_len);

        modp(&mut dest, &src, p).unwrap();

        let src_bits = src_len * 128;
        for t in 0..p {
            let expected = (t..src_bits)
                .step_by(p)
                .fold(false, |acc, i| acc ^ get_bit(&src, i));
            assert_eq!(get_bit(&dest, t), expected, "bit {t}");
        }

        // Every bit past `p`, including the rest of the last byte, is cleared.
        for t in p..dest_len * 128 {
            assert!(!get_bit(&dest, t), "bit {t}");
        }
    }

    #[test]
    fn test_modp_rejects_short_buffers() {
        let src = vec![Block::ONES; 2];
        let mut dest = vec![Block::ZERO; 1];

        assert!(matches!(
            modp(&mut dest, &src, 129),
            Err(Error::Parameter(_))
        ));
        assert!(matches!(
            modp(&mut [Block::ZERO; 2], &src[..1], 129),
            Err(Error::Parameter(_))
        ));
        assert!(matches!(
            modp(&mut [Block::ZERO; 2], &src, 0),
            Err(Error::Parameter(_))
        ));
    }
}
