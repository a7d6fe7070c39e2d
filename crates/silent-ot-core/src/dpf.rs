//! Two-party distributed point function.
//!
//! A GGM tree with one control bit per node and early termination: each leaf expands into
//! a group of `group_size` blocks, so a tree with `depth - 1` levels below the root covers
//! `group_size * 2^(depth - 1)` blocks. Expanding both keys and XORing the results gives a
//! vector that is `beta` at `alpha` and zero everywhere else.
//!
//! The tree PRG is the fixed-key TCCR hash. Its tweaks carry the domain separator in the high
//! word and the child index in the low word: `0` and `1` for the tree children, `2..2 + g` for
//! the leaf group.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use silent_core::{aes::FIXED_KEY_AES, Block};

use crate::Error;

/// One party's DPF key.
///
/// Deserialized keys are checked for a consistent shape, see [`DpfKey::validate`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawDpfKey")]
pub struct DpfKey {
    domain: u64,
    group_size: usize,
    root: Block,
    party: bool,
    seed_cws: Vec<Block>,
    bit_cws: Vec<[bool; 2]>,
    group_cw: Vec<Block>,
}

opaque_debug::implement!(DpfKey);

#[derive(Deserialize)]
struct RawDpfKey {
    domain: u64,
    group_size: usize,
    root: Block,
    party: bool,
    seed_cws: Vec<Block>,
    bit_cws: Vec<[bool; 2]>,
    group_cw: Vec<Block>,
}

impl TryFrom<RawDpfKey> for DpfKey {
    type Error = Error;

    fn try_from(raw: RawDpfKey) -> Result<Self, Self::Error> {
        let key = DpfKey {
            domain: raw.domain,
            group_size: raw.group_size,
            root: raw.root,
            party: raw.party,
            seed_cws: raw.seed_cws,
            bit_cws: raw.bit_cws,
            group_cw: raw.group_cw,
        };
        key.validate()?;
        Ok(key)
    }
}

/// Returns the number of blocks in a domain of `levels` tree levels, or `None` on overflow.
fn domain_size(levels: usize, group_size: usize) -> Option<usize> {
    u32::try_from(levels)
        .ok()
        .and_then(|levels| 1usize.checked_shl(levels))
        .and_then(|leaves| leaves.checked_mul(group_size))
}

#[inline]
fn tweak(domain: u64, index: u64) -> Block {
    Block::from_words([index, domain])
}

/// Expands `seed` into child `bit`, returning the child seed with its control bit split off.
#[inline]
fn child(domain: u64, seed: Block, bit: bool) -> (Block, bool) {
    let s = FIXED_KEY_AES.tccr(tweak(domain, u64::from(bit)), seed);
    (s.clear_lsb(), s.lsb())
}

fn group_tweaks(domain: u64, group_size: usize) -> Vec<Block> {
    (0..group_size as u64)
        .map(|j| tweak(domain, 2 + j))
        .collect()
}

/// Generates a pair of DPF keys for the point function `beta * e_alpha`.
///
/// # Arguments
///
/// * `alpha` - The point, in `[0, group_size * 2^(depth - 1))`.
/// * `beta` - The value at the point.
/// * `domain` - The domain separator, distinct for every key pair sharing a hash.
/// * `depth` - The tree depth, counting the root.
/// * `group_size` - The number of blocks in a leaf group.
/// * `rng` - The source of the root seeds.
pub fn key_gen<R: Rng + CryptoRng + ?Sized>(
    alpha: usize,
    beta: Block,
    domain: u64,
    depth: usize,
    group_size: usize,
    rng: &mut R,
) -> Result<(DpfKey, DpfKey), Error> {
    if depth == 0 || group_size == 0 {
        return Err(Error::parameter(format!(
            "DPF depth and group size must be non-zero, got {depth} and {group_size}"
        )));
    }

    let levels = depth - 1;
    let size = domain_size(levels, group_size)
        .ok_or_else(|| Error::parameter(format!("DPF domain of depth {depth} overflows")))?;

    if alpha >= size {
        return Err(Error::parameter(format!(
            "DPF point {alpha} is outside of the domain [0, {size})"
        )));
    }

    let leaf = alpha / group_size;
    let offset = alpha % group_size;

    let root0 = rng.gen::<Block>().clear_lsb();
    let root1 = rng.gen::<Block>().clear_lsb();

    let (mut s0, mut t0) = (root0, false);
    let (mut s1, mut t1) = (root1, true);

    let mut seed_cws = Vec::with_capacity(levels);
    let mut bit_cws = Vec::with_capacity(levels);

    for level in 0..levels {
        let keep = (leaf >> (levels - 1 - level)) & 1 == 1;

        let c0 = [child(domain, s0, false), child(domain, s0, true)];
        let c1 = [child(domain, s1, false), child(domain, s1, true)];

        let lose = usize::from(!keep);
        let seed_cw = c0[lose].0 ^ c1[lose].0;
        let bit_cw = [
            c0[0].1 ^ c1[0].1 ^ keep ^ true,
            c0[1].1 ^ c1[1].1 ^ keep,
        ];

        let keep = usize::from(keep);
        let (ks0, kt0) = c0[keep];
        let (ks1, kt1) = c1[keep];

        s0 = if t0 { ks0 ^ seed_cw } else { ks0 };
        s1 = if t1 { ks1 ^ seed_cw } else { ks1 };
        t0 = kt0 ^ (t0 & bit_cw[keep]);
        t1 = kt1 ^ (t1 & bit_cw[keep]);

        seed_cws.push(seed_cw);
        bit_cws.push(bit_cw);
    }

    let tweaks = group_tweaks(domain, group_size);
    let mut g0 = vec![Block::ZERO; group_size];
    let mut g1 = vec![Block::ZERO; group_size];
    FIXED_KEY_AES.tccr_many(&tweaks, s0, &mut g0);
    FIXED_KEY_AES.tccr_many(&tweaks, s1, &mut g1);

    let mut group_cw: Vec<Block> = g0.iter().zip(&g1).map(|(&a, &b)| a ^ b).collect();
    group_cw[offset] ^= beta;

    let key = |root, party| DpfKey {
        domain,
        group_size,
        root,
        party,
        seed_cws: seed_cws.clone(),
        bit_cws: bit_cws.clone(),
        group_cw: group_cw.clone(),
    };

    Ok((key(root0, false), key(root1, true)))
}

impl DpfKey {
    /// Checks that the correction words agree with each other and that the domain fits in
    /// `usize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if the key is malformed.
    pub fn validate(&self) -> Result<(), Error> {
        let levels = self.seed_cws.len();

        if self.group_size == 0 || self.group_cw.len() != self.group_size {
            return Err(Error::parameter(format!(
                "DPF key has group size {} and {} group correction words",
                self.group_size,
                self.group_cw.len()
            )));
        }

        if self.bit_cws.len() != levels {
            return Err(Error::parameter(format!(
                "DPF key has {levels} seed correction words and {} bit correction words",
                self.bit_cws.len()
            )));
        }

        if domain_size(levels, self.group_size).is_none() {
            return Err(Error::parameter(format!(
                "DPF key domain of {levels} levels overflows"
            )));
        }

        Ok(())
    }

    /// Returns the tree depth, counting the root.
    pub fn depth(&self) -> usize {
        self.seed_cws.len() + 1
    }

    /// Returns the domain separator.
    pub fn domain(&self) -> u64 {
        self.domain
    }

    /// Returns the number of blocks in a leaf group.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Returns the number of leaves, or zero if the key is malformed.
    pub fn leaves(&self) -> usize {
        domain_size(self.seed_cws.len(), 1).unwrap_or(0)
    }

    /// Returns the number of blocks in the domain, or zero if the key is malformed.
    pub fn domain_size(&self) -> usize {
        domain_size(self.seed_cws.len(), self.group_size).unwrap_or(0)
    }

    #[inline]
    fn corrected_child(&self, level: usize, (seed, t): (Block, bool), bit: bool) -> (Block, bool) {
        let (s, tb) = child(self.domain, seed, bit);
        if t {
            (s ^ self.seed_cws[level], tb ^ self.bit_cws[level][usize::from(bit)])
        } else {
            (s, tb)
        }
    }

    #[inline]
    fn convert(&self, (seed, t): (Block, bool), tweaks: &[Block], out: &mut [Block]) {
        FIXED_KEY_AES.tccr_many(tweaks, seed, out);
        if t {
            out.iter_mut()
                .zip(&self.group_cw)
                .for_each(|(o, &cw)| *o ^= cw);
        }
    }

    /// Evaluates the group of leaf `leaf`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if the key is malformed or `leaf` is out of range.
    pub fn eval_group(&self, leaf: usize) -> Result<Vec<Block>, Error> {
        self.validate()?;
        if leaf >= self.leaves() {
            return Err(Error::parameter(format!(
                "leaf {leaf} is outside of a tree with {} leaves",
                self.leaves()
            )));
        }

        let levels = self.seed_cws.len();
        let node = (0..levels).fold((self.root, self.party), |node, level| {
            let bit = (leaf >> (levels - 1 - level)) & 1 == 1;
            self.corrected_child(level, node, bit)
        });

        let mut out = vec![Block::ZERO; self.group_size];
        self.convert(node, &group_tweaks(self.domain, self.group_size), &mut out);

        Ok(out)
    }

    /// Expands the whole domain.
    pub fn eval_full(&self) -> Vec<Block> {
        let mut eval = self.clone().into_eval();
        let mut out = vec![Block::ZERO; self.domain_size()];
        for group in out.chunks_exact_mut(self.group_size) {
            eval.next_into(group);
        }
        out
    }

    /// Returns a lazy evaluator over the leaf groups, in leaf order.
    pub fn into_eval(self) -> DpfEval {
        let levels = self.seed_cws.len();
        DpfEval {
            tweaks: group_tweaks(self.domain, self.group_size),
            path: vec![(self.root, self.party); levels + 1],
            next: 0,
            key: self,
        }
    }
}

#[cfg(test)]
impl DpfKey {
    pub(crate) fn correction_words_mut(&mut self) -> (&mut Vec<Block>, &mut Vec<[bool; 2]>) {
        (&mut self.seed_cws, &mut self.bit_cws)
    }
}

/// Lazy evaluation of a [`DpfKey`], one leaf group at a time.
///
/// Keeps the path from the root to the last evaluated leaf, so moving to the next leaf only
/// recomputes the nodes below the lowest common ancestor.
pub struct DpfEval {
    key: DpfKey,
    tweaks: Vec<Block>,
    // path[i] is the node after i levels.
    path: Vec<(Block, bool)>,
    next: usize,
}

opaque_debug::implement!(DpfEval);

impl DpfEval {
    /// Returns the number of groups left.
    pub fn remaining(&self) -> usize {
        self.key.leaves() - self.next
    }

    /// Writes the next leaf group into `out`, returning `false` once the tree is exhausted.
    ///
    /// `out` must hold [`DpfKey::group_size`] blocks.
    pub fn next_into(&mut self, out: &mut [Block]) -> bool {
        let leaf = self.next;
        if leaf >= self.key.leaves() {
            return false;
        }

        let levels = self.key.seed_cws.len();
        let from = if leaf == 0 {
            0
        } else {
            levels - 1 - leaf.trailing_zeros() as usize
        };

        for level in from..levels {
            let bit = (leaf >> (levels - 1 - level)) & 1 == 1;
            self.path[level + 1] = self.key.corrected_child(level, self.path[level], bit);
        }

        self.key.convert(self.path[levels], &self.tweaks, out);
        self.next += 1;

        true
    }
}

impl Iterator for DpfEval {
    type Item = Vec<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut out = vec![Block::ZERO; self.key.group_size];
        self.next_into(&mut out).then_some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl ExactSizeIterator for DpfEval {}
