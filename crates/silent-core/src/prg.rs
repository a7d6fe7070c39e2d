//! AES-based PRG.

use std::collections::HashMap;

use crate::{aes::AesEncryptor, Block};
use rand::Rng;
use rand_core::{
    block::{BlockRng, BlockRngCore},
    CryptoRng, RngCore, SeedableRng,
};

/// Counter-mode AES keyed by the seed. Each output block encrypts `counter || stream_id`.
#[derive(Clone)]
struct PrgCore {
    aes: AesEncryptor,
    // Counter of every stream that has been switched away from.
    state: HashMap<u64, u64>,
    stream_id: u64,
    counter: u64,
}

impl BlockRngCore for PrgCore {
    type Item = u32;
    type Results = [u32; 4 * AesEncryptor::AES_BLOCK_COUNT];

    #[inline(always)]
    fn generate(&mut self, results: &mut Self::Results) {
        let mut states = [Block::ZERO; AesEncryptor::AES_BLOCK_COUNT];
        for state in states.iter_mut() {
            *state = Block::from_words([self.counter, self.stream_id]);
            self.counter += 1;
        }
        self.aes.encrypt_many_blocks(&mut states);
        *results = bytemuck::cast(states);
    }
}

impl SeedableRng for PrgCore {
    type Seed = Block;

    #[inline(always)]
    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            aes: AesEncryptor::new(seed),
            state: HashMap::default(),
            stream_id: 0,
            counter: 0,
        }
    }
}

impl CryptoRng for PrgCore {}

/// AES-based PRG.
///
/// Output is a deterministic function of the seed, so two processes seeded identically
/// produce bit-identical streams.
///
/// # Stream ID
///
/// The PRG can be switched between independent streams under the same seed, see
/// [`Prg::set_stream_id`]. Switching back to a stream resumes where it left off.
#[derive(Clone)]
pub struct Prg(BlockRng<PrgCore>);

opaque_debug::implement!(Prg);

impl RngCore for Prg {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    #[inline(always)]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    #[inline(always)]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl SeedableRng for Prg {
    type Seed = Block;

    #[inline(always)]
    fn from_seed(seed: Self::Seed) -> Self {
        Prg(BlockRng::<PrgCore>::from_seed(seed))
    }

    #[inline(always)]
    fn from_rng<R: RngCore>(rng: R) -> Result<Self, rand_core::Error> {
        BlockRng::<PrgCore>::from_rng(rng).map(Prg)
    }
}

impl CryptoRng for Prg {}

impl Prg {
    /// New Prg with random seed.
    #[inline(always)]
    pub fn new() -> Self {
        Prg::from_seed(rand::random::<Block>())
    }

    /// Returns the counter of the current stream.
    pub fn counter(&self) -> u64 {
        self.0.core.counter
    }

    /// Returns the stream id.
    pub fn stream_id(&self) -> u64 {
        self.0.core.stream_id
    }

    /// Sets the stream id.
    ///
    /// Any buffered output of the previous stream is discarded.
    pub fn set_stream_id(&mut self, stream_id: u64) {
        let core = &mut self.0.core;
        core.state.insert(core.stream_id, core.counter);

        core.counter = core.state.get(&stream_id).copied().unwrap_or(0);
        core.stream_id = stream_id;

        self.0.reset();
    }

    /// Generate a random `u64`.
    #[inline(always)]
    pub fn random_u64(&mut self) -> u64 {
        self.next_u64()
    }

    /// Fill a byte slice with random values.
    #[inline(always)]
    pub fn random_bytes(&mut self, buf: &mut [u8]) {
        self.fill_bytes(buf);
    }

    /// Generate a random block.
    #[inline(always)]
    pub fn random_block(&mut self) -> Block {
        self.gen()
    }

    /// Fill a block slice with random block values.
    #[inline(always)]
    pub fn random_blocks(&mut self, buf: &mut [Block]) {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buf);
        self.fill_bytes(bytes);
    }
}

impl Default for Prg {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}
