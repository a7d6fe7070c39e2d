//! Ideal 1-out-of-N OT extension.
//!
//! A trusted dealer hands both parties the same key. Encodings are keyed hashes of the index
//! and the choice word, so the sender can encode any choice while the receiver learns only the
//! encodings of what it chose. The state machine, the correction accounting and the message
//! flow are those of a real extension.

use silent_core::{prg::Prg, utils::derive_key, Block};

use super::{ExtensionState, NcoOtExtReceiver, NcoOtExtSender, NcoParams, HASH_OUTPUT_SIZE};
use crate::{
    channel::{Channel, TransportError},
    Error,
};

/// Returns a matched pair of ideal extensions, keyed by `seed`.
pub fn ideal_nco(seed: Block, params: NcoParams) -> (IdealNcoSender, IdealNcoReceiver) {
    let key = derive_key(seed);
    (
        IdealNcoSender {
            core: Core::new(key, params),
        },
        IdealNcoReceiver {
            core: Core::new(key, params),
            choices: Vec::new(),
        },
    )
}

/// State shared by both sides.
struct Core {
    key: [u8; 32],
    params: NcoParams,
    state: ExtensionState,
    splits: u64,
    batch_key: [u8; 32],
    count: usize,
    corrections: usize,
    transcript: blake3::Hasher,
}

impl Core {
    fn new(key: [u8; 32], params: NcoParams) -> Self {
        Self {
            key,
            params,
            state: ExtensionState::NoBaseOts,
            splits: 0,
            batch_key: [0; 32],
            count: 0,
            corrections: 0,
            transcript: blake3::Hasher::new(),
        }
    }

    fn set_base_ots(&mut self, len: usize) -> Result<(), Error> {
        if self.state != ExtensionState::NoBaseOts {
            return Err(Error::state("base OTs are already set"));
        }
        if len != self.params.base_ot_count {
            return Err(Error::parameter(format!(
                "expected {} base OTs, got {len}",
                self.params.base_ot_count
            )));
        }

        self.state = ExtensionState::HasBaseOts;
        Ok(())
    }

    fn split(&mut self) -> Result<Self, Error> {
        if self.state < ExtensionState::HasBaseOts {
            return Err(Error::state("cannot split an extension without base OTs"));
        }

        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"split");
        hasher.update(&self.splits.to_le_bytes());
        self.splits += 1;

        let mut child = Core::new(*hasher.finalize().as_bytes(), self.params);
        child.state = ExtensionState::HasBaseOts;

        Ok(child)
    }

    /// Exchanges nonces with the peer and derives the batch key.
    fn init<C: Channel + ?Sized>(
        &mut self,
        count: usize,
        prg: &mut Prg,
        channel: &mut C,
        is_sender: bool,
    ) -> Result<(), Error> {
        if !matches!(
            self.state,
            ExtensionState::HasBaseOts | ExtensionState::Terminal
        ) {
            return Err(Error::state(format!(
                "cannot initialize a batch in state {:?}",
                self.state
            )));
        }

        let nonce = prg.random_block();
        channel.send_blocks(&[nonce])?;
        let peer = recv_exact(channel, 1)?[0];

        let (first, second) = if is_sender {
            (nonce, peer)
        } else {
            (peer, nonce)
        };

        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"batch");
        hasher.update(first.as_bytes());
        hasher.update(second.as_bytes());
        self.batch_key = *hasher.finalize().as_bytes();

        self.count = count;
        self.corrections = 0;
        self.transcript = blake3::Hasher::new_keyed(&self.batch_key);
        self.state = ExtensionState::Initialized;

        Ok(())
    }

    fn ensure_batch(&self) -> Result<(), Error> {
        if !matches!(
            self.state,
            ExtensionState::Initialized | ExtensionState::PartiallyEncoded
        ) {
            return Err(Error::state(format!(
                "no batch in progress in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    /// Checks the shape of a correction batch and records it in the transcript.
    fn record_corrections(&mut self, corrections: &[Block], count: usize) -> Result<(), Error> {
        if self.corrections + count > self.count {
            return Err(Error::parameter(format!(
                "{count} more corrections exceed the batch of {}",
                self.count
            )));
        }

        self.transcript
            .update(bytemuck::cast_slice::<Block, u8>(corrections));
        self.corrections += count;
        self.state = ExtensionState::PartiallyEncoded;

        Ok(())
    }

    fn mask(&self, idx: usize, word: usize) -> Block {
        let mut hasher = blake3::Hasher::new_keyed(&self.batch_key);
        hasher.update(b"mask");
        hasher.update(&(idx as u64).to_le_bytes());
        hasher.update(&(word as u64).to_le_bytes());

        let mut block = [0u8; 16];
        block.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
        Block::new(block)
    }

    fn encode(&self, idx: usize, choice: &[Block], out: &mut [u8]) -> Result<(), Error> {
        if out.is_empty() || out.len() > HASH_OUTPUT_SIZE {
            return Err(Error::parameter(format!(
                "encoding size must be in [1, {HASH_OUTPUT_SIZE}], got {}",
                out.len()
            )));
        }
        if choice.len() != self.params.block_size {
            return Err(Error::parameter(format!(
                "choice must have {} blocks, got {}",
                self.params.block_size,
                choice.len()
            )));
        }

        let mut hasher = blake3::Hasher::new_keyed(&self.batch_key);
        hasher.update(b"encode");
        hasher.update(&(idx as u64).to_le_bytes());
        hasher.update(bytemuck::cast_slice::<Block, u8>(choice));

        out.copy_from_slice(&hasher.finalize().as_bytes()[..out.len()]);

        Ok(())
    }

    /// Exchanges transcript digests bound to `seed` and compares them.
    fn check<C: Channel + ?Sized>(&mut self, channel: &mut C, seed: Block) -> Result<(), Error> {
        self.ensure_batch()?;
        if self.corrections != self.count {
            return Err(Error::state(format!(
                "only {} of {} corrections were exchanged",
                self.corrections, self.count
            )));
        }

        let mut transcript = self.transcript.clone();
        transcript.update(b"check");
        transcript.update(seed.as_bytes());
        let digest = *transcript.finalize().as_bytes();

        channel.send_copy(&digest)?;
        let peer = channel.recv()?;

        self.state = ExtensionState::Terminal;

        if peer != digest {
            return Err(Error::security("transcript digests differ"));
        }

        Ok(())
    }
}

fn recv_exact<C: Channel + ?Sized>(channel: &mut C, len: usize) -> Result<Vec<Block>, Error> {
    let blocks = channel.recv_blocks()?;
    if blocks.len() != len {
        return Err(TransportError::Malformed(format!(
            "expected {len} blocks, got {}",
            blocks.len()
        ))
        .into());
    }
    Ok(blocks)
}

/// The sender of the ideal extension.
pub struct IdealNcoSender {
    core: Core,
}

opaque_debug::implement!(IdealNcoSender);

impl NcoOtExtSender for IdealNcoSender {
    fn state(&self) -> ExtensionState {
        self.core.state
    }

    fn set_base_ots(&mut self, base_ots: &[Block], choices: &[bool]) -> Result<(), Error> {
        if base_ots.len() != choices.len() {
            return Err(Error::parameter(format!(
                "got {} base OTs and {} choices",
                base_ots.len(),
                choices.len()
            )));
        }
        self.core.set_base_ots(base_ots.len())
    }

    fn split(&mut self) -> Result<Self, Error> {
        Ok(Self {
            core: self.core.split()?,
        })
    }

    fn init<C: Channel + ?Sized>(
        &mut self,
        count: usize,
        prg: &mut Prg,
        channel: &mut C,
    ) -> Result<(), Error> {
        self.core.init(count, prg, channel, true)
    }

    fn recv_correction<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        count: usize,
    ) -> Result<(), Error> {
        self.core.ensure_batch()?;
        let corrections = recv_exact(channel, count * self.core.params.block_size)?;
        self.core.record_corrections(&corrections, count)
    }

    fn encode(&self, idx: usize, choice: &[Block], out: &mut [u8]) -> Result<(), Error> {
        self.core.ensure_batch()?;
        if idx >= self.core.corrections {
            return Err(Error::state(format!(
                "cannot encode index {idx} after {} corrections",
                self.core.corrections
            )));
        }
        self.core.encode(idx, choice, out)
    }

    fn check<C: Channel + ?Sized>(&mut self, channel: &mut C, seed: Block) -> Result<(), Error> {
        self.core.check(channel, seed)
    }
}

/// The receiver of the ideal extension.
pub struct IdealNcoReceiver {
    core: Core,
    // The choice at every index of the batch, `None` until encoded.
    choices: Vec<Option<Vec<Block>>>,
}

opaque_debug::implement!(IdealNcoReceiver);

impl IdealNcoReceiver {
    fn record_choice(&mut self, idx: usize, choice: Vec<Block>) -> Result<(), Error> {
        self.core.ensure_batch()?;
        if idx >= self.core.count {
            return Err(Error::parameter(format!(
                "index {idx} is outside of the batch of {}",
                self.core.count
            )));
        }
        if idx < self.core.corrections {
            return Err(Error::state(format!(
                "the correction of index {idx} was already sent"
            )));
        }
        self.choices[idx] = Some(choice);
        Ok(())
    }
}

impl NcoOtExtReceiver for IdealNcoReceiver {
    fn state(&self) -> ExtensionState {
        self.core.state
    }

    fn set_base_ots(&mut self, base_ots: &[[Block; 2]]) -> Result<(), Error> {
        self.core.set_base_ots(base_ots.len())
    }

    fn split(&mut self) -> Result<Self, Error> {
        Ok(Self {
            core: self.core.split()?,
            choices: Vec::new(),
        })
    }

    fn init<C: Channel + ?Sized>(
        &mut self,
        count: usize,
        prg: &mut Prg,
        channel: &mut C,
    ) -> Result<(), Error> {
        self.core.init(count, prg, channel, false)?;
        self.choices = vec![None; count];
        Ok(())
    }

    fn encode(&mut self, idx: usize, choice: &[Block], out: &mut [u8]) -> Result<(), Error> {
        self.core.ensure_batch()?;
        self.core.encode(idx, choice, out)?;
        self.record_choice(idx, choice.to_vec())
    }

    fn zero_encode(&mut self, idx: usize) -> Result<(), Error> {
        self.record_choice(idx, vec![Block::ZERO; self.core.params.block_size])
    }

    fn send_correction<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        count: usize,
    ) -> Result<(), Error> {
        self.core.ensure_batch()?;

        let start = self.core.corrections;
        let end = start + count;
        if end > self.core.count {
            return Err(Error::parameter(format!(
                "{count} more corrections exceed the batch of {}",
                self.core.count
            )));
        }

        let mut corrections = Vec::with_capacity(count * self.core.params.block_size);
        for idx in start..end {
            let Some(choice) = &self.choices[idx] else {
                return Err(Error::state(format!("index {idx} was not encoded")));
            };
            corrections.extend(
                choice
                    .iter()
                    .enumerate()
                    .map(|(word, &c)| c ^ self.core.mask(idx, word)),
            );
        }

        channel.send_blocks(&corrections)?;
        self.core.record_corrections(&corrections, count)
    }

    fn check<C: Channel + ?Sized>(&mut self, channel: &mut C, seed: Block) -> Result<(), Error> {
        self.core.check(channel, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel::duplex, nco::get_params};
    use rand::SeedableRng;

    fn params() -> NcoParams {
        get_params(false, 128, 40, 76, 0)
    }

    fn keyed_pair() -> (IdealNcoSender, IdealNcoReceiver) {
        let params = params();
        let (mut sender, mut receiver) = ideal_nco(Block::ONE, params);
        sender
            .set_base_ots(
                &vec![Block::ZERO; params.base_ot_count],
                &vec![false; params.base_ot_count],
            )
            .unwrap();
        receiver
            .set_base_ots(&vec![[Block::ZERO; 2]; params.base_ot_count])
            .unwrap();
        (sender, receiver)
    }

    fn init_pair(
        sender: &mut IdealNcoSender,
        receiver: &mut IdealNcoReceiver,
        count: usize,
    ) -> (crate::channel::MemoryChannel, crate::channel::MemoryChannel) {
        let (mut a, mut b) = duplex();
        std::thread::scope(|s| {
            s.spawn(|| {
                sender
                    .init(count, &mut Prg::from_seed(Block::ZERO), &mut a)
                    .unwrap()
            });
            receiver
                .init(count, &mut Prg::from_seed(Block::ONES), &mut b)
                .unwrap();
        });
        (a, b)
    }

    fn check_pair(
        sender: &mut IdealNcoSender,
        receiver: &mut IdealNcoReceiver,
        a: &mut crate::channel::MemoryChannel,
        b: &mut crate::channel::MemoryChannel,
        seeds: (Block, Block),
    ) -> (Result<(), Error>, Result<(), Error>) {
        std::thread::scope(|s| {
            let handle = s.spawn(|| sender.check(a, seeds.0));
            let receiver_result = receiver.check(b, seeds.1);
            (handle.join().unwrap(), receiver_result)
        })
    }

    #[test]
    fn test_ideal_nco() {
        let (mut sender, mut receiver) = keyed_pair();
        assert!(sender.has_base_ots() && receiver.has_base_ots());

        let count = 10;
        let (mut a, mut b) = init_pair(&mut sender, &mut receiver, count);

        let mut received = Vec::new();
        for idx in 0..count {
            let choice = [Block::from(idx as u128 % 3)];
            let mut out = [0u8; 16];
            if idx == 7 {
                receiver.zero_encode(idx).unwrap();
            } else {
                receiver.encode(idx, &choice, &mut out).unwrap();
            }
            received.push((choice, out));

            if idx == 4 {
                receiver.send_correction(&mut b, 5).unwrap();
                sender.recv_correction(&mut a, 5).unwrap();
            }
        }
        receiver.send_correction(&mut b, 5).unwrap();
        sender.recv_correction(&mut a, 5).unwrap();
        assert_eq!(sender.state(), ExtensionState::PartiallyEncoded);

        for (idx, (choice, out)) in received.iter().enumerate() {
            if idx == 7 {
                continue;
            }
            let mut expected = [0u8; 16];
            sender.encode(idx, choice, &mut expected).unwrap();
            assert_eq!(&expected, out);

            let mut other = [0u8; 16];
            sender
                .encode(idx, &[choice[0] ^ Block::ONES], &mut other)
                .unwrap();
            assert_ne!(&other, out);
        }

        let seed = Block::from(42u128);
        let (sender_result, receiver_result) =
            check_pair(&mut sender, &mut receiver, &mut a, &mut b, (seed, seed));
        sender_result.unwrap();
        receiver_result.unwrap();
        assert_eq!(sender.state(), ExtensionState::Terminal);
        assert_eq!(receiver.state(), ExtensionState::Terminal);
    }

    #[test]
    fn test_check_detects_mismatch() {
        let (mut sender, mut receiver) = keyed_pair();
        let (mut a, mut b) = init_pair(&mut sender, &mut receiver, 1);

        receiver.zero_encode(0).unwrap();
        receiver.send_correction(&mut b, 1).unwrap();
        sender.recv_correction(&mut a, 1).unwrap();

        let (sender_result, receiver_result) = check_pair(
            &mut sender,
            &mut receiver,
            &mut a,
            &mut b,
            (Block::ZERO, Block::ONE),
        );
        assert!(matches!(sender_result, Err(Error::SecurityCheck(_))));
        assert!(matches!(receiver_result, Err(Error::SecurityCheck(_))));
    }

    #[test]
    fn test_state_errors() {
        let params = params();
        let (mut sender, mut receiver) = ideal_nco(Block::ZERO, params);

        assert!(!sender.has_base_ots());
        assert!(matches!(sender.split(), Err(Error::State(_))));
        assert!(matches!(receiver.split(), Err(Error::State(_))));

        // Initializing a batch before the base OTs are set.
        let (mut a, mut b) = duplex();
        assert!(matches!(
            sender.init(1, &mut Prg::from_seed(Block::ZERO), &mut a),
            Err(Error::State(_))
        ));
        assert!(matches!(
            receiver.init(1, &mut Prg::from_seed(Block::ZERO), &mut b),
            Err(Error::State(_))
        ));
        assert_eq!(a.bytes_sent(), 0);
        assert_eq!(b.bytes_sent(), 0);

        let (mut sender, mut receiver) = keyed_pair();
        assert!(matches!(
            sender.set_base_ots(
                &vec![Block::ZERO; params.base_ot_count],
                &vec![false; params.base_ot_count]
            ),
            Err(Error::State(_))
        ));

        let mut out = [0u8; 8];
        assert!(matches!(
            sender.encode(0, &[Block::ZERO], &mut out),
            Err(Error::State(_))
        ));

        let (mut a, mut b) = init_pair(&mut sender, &mut receiver, 2);

        // Encoding before any correction is received.
        assert!(matches!(
            sender.encode(0, &[Block::ZERO], &mut out),
            Err(Error::State(_))
        ));
        // Encoding sizes outside of [1, 32].
        assert!(matches!(
            receiver.encode(0, &[Block::ZERO], &mut [0u8; 33]),
            Err(Error::Parameter(_))
        ));
        assert!(matches!(
            receiver.encode(0, &[Block::ZERO], &mut []),
            Err(Error::Parameter(_))
        ));
        // Sending the correction of an index that was not encoded.
        assert!(matches!(
            receiver.send_correction(&mut b, 1),
            Err(Error::State(_))
        ));

        receiver.encode(0, &[Block::ZERO], &mut out).unwrap();
        receiver.send_correction(&mut b, 1).unwrap();
        sender.recv_correction(&mut a, 1).unwrap();

        // Checking before every correction is exchanged.
        assert!(matches!(
            sender.check(&mut a, Block::ZERO),
            Err(Error::State(_))
        ));
        // Initializing twice.
        assert!(matches!(
            sender.init(1, &mut Prg::from_seed(Block::ZERO), &mut a),
            Err(Error::State(_))
        ));
    }

    #[test]
    fn test_split_instances_agree() {
        let (mut sender, mut receiver) = keyed_pair();
        let mut sender_child = sender.split().unwrap();
        let mut receiver_child = receiver.split().unwrap();
        assert!(sender_child.has_base_ots() && receiver_child.has_base_ots());

        let (_a, _b) = init_pair(&mut sender, &mut receiver, 1);
        let (mut a, mut b) = init_pair(&mut sender_child, &mut receiver_child, 1);

        let mut out = [0u8; 32];
        receiver_child.encode(0, &[Block::ONE], &mut out).unwrap();
        receiver_child.send_correction(&mut b, 1).unwrap();
        sender_child.recv_correction(&mut a, 1).unwrap();

        let mut expected = [0u8; 32];
        sender_child
            .encode(0, &[Block::ONE], &mut expected)
            .unwrap();
        assert_eq!(expected, out);
    }
}
