//! Silent OT sender.
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use silent_core::{prg::Prg, Block};
use tracing::{debug, instrument};

use crate::{
    channel::Channel,
    compress::compress,
    dpf::{self, DpfKey},
    generator::Generator,
    matrix::BlockMatrix,
    params::GROUP_SIZE,
    Error, Params, ROTSenderOutput, SilentConfig, TransferId,
};

/// The key material the receiver needs for one batch.
///
/// Produced by [`Sender::setup`] and delivered to the receiver out of band, e.g. by a base OT
/// protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverSetup {
    pub(crate) count: usize,
    pub(crate) points: Vec<usize>,
    pub(crate) keys: Vec<DpfKey>,
}

impl ReceiverSetup {
    /// Returns the number of OTs the batch was set up for.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the secret point of each partition.
    pub fn points(&self) -> &[usize] {
        &self.points
    }
}

/// Silent OT sender.
#[derive(Debug)]
pub struct Sender<T: state::State = state::Initialized> {
    config: SilentConfig,
    state: T,
}

impl Sender {
    /// Creates a new Sender.
    ///
    /// # Arguments
    ///
    /// * `config` - The sender's configuration.
    /// * `seed` - The seed of the sender's randomness.
    pub fn new(config: SilentConfig, seed: Block) -> Self {
        Sender {
            config,
            state: state::Initialized {
                prg: Prg::from_seed(seed),
                id: TransferId::default(),
            },
        }
    }

    /// Returns the sender's configuration.
    pub fn config(&self) -> &SilentConfig {
        &self.config
    }

    /// Returns an independent sender, seeded from this sender's randomness.
    ///
    /// The two senders share no key material and may run on different threads.
    pub fn split(&mut self) -> Self {
        let seed = self.state.prg.random_block();
        Sender::new(self.config.clone(), seed)
    }

    /// Sets up a batch of `count` OTs.
    ///
    /// Samples the global correlation `delta` and a secret point in every partition, and
    /// generates one DPF key pair per partition. Returns the sender ready to expand the batch,
    /// and the receiver's half of the key material.
    #[instrument(level = "debug", fields(count = count), skip_all, err)]
    pub fn setup(mut self, count: usize) -> Result<(Sender<state::Setup>, ReceiverSetup), Error> {
        let params = Params::new(count, &self.config)?;

        let mut rng = Prg::from_seed(self.state.prg.random_block());
        rng.set_stream_id(count as u64);

        let delta = rng.random_block();

        let points: Vec<usize> = (0..params.partitions())
            .map(|_| rng.gen_range(0..params.size_per()))
            .collect();

        let (sender_keys, receiver_keys): (Vec<_>, Vec<_>) = points
            .iter()
            .enumerate()
            .map(|(p, &alpha)| {
                dpf::key_gen(
                    alpha,
                    delta,
                    p as u64,
                    params.depth(),
                    GROUP_SIZE,
                    &mut rng,
                )
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        debug!("key generation done");

        let generator = Generator::new(sender_keys, params.leaves())?;

        let Sender { config, state } = self;

        Ok((
            Sender {
                config,
                state: state::Setup {
                    prg: state.prg,
                    id: state.id,
                    params,
                    delta,
                    generator,
                },
            },
            ReceiverSetup {
                count,
                points,
                keys: receiver_keys,
            },
        ))
    }
}

impl Sender<state::Setup> {
    /// Returns the global correlation.
    pub fn delta(&self) -> Block {
        self.state.delta
    }

    /// Returns the batch parameters.
    pub fn params(&self) -> &Params {
        &self.state.params
    }

    /// Expands and compresses the batch.
    ///
    /// Sends the expanded vector to the receiver, the only message of the protocol, without
    /// waiting for it to be received. Returns the sender back in its initial state together
    /// with `n` message pairs satisfying `msgs[i][1] == msgs[i][0] ^ delta`.
    ///
    /// # Arguments
    ///
    /// * `channel` - The channel to the receiver.
    #[instrument(level = "debug", fields(count = self.state.params.count()), skip_all, err)]
    pub fn send<C: Channel + ?Sized>(
        self,
        channel: &mut C,
    ) -> Result<(Sender, ROTSenderOutput<[Block; 2]>), Error> {
        let Sender { config, state } = self;
        let state::Setup {
            prg,
            mut id,
            params,
            delta,
            generator,
        } = state;

        let r = generator.expand(params.n2())?;

        debug!("dpf expansion done");

        channel.send_blocks(&r)?;

        let rt = BlockMatrix::from_blocks(r, params.n2())?.transpose()?;

        debug!("transpose done");

        let msgs: Vec<[Block; 2]> = compress(config.mult_type(), &params, &rt)?
            .into_iter()
            .map(|m| [m, m ^ delta])
            .collect();

        debug!(n = msgs.len(), "output produced");

        let output = ROTSenderOutput {
            id: id.next_id(),
            msgs,
        };

        Ok((
            Sender {
                config,
                state: state::Initialized { prg, id },
            },
            output,
        ))
    }
}

/// The sender's state.
pub mod state {
    use super::*;

    mod sealed {
        pub trait Sealed {}

        impl Sealed for super::Initialized {}
        impl Sealed for super::Setup {}
    }

    /// The sender's state.
    pub trait State: sealed::Sealed {}

    /// The sender's initial state.
    pub struct Initialized {
        pub(super) prg: Prg,
        pub(super) id: TransferId,
    }

    impl State for Initialized {}

    opaque_debug::implement!(Initialized);

    /// The sender's state after the setup phase.
    ///
    /// In this state the sender holds the key material of exactly one batch.
    pub struct Setup {
        pub(super) prg: Prg,
        pub(super) id: TransferId,
        pub(super) params: Params,
        /// Sender's global secret.
        pub(super) delta: Block,
        pub(super) generator: Generator,
    }

    impl State for Setup {}

    opaque_debug::implement!(Setup);
}
