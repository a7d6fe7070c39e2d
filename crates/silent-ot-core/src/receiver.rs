//! Silent OT receiver.
use silent_core::Block;
use tracing::{debug, instrument};

use crate::{
    channel::{Channel, TransportError},
    compress::compress,
    generator::{noise_index, Generator},
    matrix::BlockMatrix,
    params::GROUP_SIZE,
    sender::ReceiverSetup,
    Error, Params, ROTReceiverOutput, SilentConfig, TransferId,
};

/// Silent OT receiver.
#[derive(Debug)]
pub struct Receiver<T: state::State = state::Initialized> {
    config: SilentConfig,
    state: T,
}

impl Receiver {
    /// Creates a new Receiver.
    pub fn new(config: SilentConfig) -> Self {
        Receiver {
            config,
            state: state::Initialized {
                id: TransferId::default(),
            },
        }
    }

    /// Sets up a batch of `count` OTs from the sender's key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if the key material is malformed or does not match
    /// `count` and the receiver's configuration.
    #[instrument(level = "debug", fields(count = count), skip_all, err)]
    pub fn setup(
        self,
        count: usize,
        setup: ReceiverSetup,
    ) -> Result<Receiver<state::Setup>, Error> {
        let params = Params::new(count, &self.config)?;
        let ReceiverSetup {
            count: setup_count,
            points,
            keys,
        } = setup;

        if setup_count != count {
            return Err(Error::parameter(format!(
                "key material is for {setup_count} OTs, expected {count}"
            )));
        }

        if points.len() != params.partitions() || keys.len() != params.partitions() {
            return Err(Error::parameter(format!(
                "expected key material for {} partitions, got {} points and {} keys",
                params.partitions(),
                points.len(),
                keys.len()
            )));
        }

        if let Some(&point) = points.iter().find(|&&p| p >= params.size_per()) {
            return Err(Error::parameter(format!(
                "point {point} is outside of the partition [0, {})",
                params.size_per()
            )));
        }

        for key in &keys {
            key.validate()?;
            if key.depth() != params.depth() || key.group_size() != GROUP_SIZE {
                return Err(Error::parameter(format!(
                    "expected DPF keys of depth {} with groups of {GROUP_SIZE}, got depth {} with groups of {}",
                    params.depth(),
                    key.depth(),
                    key.group_size()
                )));
            }
        }

        let mut noise: Vec<usize> = points
            .iter()
            .enumerate()
            .map(|(p, &alpha)| noise_index(alpha, p, params.partitions(), GROUP_SIZE))
            .collect();
        noise.sort_unstable();

        let generator = Generator::new(keys, params.leaves())?;

        Ok(Receiver {
            config: self.config,
            state: state::Setup {
                id: self.state.id,
                params,
                noise,
                generator,
            },
        })
    }
}

impl Receiver<state::Setup> {
    /// Returns the batch parameters.
    pub fn params(&self) -> &Params {
        &self.state.params
    }

    /// Returns the positions of the noisy vector carrying the correlation, in ascending order.
    pub fn noise(&self) -> &[usize] {
        &self.state.noise
    }

    /// Receives the sender's expanded vector and derives the receiver's outputs.
    ///
    /// Returns the receiver back in its initial state together with `n` choice bits and the
    /// chosen messages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the message is not exactly `n2` blocks and
    /// [`Error::SecurityCheck`] if it is inconsistent with the receiver's keys.
    #[instrument(level = "debug", fields(count = self.state.params.count()), skip_all, err)]
    pub fn receive<C: Channel + ?Sized>(
        self,
        channel: &mut C,
    ) -> Result<(Receiver, ROTReceiverOutput<bool, Block>), Error> {
        let Receiver { config, state } = self;
        let state::Setup {
            mut id,
            params,
            noise,
            generator,
        } = state;

        let r = channel.recv_blocks()?;
        if r.len() != params.n2() {
            return Err(TransportError::Malformed(format!(
                "expected {} blocks, got {}",
                params.n2(),
                r.len()
            ))
            .into());
        }

        let v = generator.expand(params.n2())?;

        debug!("dpf expansion done");

        check_correlation(&r, &v, &noise)?;

        debug!("consistency check done");

        let vt = BlockMatrix::from_blocks(v, params.n2())?.transpose()?;
        let msgs = compress(config.mult_type(), &params, &vt)?;

        let mut indicator = vec![Block::ZERO; params.n2()];
        for &i in &noise {
            indicator[i] = Block::ONE;
        }
        let indicator = BlockMatrix::from_blocks(indicator, params.n2())?.transpose()?;
        let choices: Vec<bool> = compress(config.mult_type(), &params, &indicator)?
            .iter()
            .map(Block::lsb)
            .collect();

        debug!(n = msgs.len(), "output produced");

        let output = ROTReceiverOutput {
            id: id.next_id(),
            choices,
            msgs,
        };

        Ok((
            Receiver {
                config,
                state: state::Initialized { id },
            },
            output,
        ))
    }
}

/// Checks that `r ^ v` is one nonzero value at the `noise` positions and zero elsewhere.
fn check_correlation(r: &[Block], v: &[Block], noise: &[usize]) -> Result<(), Error> {
    let mut correlation = None;
    let mut noise = noise.iter().peekable();

    for (i, (&a, &b)) in r.iter().zip(v).enumerate() {
        let d = a ^ b;
        if noise.next_if_eq(&&i).is_some() {
            match correlation {
                _ if d == Block::ZERO => {
                    return Err(Error::security(format!("no correlation at noise position {i}")))
                }
                Some(c) if c != d => {
                    return Err(Error::security(format!(
                        "inconsistent correlation at noise position {i}"
                    )))
                }
                _ => correlation = Some(d),
            }
        } else if d != Block::ZERO {
            return Err(Error::security(format!("unexpected correlation at position {i}")));
        }
    }

    Ok(())
}

/// The receiver's state.
pub mod state {
    use super::*;

    mod sealed {
        pub trait Sealed {}

        impl Sealed for super::Initialized {}
        impl Sealed for super::Setup {}
    }

    /// The receiver's state.
    pub trait State: sealed::Sealed {}

    /// The receiver's initial state.
    pub struct Initialized {
        pub(super) id: TransferId,
    }

    impl State for Initialized {}

    opaque_debug::implement!(Initialized);

    /// The receiver's state after the setup phase.
    pub struct Setup {
        pub(super) id: TransferId,
        pub(super) params: Params,
        /// Positions of the noisy vector carrying the correlation, sorted.
        pub(super) noise: Vec<usize>,
        pub(super) generator: Generator,
    }

    impl State for Setup {}

    opaque_debug::implement!(Setup);
}
