//! 1-out-of-N OT extension.
//!
//! Both parties move through the same states:
//!
//! ```text
//! NoBaseOts -> HasBaseOts -> Initialized -> PartiallyEncoded -> Terminal
//!    set_base_ots    init       corrections         check
//! ```
//!
//! The receiver encodes its choices (or marks indices as skipped with `zero_encode`) and sends
//! corrections for them in batches. The sender may encode index `i` under any choice once it
//! has received more than `i` corrections. A final `check` over the whole batch binds both
//! parties to the same transcript.

pub mod ideal;

use silent_core::{prg::Prg, Block};

use crate::{channel::Channel, Error};

/// The largest encoding size in bytes.
pub const HASH_OUTPUT_SIZE: usize = 32;

/// The state of one party of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionState {
    /// No base OTs have been set.
    NoBaseOts,
    /// Base OTs are set, no batch is in progress.
    HasBaseOts,
    /// A batch is initialized and no corrections have been exchanged.
    Initialized,
    /// Some corrections of the batch have been exchanged.
    PartiallyEncoded,
    /// The batch has been checked.
    Terminal,
}

/// Sizing of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NcoParams {
    /// Number of blocks in a choice word.
    pub block_size: usize,
    /// Number of base OTs to provide to `set_base_ots`.
    pub base_ot_count: usize,
}

/// Returns the sizing of an extension.
///
/// # Arguments
///
/// * `malicious` - Whether the extension must be secure against a malicious peer.
/// * `comp_sec_param` - The computational security parameter, in bits.
/// * `stat_sec_param` - The statistical security parameter, in bits.
/// * `input_bit_count` - The number of bits in a choice.
/// * `input_count` - The number of OTs, which does not affect the sizing.
pub fn get_params(
    malicious: bool,
    comp_sec_param: usize,
    stat_sec_param: usize,
    input_bit_count: usize,
    _input_count: usize,
) -> NcoParams {
    let block_size = input_bit_count.div_ceil(Block::BITS).max(1);

    let mut base_ot_count = (4 * comp_sec_param).next_multiple_of(128);
    if malicious {
        base_ot_count += stat_sec_param.next_multiple_of(128);
    }

    NcoParams {
        block_size,
        base_ot_count,
    }
}

/// The sender of a 1-out-of-N OT extension.
pub trait NcoOtExtSender: Sized {
    /// Returns the current state.
    fn state(&self) -> ExtensionState;

    /// Returns whether base OTs have been set.
    fn has_base_ots(&self) -> bool {
        self.state() >= ExtensionState::HasBaseOts
    }

    /// Returns the sizing of the extension, see [`get_params`].
    fn get_params(
        &self,
        malicious: bool,
        comp_sec_param: usize,
        stat_sec_param: usize,
        input_bit_count: usize,
        input_count: usize,
    ) -> NcoParams {
        get_params(
            malicious,
            comp_sec_param,
            stat_sec_param,
            input_bit_count,
            input_count,
        )
    }

    /// Sets the base OTs, received under `choices`.
    fn set_base_ots(&mut self, base_ots: &[Block], choices: &[bool]) -> Result<(), Error>;

    /// Returns an independent extension which needs no base OTs of its own.
    fn split(&mut self) -> Result<Self, Error>;

    /// Initializes a batch of `count` OTs.
    fn init<C: Channel + ?Sized>(
        &mut self,
        count: usize,
        prg: &mut Prg,
        channel: &mut C,
    ) -> Result<(), Error>;

    /// Receives the next `count` corrections.
    fn recv_correction<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        count: usize,
    ) -> Result<(), Error>;

    /// Writes the encoding of `choice` at index `idx` into `out`.
    ///
    /// `out` must hold between 1 and [`HASH_OUTPUT_SIZE`] bytes.
    fn encode(&self, idx: usize, choice: &[Block], out: &mut [u8]) -> Result<(), Error>;

    /// Checks the batch against the challenge `seed`.
    fn check<C: Channel + ?Sized>(&mut self, channel: &mut C, seed: Block) -> Result<(), Error>;
}

/// The receiver of a 1-out-of-N OT extension.
pub trait NcoOtExtReceiver: Sized {
    /// Returns the current state.
    fn state(&self) -> ExtensionState;

    /// Returns whether base OTs have been set.
    fn has_base_ots(&self) -> bool {
        self.state() >= ExtensionState::HasBaseOts
    }

    /// Returns the sizing of the extension, see [`get_params`].
    fn get_params(
        &self,
        malicious: bool,
        comp_sec_param: usize,
        stat_sec_param: usize,
        input_bit_count: usize,
        input_count: usize,
    ) -> NcoParams {
        get_params(
            malicious,
            comp_sec_param,
            stat_sec_param,
            input_bit_count,
            input_count,
        )
    }

    /// Sets the base OT message pairs.
    fn set_base_ots(&mut self, base_ots: &[[Block; 2]]) -> Result<(), Error>;

    /// Returns an independent extension which needs no base OTs of its own.
    fn split(&mut self) -> Result<Self, Error>;

    /// Initializes a batch of `count` OTs.
    fn init<C: Channel + ?Sized>(
        &mut self,
        count: usize,
        prg: &mut Prg,
        channel: &mut C,
    ) -> Result<(), Error>;

    /// Chooses `choice` at index `idx` and writes its encoding into `out`.
    ///
    /// `out` must hold between 1 and [`HASH_OUTPUT_SIZE`] bytes.
    fn encode(&mut self, idx: usize, choice: &[Block], out: &mut [u8]) -> Result<(), Error>;

    /// Marks index `idx` as skipped.
    fn zero_encode(&mut self, idx: usize) -> Result<(), Error>;

    /// Sends the corrections of the next `count` indices, which must all be encoded.
    fn send_correction<C: Channel + ?Sized>(
        &mut self,
        channel: &mut C,
        count: usize,
    ) -> Result<(), Error>;

    /// Checks the batch against the challenge `seed`.
    fn check<C: Channel + ?Sized>(&mut self, channel: &mut C, seed: Block) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(false, 128, 40, 76, 512, 1)]
    #[case(true, 128, 40, 76, 640, 1)]
    #[case(false, 80, 40, 128, 384, 1)]
    #[case(false, 128, 40, 129, 512, 2)]
    #[case(true, 128, 129, 0, 768, 1)]
    fn test_get_params(
        #[case] malicious: bool,
        #[case] comp: usize,
        #[case] stat: usize,
        #[case] bits: usize,
        #[case] base_ot_count: usize,
        #[case] block_size: usize,
    ) {
        assert_eq!(
            get_params(malicious, comp, stat, bits, 1 << 20),
            NcoParams {
                block_size,
                base_ot_count
            }
        );
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(ExtensionState::NoBaseOts < ExtensionState::HasBaseOts);
        assert!(ExtensionState::HasBaseOts < ExtensionState::Initialized);
        assert!(ExtensionState::Initialized < ExtensionState::PartiallyEncoded);
        assert!(ExtensionState::PartiallyEncoded < ExtensionState::Terminal);
    }
}
