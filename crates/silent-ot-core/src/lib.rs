//! Low-level crate implementing silent oblivious transfer extension.
//!
//! A sender expands a small amount of distributed point function (DPF) key material into a
//! sparse pseudorandom vector, compresses it with a public linear code and obtains a large
//! batch of random 1-out-of-2 OTs correlated by a global `delta`.
//!
//! # ⚠️ Warning ⚠️
//!
//! Some implementations make assumptions about invariants which may not be checked if using these
//! low-level APIs naively. Failing to uphold these invariants may result in security vulnerabilities.
//!
//! USE AT YOUR OWN RISK.

#![deny(
    unsafe_code,
    missing_docs,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all
)]

use serde::{Deserialize, Serialize};

pub mod channel;
pub mod compress;
pub mod config;
pub mod dpf;
mod error;
pub mod generator;
pub mod kernels;
pub mod matrix;
pub mod nco;
pub mod params;
pub mod poly;
pub mod receiver;
pub mod sender;
#[cfg(any(test, feature = "test-utils"))]
pub mod test;

pub use config::{MultType, SilentConfig, SilentConfigBuilder, SilentConfigBuilderError};
pub use error::Error;
pub use params::Params;

/// An oblivious transfer identifier.
///
/// Multiple transfers may be batched together under the same transfer ID.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TransferId(u64);

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransferId({})", self.0)
    }
}

impl TransferId {
    /// Returns the current transfer ID, incrementing `self` in-place.
    pub fn next_id(&mut self) -> Self {
        let id = *self;
        self.0 += 1;
        id
    }
}

/// The output the sender receives from the ROT functionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ROTSenderOutput<T> {
    /// The transfer id.
    pub id: TransferId,
    /// The random message pairs.
    pub msgs: Vec<T>,
}

/// The output the receiver receives from the ROT functionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ROTReceiverOutput<T, U> {
    /// The transfer id.
    pub id: TransferId,
    /// The choice bits.
    pub choices: Vec<T>,
    /// The chosen messages.
    pub msgs: Vec<U>,
}
