//! Interleaved expansion of the partition DPF keys.
//!
//! Each step evaluates the next leaf group of every partition and yields them back to back,
//! so the expanded vector is laid out leaf-major:
//!
//! ```text
//! | leaf 0: p0 p1 .. pP-1 | leaf 1: p0 p1 .. pP-1 | ...
//! ```
//!
//! where each `pi` is a group of `group_size` blocks.

use silent_core::Block;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    dpf::{DpfEval, DpfKey},
    Error,
};

/// Returns the position, in the expanded vector, of point `alpha` of partition `partition`.
pub fn noise_index(alpha: usize, partition: usize, partitions: usize, group_size: usize) -> usize {
    (alpha / group_size) * partitions * group_size + partition * group_size + alpha % group_size
}

/// A single-pass generator over the partition keys.
#[derive(Debug)]
pub struct Generator {
    evals: Vec<DpfEval>,
    group_size: usize,
    steps: usize,
    step: usize,
}

impl Generator {
    /// Creates a generator yielding the first `steps` leaf groups of every key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if there are no keys, if a key is malformed, if the keys
    /// disagree on their shape or if they have fewer than `steps` leaves.
    pub fn new(keys: Vec<DpfKey>, steps: usize) -> Result<Self, Error> {
        let Some(first) = keys.first() else {
            return Err(Error::parameter("generator needs at least one key"));
        };

        for key in &keys {
            key.validate()?;
        }

        let group_size = first.group_size();
        let leaves = first.leaves();

        if keys
            .iter()
            .any(|k| k.group_size() != group_size || k.leaves() != leaves)
        {
            return Err(Error::parameter("generator keys must share group size and depth"));
        }

        if steps > leaves {
            return Err(Error::parameter(format!(
                "cannot take {steps} leaves from trees with {leaves} leaves"
            )));
        }

        Ok(Self {
            evals: keys.into_iter().map(DpfKey::into_eval).collect(),
            group_size,
            steps,
            step: 0,
        })
    }

    /// Returns the number of blocks in each chunk.
    pub fn chunk_len(&self) -> usize {
        self.evals.len() * self.group_size
    }

    /// Returns the total number of blocks the generator yields.
    pub fn total_len(&self) -> usize {
        self.steps * self.chunk_len()
    }

    /// Drives the generator to completion, returning exactly `len` blocks.
    ///
    /// Output past `len` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if the generator yields fewer than `len` blocks.
    pub fn expand(self, len: usize) -> Result<Vec<Block>, Error> {
        let available = self.total_len() - self.step * self.chunk_len();
        if available < len {
            return Err(Error::parameter(format!(
                "generator yields {available} blocks, need {len}"
            )));
        }

        let mut out = Vec::with_capacity(len);
        for chunk in self {
            let take = (len - out.len()).min(chunk.len());
            out.extend_from_slice(&chunk[..take]);
            if out.len() == len {
                break;
            }
        }

        Ok(out)
    }
}

impl Iterator for Generator {
    type Item = Vec<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step == self.steps {
            return None;
        }

        let mut chunk = vec![Block::ZERO; self.chunk_len()];
        let group_size = self.group_size;

        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                let iter = chunk.par_chunks_exact_mut(group_size).zip(self.evals.par_iter_mut());
            } else {
                let iter = chunk.chunks_exact_mut(group_size).zip(self.evals.iter_mut());
            }
        }

        iter.for_each(|(group, eval)| {
            eval.next_into(group);
        });

        self.step += 1;

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.steps - self.step;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Generator {}
