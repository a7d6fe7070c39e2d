//! Compression of the noisy vector with a public linear code.
//!
//! Both codes act on the transposed noisy vector, a `128 x n2 / 128` block matrix whose rows
//! are the 128 bit-slices of the vector, and apply the same GF(2)-linear map to every row.
//! The public randomness of either code is drawn from a [`Prg`](silent_core::prg::Prg) seeded
//! with the zero block, so both parties derive the same code.

pub mod naive;
pub mod quasi_cyclic;

use silent_core::Block;

use crate::{matrix::BlockMatrix, Error, MultType, Params};

/// Compresses the transposed noisy vector `rt` into `n` blocks.
///
/// # Errors
///
/// Returns [`Error::Parameter`] if `rt` is not a `128 x n2 / 128` matrix.
pub fn compress(
    mult_type: MultType,
    params: &Params,
    rt: &BlockMatrix,
) -> Result<Vec<Block>, Error> {
    if rt.rows() != Block::BITS || rt.cols() != params.n2_blocks() {
        return Err(Error::parameter(format!(
            "expected a 128 x {} matrix, got {} x {}",
            params.n2_blocks(),
            rt.rows(),
            rt.cols()
        )));
    }

    match mult_type {
        MultType::Naive => naive::compress(params, rt),
        MultType::QuasiCyclic => quasi_cyclic::compress(params, rt),
    }
}
