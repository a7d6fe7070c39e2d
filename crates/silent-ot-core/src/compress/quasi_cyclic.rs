//! Multiplication by a quasi-cyclic matrix.
//!
//! Row `i` of the transposed noisy vector is split into `scaler` segments of `n` bits, each
//! read as a polynomial `b_{i,s}` of degree `< n`. With public random polynomials `a_s`, the
//! compressed row is
//!
//! ```text
//! c_i = sum_s a_s * b_{i,s}  mod (x^p - 1)
//! ```
//!
//! which is the product with a block-circulant generator matrix. Transposing the `128 x n / 128`
//! result back gives the `n` output blocks. Bits `[p, n)` of every row are zero after the
//! reduction, so the outputs at `[p, n)` are zero.

use rand::SeedableRng;
use silent_core::{prg::Prg, Block};
use tracing::{debug, instrument};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    kernels::modp,
    matrix::BlockMatrix,
    poly::{DecodeCache, Poly},
    Error, Params,
};

/// Compresses the `128 x n2 / 128` matrix `rt` into `n` blocks.
#[instrument(level = "debug", fields(n = params.n()), skip_all, err)]
pub fn compress(params: &Params, rt: &BlockMatrix) -> Result<Vec<Block>, Error> {
    let n_blocks = params.n_blocks();
    let rows = rt.rows();

    let mut prg = Prg::from_seed(Block::ZERO);
    let mut a = vec![Block::ZERO; n_blocks];
    let a_polys: Vec<Poly> = (0..params.scaler())
        .map(|_| {
            prg.random_blocks(&mut a);
            Poly::encode(&a)
        })
        .collect();

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let iter = (0..rows).into_par_iter();
        } else {
            let iter = 0..rows;
        }
    }

    let c: Vec<Poly> = iter
        .map(|i| {
            let row = rt.row(i);
            let mut segments = a_polys
                .iter()
                .zip(row.chunks_exact(n_blocks))
                .map(|(a, b)| (a, Poly::encode(b)));

            let mut c = match segments.next() {
                Some((a, b)) => Poly::mul(a, &b),
                None => Poly::default(),
            };
            for (a, mut b) in segments {
                b.mul_assign(a);
                c.add_assign(&b);
            }
            c
        })
        .collect();

    debug!("multiplication done");

    let mut c_mod_p = BlockMatrix::zeros(rows, n_blocks);
    let mut cache = DecodeCache::default();
    for (i, ci) in c.iter().enumerate() {
        let product = ci.decode(2 * n_blocks, &mut cache)?;
        modp(c_mod_p.row_mut(i), product, params.prime())?;
    }

    debug!("reduction done");

    Ok(c_mod_p.transpose()?.into_blocks())
}
