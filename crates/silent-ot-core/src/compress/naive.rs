//! Multiplication by a dense random matrix.
//!
//! Output `i` is the inner product of each row of the transposed noisy vector with column `i`
//! of a public random `n2 x n` bit matrix. Columns are regenerated one at a time and never
//! stored together. The cost is `O(n * n2)`, which only suits small batches and cross-checks.

use rand::SeedableRng;
use silent_core::{prg::Prg, Block};
use tracing::{debug, instrument};

use crate::{matrix::BlockMatrix, Error, Params};

/// Compresses the `128 x n2 / 128` matrix `rt` into `n` blocks.
#[instrument(level = "debug", fields(n = params.n()), skip_all, err)]
pub fn compress(params: &Params, rt: &BlockMatrix) -> Result<Vec<Block>, Error> {
    let mut prg = Prg::from_seed(Block::ZERO);
    let mut column = vec![Block::ZERO; rt.cols()];

    let out: Vec<Block> = (0..params.n())
        .map(|_| {
            prg.random_blocks(&mut column);
            mul_column(&column, rt)
        })
        .collect();

    debug!("naive multiplication done");

    Ok(out)
}

/// Returns the block whose bit `j` is the inner product of `column` with row `j` of `rt`.
fn mul_column(column: &[Block], rt: &BlockMatrix) -> Block {
    let mut out = 0u128;
    for j in 0..rt.rows() {
        let acc = column
            .iter()
            .zip(rt.row(j))
            .fold(Block::ZERO, |acc, (&c, &r)| acc ^ (c & r));
        out |= u128::from(acc.parity()) << j;
    }
    Block::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::tests::{random_rt, small_params};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_naive_matches_materialized_matrix() {
        let params = small_params(127);
        assert_eq!((params.prime(), params.n(), params.n2()), (127, 128, 256));

        let rt = random_rt(&params, 3);

        // The public matrix, one column of n2 bits per output.
        let mut prg = Prg::from_seed(Block::ZERO);
        let matrix: Vec<Vec<Block>> = (0..params.n())
            .map(|_| {
                let mut column = vec![Block::ZERO; params.n2_blocks()];
                prg.random_blocks(&mut column);
                column
            })
            .collect();

        let expected: Vec<Block> = matrix
            .iter()
            .map(|column| {
                let mut out = Block::ZERO;
                for j in 0..128 {
                    let mut bit = false;
                    for k in 0..params.n2() {
                        bit ^= column[k / 128].bit(k % 128) & rt.row(j)[k / 128].bit(k % 128);
                    }
                    if bit {
                        out ^= Block::from(1u128 << j);
                    }
                }
                out
            })
            .collect();

        assert_eq!(compress(&params, &rt).unwrap(), expected);
    }
}
