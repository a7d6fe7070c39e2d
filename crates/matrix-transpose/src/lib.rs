//! Transposition of dense bit matrices.
//!
//! A matrix with `rows` rows is stored row-major, each row packed into `row_bytes` bytes.
//! Bit `b` of byte `k` in a row is the element in column `8 * k + b` (LSB-first).

#![deny(
    unsafe_code,
    missing_docs,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all
)]

/// Errors that can occur when transposing a bit matrix.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TransposeError {
    #[error("number of rows must be a non-zero multiple of 8, got {0}")]
    InvalidNumberOfRows(usize),
    #[error("matrix of {len} bytes cannot be split into {rows} rows of non-zero length")]
    MalformedMatrix { len: usize, rows: usize },
}

/// Transposes a bit matrix with `rows` rows.
///
/// Returns a matrix with `8 * matrix.len() / rows` rows of `rows / 8` bytes each, such that
/// element `(r, c)` of the input is element `(c, r)` of the output.
pub fn transpose_bits(matrix: &[u8], rows: usize) -> Result<Vec<u8>, TransposeError> {
    if rows == 0 || rows % 8 != 0 {
        return Err(TransposeError::InvalidNumberOfRows(rows));
    }

    if matrix.is_empty() || matrix.len() % rows != 0 {
        return Err(TransposeError::MalformedMatrix {
            len: matrix.len(),
            rows,
        });
    }

    let row_bytes = matrix.len() / rows;
    let out_row_bytes = rows / 8;
    let mut out = vec![0u8; matrix.len()];

    for tile_row in 0..out_row_bytes {
        for col_byte in 0..row_bytes {
            // Gather an 8x8 tile, row `k` of the tile in byte `k`.
            let mut x = 0u64;
            for k in 0..8 {
                x |= (matrix[(8 * tile_row + k) * row_bytes + col_byte] as u64) << (8 * k);
            }

            let x = transpose_8x8(x);

            for k in 0..8 {
                out[(8 * col_byte + k) * out_row_bytes + tile_row] = (x >> (8 * k)) as u8;
            }
        }
    }

    Ok(out)
}

/// Transposes an 8x8 bit matrix, where bit `8 * r + c` holds element `(r, c)`.
#[inline]
fn transpose_8x8(mut x: u64) -> u64 {
    let mut t = (x ^ (x >> 7)) & 0x00AA_00AA_00AA_00AA;
    x ^= t ^ (t << 7);
    t = (x ^ (x >> 14)) & 0x0000_CCCC_0000_CCCC;
    x ^= t ^ (t << 14);
    t = (x ^ (x >> 28)) & 0x0000_0000_F0F0_F0F0;
    x ^= t ^ (t << 28);
    x
}
