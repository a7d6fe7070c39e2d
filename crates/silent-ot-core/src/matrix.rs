//! Dense block matrices and their bit transpose.

use matrix_transpose::transpose_bits;
use silent_core::Block;

use crate::Error;

/// A row-major matrix of blocks.
///
/// As a bit matrix, row `r` has `128 * cols` columns and bit `c` of the row is bit `c % 128`
/// of block `(r, c / 128)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Block>,
}

impl BlockMatrix {
    /// Creates a zeroed matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Block::ZERO; rows * cols],
        }
    }

    /// Creates a matrix with `rows` rows from row-major data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if `rows` is zero or does not divide `data.len()`.
    pub fn from_blocks(data: Vec<Block>, rows: usize) -> Result<Self, Error> {
        if rows == 0 || data.len() % rows != 0 {
            return Err(Error::parameter(format!(
                "{} blocks cannot be split into {rows} rows",
                data.len()
            )));
        }

        Ok(Self {
            rows,
            cols: data.len() / rows,
            data,
        })
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of block columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.rows()`.
    pub fn row(&self, i: usize) -> &[Block] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Returns row `i` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.rows()`.
    pub fn row_mut(&mut self, i: usize) -> &mut [Block] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Returns the rows as mutable slices.
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, Block> {
        self.data.chunks_exact_mut(self.cols.max(1))
    }

    /// Returns the row-major data.
    pub fn as_blocks(&self) -> &[Block] {
        &self.data
    }

    /// Returns the row-major data by value.
    pub fn into_blocks(self) -> Vec<Block> {
        self.data
    }

    /// Returns the bit transpose of the matrix.
    ///
    /// A `rows x 128 * cols` bit matrix becomes a `128 * cols x rows` bit matrix, i.e. a block
    /// matrix with `128 * cols` rows and `rows / 128` columns: bit `b` of block `(r, c)` of the
    /// output is bit `r` of row `128 * c + b` of the input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parameter`] if the matrix is empty or `rows` is not a multiple of 128.
    pub fn transpose(&self) -> Result<BlockMatrix, Error> {
        if self.data.is_empty() || self.rows % Block::BITS != 0 {
            return Err(Error::parameter(format!(
                "cannot transpose a {} x {} block matrix, rows must be a non-zero multiple of 128",
                self.rows, self.cols
            )));
        }

        let bytes = transpose_bits(bytemuck::cast_slice(&self.data), self.rows)?;

        let mut data = vec![Block::ZERO; self.data.len()];
        bytemuck::cast_slice_mut::<Block, u8>(&mut data).copy_from_slice(&bytes);

        Ok(BlockMatrix {
            rows: Block::BITS * self.cols,
            cols: self.rows / Block::BITS,
            data,
        })
    }
}
