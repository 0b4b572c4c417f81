use std::cmp::min;

use crate::{
    error::{validation_error, Result},
    matrix::{get_unchecked, set_unchecked, Element},
    DEFAULT_TILE,
};

/// Tile extent used by the blocked kernel for all three dimensions.
///
/// The extent is a tuning value, not derived from the matrix size. Blocks at
/// the matrix edge are clipped to `min(block_start + tile, size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileConfig {
    tile: usize,
}

impl TileConfig {
    /// Creates a tile configuration. A zero extent is rejected.
    pub fn new(tile: usize) -> Result<Self> {
        if tile == 0 {
            return Err(validation_error("tile extent must be positive"));
        }
        Ok(TileConfig { tile })
    }

    #[inline]
    pub fn tile(&self) -> usize {
        self.tile
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        TileConfig { tile: DEFAULT_TILE }
    }
}

/// Computes `C[i][j] += sum_k A[i][k] * B[k][j]` for a contiguous range of rows of C.
///
/// `c_rows` holds whole rows of C starting at global row `first_row`, which
/// must be a multiple of the tile extent so that i-blocks line up with the
/// blocks of a full-matrix pass.
///
/// Loop order: i0 -> j0 -> k0 over blocks, then k -> i -> j inside a block
/// (j innermost, unit stride on B and C). For a fixed cell the k-sum is always
/// visited in ascending k, whatever the tile extent or row split.
///
/// # Panics
///
/// Panics if `size * size` overflows `usize`, if `a` or `b` hold fewer than
/// `size * size` elements, or if `c_rows` does not cover whole rows inside
/// the matrix.
pub fn multiply_row_blocks<T: Element>(
    a: &[T],
    b: &[T],
    c_rows: &mut [T],
    size: usize,
    tiles: TileConfig,
    first_row: usize,
) {
    let n = size.checked_mul(size).expect("size * size overflows usize");
    assert!(a.len() >= n && b.len() >= n, "A and B must hold {size}x{size} elements");
    assert!(
        size > 0 && c_rows.len() % size == 0,
        "C rows must be a whole number of rows of length {size}"
    );
    let last_row = first_row + c_rows.len() / size;
    assert!(last_row <= size, "rows {first_row}..{last_row} exceed size {size}");
    debug_assert_eq!(first_row % tiles.tile(), 0);

    let tile = tiles.tile();

    for i0 in (first_row..last_row).step_by(tile) {
        let i_end = min(i0 + tile, last_row);

        for j0 in (0..size).step_by(tile) {
            let j_end = min(j0 + tile, size);

            for k0 in (0..size).step_by(tile) {
                let k_end = min(k0 + tile, size);

                for k in k0..k_end {
                    for i in i0..i_end {
                        let local_i = i - first_row;
                        for j in j0..j_end {
                            // SAFETY: i < last_row <= size, j < size and k < size, and the
                            // asserts above guarantee A, B and c_rows cover those offsets.
                            unsafe {
                                let a_ik = get_unchecked(a, size, i, k);
                                let b_kj = get_unchecked(b, size, k, j);
                                let c_ij = get_unchecked(c_rows, size, local_i, j);
                                set_unchecked(c_rows, size, local_i, j, c_ij + a_ik * b_kj);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Runs the whole blocked loop nest on the calling thread.
///
/// # Panics
///
/// Same conditions as [`multiply_row_blocks`], plus `c` shorter than
/// `size * size`.
pub fn multiply_serial<T: Element>(a: &[T], b: &[T], c: &mut [T], size: usize, tiles: TileConfig) {
    let n = size.checked_mul(size).expect("size * size overflows usize");
    multiply_row_blocks(a, b, &mut c[..n], size, tiles, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    // C += A * B, row-major, textbook i-j-k order.
    fn naive_matmul(a: &[f64], b: &[f64], c: &mut [f64], size: usize) {
        for i in 0..size {
            for j in 0..size {
                let mut acc = 0.0;
                for k in 0..size {
                    acc += a[i * size + k] * b[k * size + j];
                }
                c[i * size + j] += acc;
            }
        }
    }

    fn inputs(size: usize) -> (Vec<f64>, Vec<f64>) {
        let a = (0..size * size).map(|x| (x % 100) as f64 / 10.0).collect();
        let b = (0..size * size)
            .map(|x| ((x + 50) % 100) as f64 / 10.0)
            .collect();
        (a, b)
    }

    fn run_blocked_test(size: usize, tile: usize) {
        let (a, b) = inputs(size);
        let mut expected = vec![0.0; size * size];
        let mut c = vec![0.0; size * size];

        naive_matmul(&a, &b, &mut expected, size);
        multiply_serial(&a, &b, &mut c, size, TileConfig::new(tile).unwrap());

        for idx in 0..size * size {
            assert!(
                (c[idx] - expected[idx]).abs() <= 1e-9 * expected[idx].abs().max(1.0),
                "C[{}] mismatch: got {}, expected {} (size={}, tile={})",
                idx,
                c[idx],
                expected[idx],
                size,
                tile
            );
        }
    }

    #[test]
    fn test_tile_config_rejects_zero() {
        assert!(TileConfig::new(0).is_err());
        assert_eq!(TileConfig::new(7).unwrap().tile(), 7);
        assert_eq!(TileConfig::default().tile(), DEFAULT_TILE);
    }

    #[test]
    fn test_exact_multiple_of_tile() {
        run_blocked_test(64, 16);
    }

    #[test]
    fn test_partial_last_block() {
        run_blocked_test(37, 8);
        run_blocked_test(129, 32);
    }

    #[test]
    fn test_tile_larger_than_matrix() {
        run_blocked_test(20, 128);
    }

    #[test]
    fn test_unit_tile() {
        run_blocked_test(9, 1);
    }

    #[test]
    fn test_row_range_only_touches_its_rows() {
        let size = 10;
        let tiles = TileConfig::new(4).unwrap();
        let (a, b) = inputs(size);
        let mut c = vec![0.0; size * size];

        // Rows 4..8 form the second i-block.
        multiply_row_blocks(&a, &b, &mut c[4 * size..8 * size], size, tiles, 4);

        let mut expected = vec![0.0; size * size];
        naive_matmul(&a, &b, &mut expected, size);
        for i in 0..size {
            for j in 0..size {
                let got = c[i * size + j];
                if (4..8).contains(&i) {
                    assert!((got - expected[i * size + j]).abs() < 1e-9);
                } else {
                    assert_eq!(got, 0.0, "row {} was written", i);
                }
            }
        }
    }

    #[test]
    fn test_accumulates_into_existing_content() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let mut c = [1.0, 1.0, 1.0, 1.0];
        multiply_serial(&a, &b, &mut c, 2, TileConfig::new(1).unwrap());
        assert_eq!(c, [20.0, 23.0, 44.0, 51.0]);
    }

    #[test]
    fn test_f32_elements() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [5.0f32, 6.0, 7.0, 8.0];
        let mut c = [0.0f32; 4];
        multiply_serial(&a, &b, &mut c, 2, TileConfig::default());
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    #[should_panic(expected = "must hold")]
    fn test_short_input_panics() {
        let a = [1.0f64; 3];
        let b = [1.0f64; 4];
        let mut c = [0.0f64; 4];
        multiply_serial(&a, &b, &mut c, 2, TileConfig::default());
    }

    #[test]
    #[should_panic(expected = "overflows usize")]
    fn test_overflowing_size_panics_before_reading() {
        // size * size wraps to 0, which would satisfy every length check.
        let size = 1usize << (usize::BITS / 2);
        let mut c: [u8; 0] = [];
        multiply_row_blocks::<u8>(&[], &[], &mut c, size, TileConfig::new(1).unwrap(), 0);
    }
}
