//! Row-block parallel dispatch of the blocked kernel.
//!
//! The outermost i-block loop is split statically: the `blocks` i-blocks are
//! cut into contiguous ranges of `ceil(blocks / workers)` blocks, and each
//! range maps to an exclusive, contiguous run of rows of C. Workers never
//! share a cell of C, so the accumulation needs no locks or atomics.

use std::ops::Range;

use log::{debug, trace};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::tiling::TileConfig;

/// Number of i-blocks of extent `tile` needed to cover `size` rows.
#[inline]
pub fn block_count(size: usize, tile: usize) -> usize {
    size.div_ceil(tile)
}

/// Number of consecutive i-blocks each worker receives.
#[inline]
fn blocks_per_worker(blocks: usize, workers: usize) -> usize {
    blocks.div_ceil(workers.max(1)).max(1)
}

/// Static contiguous split of `0..blocks` across at most `workers` workers.
///
/// Every range but the last holds `ceil(blocks / workers)` blocks. The
/// ranges are ordered, non-empty and cover `0..blocks` exactly once.
pub fn partition_blocks(blocks: usize, workers: usize) -> Vec<Range<usize>> {
    let per_worker = blocks_per_worker(blocks, workers);
    (0..blocks)
        .step_by(per_worker)
        .map(|start| start..(start + per_worker).min(blocks))
        .collect()
}

/// Row range of C owned by a block range.
pub fn block_rows(blocks: Range<usize>, size: usize, tile: usize) -> Range<usize> {
    (blocks.start * tile).min(size)..(blocks.end * tile).min(size)
}

/// Hands each worker its exclusive run of rows of C and waits for all of them.
///
/// The runs are the [`partition_blocks`] ranges mapped through
/// [`block_rows`]. `body(first_row, rows)` receives the global index of its
/// first row and a mutable slice holding whole rows of C. The call runs on the
/// current rayon pool and returns once every range has been processed.
///
/// # Panics
///
/// Panics if `size * size` overflows `usize` or `c` is shorter than that.
pub fn dispatch_row_blocks<T, F>(c: &mut [T], size: usize, tiles: TileConfig, workers: usize, body: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if size == 0 {
        return;
    }
    let n = size.checked_mul(size).expect("size * size overflows usize");
    let tile = tiles.tile();
    let blocks = block_count(size, tile);
    let ranges = partition_blocks(blocks, workers);

    debug!(
        "dispatching {}x{} multiply: tile={}, blocks={}, workers={}, ranges={}",
        size,
        size,
        tile,
        blocks,
        workers,
        ranges.len()
    );

    let mut rest = &mut c[..n];
    let mut work = Vec::with_capacity(ranges.len());
    for range in ranges {
        let rows = block_rows(range, size, tile);
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(rows.len() * size);
        work.push((rows.start, head));
        rest = tail;
    }
    debug_assert!(rest.is_empty());

    work.into_par_iter()
        .enumerate()
        .for_each(|(worker, (first_row, rows))| {
            trace!(
                "worker range {}: rows {}..{}",
                worker,
                first_row,
                first_row + rows.len() / size
            );
            body(first_row, rows);
        });
}
