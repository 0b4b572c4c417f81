//! Interchangeable implementations of the accumulate-multiply contract.
//!
//! Every backend computes `C := C + A x B` for square row-major matrices of
//! extent `size`. Which one runs is decided when the harness is composed
//! (see [`Backend::build`]), never inside a kernel.

use std::{fmt, str::FromStr};

use log::debug;
use ndarray::{linalg::general_mat_mul, ArrayView2, ArrayViewMut2, LinalgScalar};

use crate::{
    error::{config_error, TilemmError},
    matrix::{get, set, Element},
    parallel::dispatch_row_blocks,
    tiling::{multiply_row_blocks, multiply_serial, TileConfig},
};

/// The accumulate-multiply contract shared by all backends.
///
/// Preconditions: `size > 0`, `a`, `b` and `c` hold at least `size * size`
/// elements, and `c` does not alias `a` or `b`. Pre-existing content of `c`
/// is added to, never overwritten.
pub trait MatrixProduct<T: Element>: Send + Sync {
    /// Short name used in logs and CSV output.
    fn name(&self) -> &'static str;

    fn accumulate_multiply(&self, a: &[T], b: &[T], c: &mut [T], size: usize);
}

/// The cache-blocked, multithreaded kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockedKernel {
    tiles: TileConfig,
    workers: Option<usize>,
}

impl BlockedKernel {
    pub fn new(tiles: TileConfig) -> Self {
        BlockedKernel {
            tiles,
            workers: None,
        }
    }

    /// Fixes how many row ranges C is split into.
    ///
    /// Without it the kernel uses the size of the rayon pool it runs in.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    pub fn tiles(&self) -> TileConfig {
        self.tiles
    }
}

impl<T: Element> MatrixProduct<T> for BlockedKernel {
    fn name(&self) -> &'static str {
        "blocked"
    }

    fn accumulate_multiply(&self, a: &[T], b: &[T], c: &mut [T], size: usize) {
        let workers = self.workers.unwrap_or_else(rayon::current_num_threads);
        let tiles = self.tiles;
        if size == 0 {
            return;
        }
        if workers == 1 {
            multiply_serial(a, b, c, size, tiles);
            return;
        }
        dispatch_row_blocks(c, size, tiles, workers, |first_row, rows| {
            multiply_row_blocks(a, b, rows, size, tiles, first_row)
        });
    }
}

/// Unblocked, single-threaded k-i-j triple loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceKernel;

impl<T: Element> MatrixProduct<T> for ReferenceKernel {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn accumulate_multiply(&self, a: &[T], b: &[T], c: &mut [T], size: usize) {
        for k in 0..size {
            for i in 0..size {
                let a_ik = get(a, size, i, k);
                for j in 0..size {
                    let c_ij = get(c, size, i, j);
                    set(c, size, i, j, c_ij + a_ik * get(b, size, k, j));
                }
            }
        }
    }
}

/// Delegates to ndarray's optimized GEMM (`alpha = beta = 1`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NdarrayGemm;

impl<T: Element + LinalgScalar> MatrixProduct<T> for NdarrayGemm {
    fn name(&self) -> &'static str {
        "ndarray"
    }

    fn accumulate_multiply(&self, a: &[T], b: &[T], c: &mut [T], size: usize) {
        let n = size * size;
        let shape = (size, size);
        let a = ArrayView2::from_shape(shape, &a[..n]).expect("A slice has size*size elements");
        let b = ArrayView2::from_shape(shape, &b[..n]).expect("B slice has size*size elements");
        let mut c =
            ArrayViewMut2::from_shape(shape, &mut c[..n]).expect("C slice has size*size elements");
        general_mat_mul(T::one(), &a, &b, T::one(), &mut c);
    }
}

/// Backend selection, resolved once when the harness is set up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    #[default]
    Blocked,
    Reference,
    Ndarray,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Blocked, Backend::Reference, Backend::Ndarray];

    /// Builds the strategy object for this backend.
    ///
    /// `tiles` and `workers` only affect [`Backend::Blocked`].
    pub fn build(self, tiles: TileConfig, workers: Option<usize>) -> Box<dyn MatrixProduct<f64>> {
        debug!("building backend {} (tile={}, workers={:?})", self, tiles.tile(), workers);
        match self {
            Backend::Blocked => {
                let kernel = BlockedKernel::new(tiles);
                match workers {
                    Some(n) => Box::new(kernel.with_workers(n)),
                    None => Box::new(kernel),
                }
            }
            Backend::Reference => Box::new(ReferenceKernel),
            Backend::Ndarray => Box::new(NdarrayGemm),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Blocked => "blocked",
            Backend::Reference => "reference",
            Backend::Ndarray => "ndarray",
        };
        f.write_str(name)
    }
}

impl FromStr for Backend {
    type Err = TilemmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocked" | "tiled" => Ok(Backend::Blocked),
            "reference" | "naive" => Ok(Backend::Reference),
            "ndarray" | "gemm" => Ok(Backend::Ndarray),
            _ => Err(config_error(
                "backend",
                s,
                "expected one of: blocked, reference, ndarray",
            )),
        }
    }
}

/// `C := C + A x B` with the blocked kernel and the default tile extent.
///
/// Runs on the current rayon pool and returns once every row block is done.
pub fn matrix_product<T: Element>(a: &[T], b: &[T], c: &mut [T], size: usize) {
    <BlockedKernel as MatrixProduct<T>>::accumulate_multiply(&BlockedKernel::default(), a, b, c, size);
}
