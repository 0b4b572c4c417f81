//! Cache-blocked, multithreaded dense matrix multiplication.
//!
//! `tilemm` multiplies square, row-major `f64` (or any [`matrix::Element`])
//! matrices with accumulation, `C += A x B`. The core kernel tiles the i, j
//! and k dimensions with a configurable extent and splits the outer i-blocks
//! statically across a rayon worker pool, so every worker owns a disjoint run
//! of rows of C.
//!
//! ```
//! use tilemm::matrix_product;
//!
//! let n = 256;
//! let a = vec![1.0f64; n * n];
//! let b = vec![2.0f64; n * n];
//! let mut c = vec![0.0f64; n * n];
//!
//! matrix_product(&a, &b, &mut c, n);
//! assert!(c.iter().all(|&x| x == 2.0 * n as f64));
//! ```
//!
//! Other implementations of the same contract live in [`backend`] and are
//! picked when the harness is composed, see [`backend::Backend`].

pub mod backend;
pub mod bench;
pub mod config;
pub mod error;
pub mod logging;
pub mod matrix;
pub mod parallel;
pub mod tiling;

/// Reference tile extent of the blocked kernel.
pub const DEFAULT_TILE: usize = 128;

pub use backend::{
    matrix_product, Backend, BlockedKernel, MatrixProduct, NdarrayGemm, ReferenceKernel,
};
pub use error::{Result, TilemmError};
pub use matrix::{allocate, release, Matrix};
pub use tiling::TileConfig;
