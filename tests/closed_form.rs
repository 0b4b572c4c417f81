//! Closed-form correctness check of the accumulate-multiply backends.
//!
//! With `A[i][j] = i`, `B[i][j] = i + j` and `C = 0`, the sum of all elements
//! of `C` after one multiply is `n^3 (n-1)^2 / 2`.

use tilemm::{
    bench::{closed_form_sum, verify_closed_form, CLOSED_FORM_TOLERANCE},
    Backend, BlockedKernel, Matrix, MatrixProduct, NdarrayGemm, ReferenceKernel, TileConfig,
};

fn relative_error(kernel: &dyn MatrixProduct<f64>, n: usize) -> f64 {
    verify_closed_form(kernel, n)
        .unwrap_or_else(|e| panic!("closed form failed for n={}: {}", n, e))
}

#[test]
fn test_closed_form_blocked_full_range() {
    for n in (100..=1500).step_by(100) {
        let err = relative_error(&BlockedKernel::default(), n);
        assert!(err <= CLOSED_FORM_TOLERANCE, "n={} error {:e}", n, err);
    }
}

#[test]
fn test_closed_form_partial_blocks() {
    // Sizes that leave a clipped last block for the reference tile extent.
    for n in [1, 7, 129, 255, 301] {
        let err = relative_error(&BlockedKernel::default(), n);
        assert!(err <= CLOSED_FORM_TOLERANCE, "n={} error {:e}", n, err);
    }
}

#[test]
fn test_closed_form_every_backend() {
    for backend in Backend::ALL {
        let kernel = backend.build(TileConfig::new(32).unwrap(), None);
        for n in [100, 200] {
            let err = relative_error(kernel.as_ref(), n);
            assert!(err <= CLOSED_FORM_TOLERANCE, "{} n={} error {:e}", backend, n, err);
        }
    }
}

#[test]
fn test_closed_form_sum_matches_manual_sum() {
    let n = 50;
    let a = Matrix::<f64>::from_fn(n, |i, _| i as f64).unwrap();
    let b = Matrix::<f64>::from_fn(n, |i, j| (i + j) as f64).unwrap();

    for kernel in [
        &ReferenceKernel as &dyn MatrixProduct<f64>,
        &NdarrayGemm,
        &BlockedKernel::new(TileConfig::new(16).unwrap()),
    ] {
        let mut c = Matrix::<f64>::zeros(n).unwrap();
        kernel.accumulate_multiply(a.as_slice(), b.as_slice(), c.as_mut_slice(), n);
        // Integer-valued inputs this small are exact in f64.
        assert_eq!(c.sum(), closed_form_sum(n), "backend {}", kernel.name());
    }
}
