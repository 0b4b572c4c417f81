//! Square row-major matrices and the element accessors the kernels are built on.
//!
//! A matrix of extent `size` is a single contiguous buffer of `size * size`
//! elements. Element `(i, j)` lives at offset `i * size + j`.

use rand::Rng;

use crate::error::{allocation_error, validation_error, Result};

/// Numeric element type accepted by the multiply kernels.
///
/// Blanket-implemented for every `num::Num` type that is `Copy` and can be
/// shared across worker threads, so `f64` (the default) and `f32` both work.
pub trait Element: num::Num + Copy + Send + Sync + 'static {}

impl<T> Element for T where T: num::Num + Copy + Send + Sync + 'static {}

/// Calculates the 1D offset of element `(i, j)` in a row-major square matrix.
#[inline(always)]
pub fn at(i: usize, j: usize, size: usize) -> usize {
    (i * size) + j
}

/// Returns the element at row `i`, column `j`.
///
/// `i` and `j` must be smaller than `size`. This is only asserted in debug
/// builds; an out-of-range column that still lands inside the buffer reads a
/// neighbouring element.
#[inline(always)]
pub fn get<T: Copy>(matrix: &[T], size: usize, i: usize, j: usize) -> T {
    debug_assert!(i < size && j < size, "({i}, {j}) out of range for size {size}");
    matrix[at(i, j, size)]
}

/// Writes `value` at row `i`, column `j`. Same preconditions as [`get`].
#[inline(always)]
pub fn set<T>(matrix: &mut [T], size: usize, i: usize, j: usize, value: T) {
    debug_assert!(i < size && j < size, "({i}, {j}) out of range for size {size}");
    matrix[at(i, j, size)] = value;
}

/// Unchecked variant of [`get`] for the blocked hot loop.
///
/// # Safety
///
/// `i * size + j` must be within `matrix`.
#[inline(always)]
pub(crate) unsafe fn get_unchecked<T: Copy>(matrix: &[T], size: usize, i: usize, j: usize) -> T {
    debug_assert!(at(i, j, size) < matrix.len());
    *matrix.get_unchecked(at(i, j, size))
}

/// Unchecked variant of [`set`] for the blocked hot loop.
///
/// # Safety
///
/// `i * size + j` must be within `matrix`.
#[inline(always)]
pub(crate) unsafe fn set_unchecked<T>(matrix: &mut [T], size: usize, i: usize, j: usize, value: T) {
    debug_assert!(at(i, j, size) < matrix.len());
    *matrix.get_unchecked_mut(at(i, j, size)) = value;
}

/// An owned, square, row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T = f64> {
    data: Vec<T>,
    size: usize,
}

impl<T: Element> Matrix<T> {
    /// Allocates a zero-initialised `size x size` matrix.
    ///
    /// Running out of memory is reported as an allocation error instead of
    /// aborting the process.
    pub fn zeros(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(validation_error("matrix size must be positive"));
        }
        let len = size
            .checked_mul(size)
            .ok_or_else(|| allocation_error(usize::MAX, format!("{size}x{size} overflows usize")))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| allocation_error(len, e.to_string()))?;
        data.resize(len, T::zero());

        Ok(Matrix { data, size })
    }

    /// Builds a matrix where element `(i, j)` is `f(i, j)`.
    pub fn from_fn<F>(size: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut matrix = Self::zeros(size)?;
        for i in 0..size {
            for j in 0..size {
                set(&mut matrix.data, size, i, j, f(i, j));
            }
        }
        Ok(matrix)
    }

    /// Wraps an existing row-major buffer of exactly `size * size` elements.
    pub fn from_vec(data: Vec<T>, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(validation_error("matrix size must be positive"));
        }
        if Some(data.len()) != size.checked_mul(size) {
            return Err(validation_error(format!(
                "buffer holds {} elements, expected {}x{}",
                data.len(),
                size,
                size
            )));
        }
        Ok(Matrix { data, size })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        get(&self.data, self.size, i, j)
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        set(&mut self.data, self.size, i, j, value)
    }

    /// Overwrites every element with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Sum of all elements, accumulated row by row.
    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x)
    }
}

impl Matrix<f64> {
    /// Fills a new matrix with uniform values in `[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self> {
        Self::from_fn(size, |_, _| rng.random_range(-1.0..1.0))
    }
}

/// Allocates a zeroed `size x size` matrix buffer for a benchmark driver.
pub fn allocate<T: Element>(size: usize) -> Result<Matrix<T>> {
    Matrix::zeros(size)
}

/// Releases a buffer obtained from [`allocate`].
pub fn release<T>(matrix: Matrix<T>) {
    drop(matrix);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TilemmError;

    #[test]
    fn test_at() {
        // For a 3x3 matrix
        // 0 1 2
        // 3 4 5
        // 6 7 8
        assert_eq!(at(0, 0, 3), 0);
        assert_eq!(at(0, 2, 3), 2);
        assert_eq!(at(1, 0, 3), 3);
        assert_eq!(at(2, 1, 3), 7);
    }

    #[test]
    fn test_get_set_row_major() {
        let mut buf = vec![0.0f64; 4];
        set(&mut buf, 2, 1, 0, 5.0);
        assert_eq!(buf, vec![0.0, 0.0, 5.0, 0.0]);
        assert_eq!(get(&buf, 2, 1, 0), 5.0);
    }

    #[test]
    fn test_unchecked_accessors_match_checked() {
        let mut buf: Vec<f64> = (0..9).map(|x| x as f64).collect();
        for i in 0..3 {
            for j in 0..3 {
                let v = unsafe { get_unchecked(&buf, 3, i, j) };
                assert_eq!(v, get(&buf, 3, i, j));
            }
        }
        unsafe { set_unchecked(&mut buf, 3, 2, 2, -1.0) };
        assert_eq!(buf[8], -1.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_get_column_out_of_range_asserts_in_debug() {
        let buf = vec![0.0f64; 9];
        // Lands inside the buffer (offset 3) but column 3 does not exist.
        let _ = get(&buf, 3, 0, 3);
    }

    #[test]
    fn test_zeros_and_fill() {
        let mut m = Matrix::<f64>::zeros(3).unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.as_slice().len(), 9);
        assert!(m.as_slice().iter().all(|&x| x == 0.0));

        m.fill(2.0);
        assert_eq!(m.sum(), 18.0);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let err = Matrix::<f64>::zeros(0).unwrap_err();
        assert!(matches!(err, TilemmError::ValidationError { .. }));
    }

    #[test]
    fn test_overflowing_size_is_allocation_error() {
        let err = Matrix::<f64>::zeros(usize::MAX).unwrap_err();
        assert!(matches!(err, TilemmError::AllocationError { .. }));
    }

    #[test]
    fn test_huge_allocation_is_reported() {
        // 2^31 x 2^31 doubles cannot be reserved on any real machine.
        let err = allocate::<f64>(1 << 31).unwrap_err();
        assert!(matches!(err, TilemmError::AllocationError { .. }));
    }

    #[test]
    fn test_from_fn_closed_form_inputs() {
        let a = Matrix::<f64>::from_fn(4, |i, _| i as f64).unwrap();
        let b = Matrix::<f64>::from_fn(4, |i, j| (i + j) as f64).unwrap();
        assert_eq!(a.get(3, 0), 3.0);
        assert_eq!(a.get(3, 3), 3.0);
        assert_eq!(b.get(2, 3), 5.0);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Matrix::from_vec(vec![1.0f64; 4], 2).is_ok());
        assert!(Matrix::from_vec(vec![1.0f64; 5], 2).is_err());
        assert!(Matrix::from_vec(Vec::<f64>::new(), 0).is_err());
    }

    #[test]
    fn test_random_is_bounded() {
        use rand::{rngs::StdRng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(42);
        let m = Matrix::<f64>::random(16, &mut rng).unwrap();
        assert!(m.as_slice().iter().all(|&x| (-1.0..1.0).contains(&x)));
    }

    #[test]
    fn test_allocate_release() {
        let m = allocate::<f32>(5).unwrap();
        assert_eq!(m.as_slice().len(), 25);
        release(m);
    }
}
