// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense linear-algebra helpers.
//!
//! Matrices are held as `ndarray::Array2` throughout the crate. Spectral
//! decompositions (Schur, SVD, Hermitian eigensolve) are delegated to
//! `nalgebra`, which shares the `num_complex::Complex64` scalar type, so the
//! conversions below are plain element copies.

pub mod eig;

pub use eig::{eigendecompose, EigenDecomposition};

use nalgebra::DMatrix;
use ndarray::Array2;
use num_complex::Complex64;

/// Copy an ndarray matrix into an nalgebra matrix.
pub fn to_dmatrix(a: &Array2<Complex64>) -> DMatrix<Complex64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

/// Copy an nalgebra matrix back into an ndarray matrix.
pub fn from_dmatrix(m: &DMatrix<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Promote a real matrix to complex.
pub fn to_complex(a: &Array2<f64>) -> Array2<Complex64> {
    a.mapv(|x| Complex64::new(x, 0.0))
}

/// Conjugate transpose.
pub fn adjoint(a: &Array2<Complex64>) -> Array2<Complex64> {
    a.t().mapv(|x| x.conj())
}

/// Real identity matrix.
pub fn identity(n: usize) -> Array2<f64> {
    Array2::eye(n)
}

/// Frobenius norm of a complex matrix.
pub fn frobenius_norm(a: &Array2<Complex64>) -> f64 {
    a.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// Eigenvalues of a Hermitian matrix, sorted ascending.
///
/// The input is symmetrized as (A + A†)/2 first so that round-off in a
/// J†J accumulation cannot leak imaginary parts into the spectrum.
pub fn hermitian_eigenvalues(a: &Array2<Complex64>) -> Vec<f64> {
    if a.is_empty() {
        return Vec::new();
    }
    let herm = (a + &adjoint(a)).mapv(|x| x * 0.5);
    let mut values: Vec<f64> = to_dmatrix(&herm)
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Numerical rank of a real matrix.
///
/// Counts singular values above `rel_tol` times the largest one.
pub fn matrix_rank(a: &Array2<f64>, rel_tol: f64) -> usize {
    if a.is_empty() {
        return 0;
    }
    let m = DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]]);
    let singular = m.singular_values();
    let max = singular.iter().fold(0.0f64, |acc, &s| acc.max(s));
    if max == 0.0 {
        return 0;
    }
    singular.iter().filter(|&&s| s > rel_tol * max).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dmatrix_round_trip_preserves_layout() {
        let a = Array2::from_shape_fn((2, 3), |(i, j)| Complex64::new(i as f64, j as f64));
        let back = from_dmatrix(&to_dmatrix(&a));
        assert_eq!(a, back);
    }

    #[test]
    fn test_hermitian_eigenvalues_sorted() {
        // [[2, i], [-i, 2]] has eigenvalues 1 and 3
        let mut h = Array2::zeros((2, 2));
        h[[0, 0]] = Complex64::new(2.0, 0.0);
        h[[1, 1]] = Complex64::new(2.0, 0.0);
        h[[0, 1]] = Complex64::new(0.0, 1.0);
        h[[1, 0]] = Complex64::new(0.0, -1.0);
        let evals = hermitian_eigenvalues(&h);
        assert_eq!(evals.len(), 2);
        assert_relative_eq!(evals[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(evals[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hermitian_eigenvalues_empty() {
        let h = Array2::<Complex64>::zeros((0, 0));
        assert!(hermitian_eigenvalues(&h).is_empty());
    }

    #[test]
    fn test_matrix_rank() {
        let mut a = Array2::zeros((3, 3));
        a[[0, 0]] = 1.0;
        a[[1, 1]] = 2.0;
        assert_eq!(matrix_rank(&a, 1e-10), 2);
        assert_eq!(matrix_rank(&identity(4), 1e-10), 4);
        assert_eq!(matrix_rank(&Array2::zeros((2, 2)), 1e-10), 0);
    }

    #[test]
    fn test_frobenius_norm() {
        let a = to_complex(&identity(4));
        assert_relative_eq!(frobenius_norm(&a), 2.0, epsilon = 1e-14);
    }
}
