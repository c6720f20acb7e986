// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pauli-basis helpers for building gate superoperators.
//!
//! Gates are represented as Pauli transfer matrices (PTMs) in the normalized
//! Pauli-product basis B_i = P_i / √n:
//!
//!   R_ij = Tr(B_i · U · B_j · U†)
//!
//! which is real for any unitary U.

use nalgebra::SymmetricEigen;
use ndarray::{array, linalg::kron, Array2};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Result, ValidationError};
use crate::linalg::{adjoint, from_dmatrix, to_dmatrix};

/// Single-qubit Pauli axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// The four single-qubit Pauli matrices [I, X, Y, Z].
pub fn pauli_matrices() -> [Array2<Complex64>; 4] {
    let o = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let i = Complex64::new(0.0, 1.0);
    [
        array![[one, o], [o, one]],
        array![[o, one], [one, o]],
        array![[o, -i], [i, o]],
        array![[one, o], [o, -one]],
    ]
}

/// Normalized Pauli-product basis for `num_qubits` qubits (4^q elements of
/// size 2^q × 2^q), ordered I, X, Y, Z with the first qubit most significant.
pub fn pauli_basis(num_qubits: u32) -> Vec<Array2<Complex64>> {
    let paulis = pauli_matrices();
    let mut basis = vec![Array2::from_elem((1, 1), Complex64::new(1.0, 0.0))];
    for _ in 0..num_qubits {
        basis = basis
            .iter()
            .flat_map(|b| paulis.iter().map(move |p| kron(b, p)))
            .collect();
    }
    let n = 1usize << num_qubits;
    let norm = Complex64::new(1.0 / (n as f64).sqrt(), 0.0);
    basis.into_iter().map(|b| b * norm).collect()
}

/// Number of qubits for a Hilbert-space dimension `n` (must be a power of 2).
fn qubits_for_dim(n: usize, context: &str) -> Result<u32> {
    if n == 0 || !n.is_power_of_two() {
        return Err(ValidationError::Field {
            field: context.into(),
            message: format!("Hilbert dimension {} is not a power of 2", n),
        }
        .into());
    }
    Ok(n.trailing_zeros())
}

/// Hilbert-space dimension √d for a superoperator dimension d.
pub fn hilbert_dim(superop_dim: usize) -> Result<usize> {
    let n = (superop_dim as f64).sqrt().round() as usize;
    if n * n != superop_dim {
        return Err(ValidationError::Field {
            field: "dimension".into(),
            message: format!("superoperator dimension {} is not a perfect square", superop_dim),
        }
        .into());
    }
    Ok(n)
}

/// Pauli transfer matrix of a unitary.
pub fn unitary_to_ptm(u: &Array2<Complex64>) -> Result<Array2<f64>> {
    let n = u.nrows();
    if u.ncols() != n {
        return Err(ValidationError::DimensionMismatch {
            context: "unitary columns".into(),
            expected: n,
            actual: u.ncols(),
        }
        .into());
    }
    let basis = pauli_basis(qubits_for_dim(n, "unitary")?);
    let u_dag = adjoint(u);

    // Conjugated basis elements U·B_j·U† once per column.
    let conjugated: Vec<Array2<Complex64>> = basis.iter().map(|b| u.dot(b).dot(&u_dag)).collect();

    let d = basis.len();
    let mut ptm = Array2::zeros((d, d));
    for (i, bi) in basis.iter().enumerate() {
        for (j, cj) in conjugated.iter().enumerate() {
            let trace: Complex64 = (0..n)
                .map(|r| (0..n).map(|k| bi[[r, k]] * cj[[k, r]]).sum::<Complex64>())
                .sum();
            ptm[[i, j]] = trace.re;
        }
    }
    Ok(ptm)
}

/// Single-qubit rotation exp(-i·θ/2·σ).
pub fn rotation(axis: Axis, theta: f64) -> Array2<Complex64> {
    let paulis = pauli_matrices();
    let sigma = match axis {
        Axis::X => &paulis[1],
        Axis::Y => &paulis[2],
        Axis::Z => &paulis[3],
    };
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new(0.0, -(theta / 2.0).sin());
    &paulis[0] * c + sigma * s
}

/// exp(-i·t·H) for Hermitian H, via the spectral decomposition H = W·Λ·W†.
pub fn hermitian_evolution(h: &Array2<Complex64>, t: f64) -> Array2<Complex64> {
    let eig = SymmetricEigen::new(to_dmatrix(h));
    let w = from_dmatrix(&eig.eigenvectors);
    let n = h.nrows();
    let mut phases = Array2::zeros((n, n));
    for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
        phases[[k, k]] = Complex64::new(0.0, -t * lambda).exp();
    }
    w.dot(&phases).dot(&adjoint(&w))
}

/// Random Hermitian matrix with standard-normal real and imaginary parts,
/// symmetrized as (A + A†)/2.
pub fn random_hermitian<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Array2<Complex64> {
    let a = Array2::from_shape_fn((n, n), |_| {
        Complex64::new(rng.sample(StandardNormal), rng.sample(StandardNormal))
    });
    (&a + &adjoint(&a)).mapv(|x| x * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::PI;

    #[test]
    fn test_pauli_basis_is_orthonormal() {
        let basis = pauli_basis(2);
        assert_eq!(basis.len(), 16);
        for (i, a) in basis.iter().enumerate() {
            for (j, b) in basis.iter().enumerate() {
                let ip: Complex64 = adjoint(a).dot(b).diag().sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(ip.re, expected, epsilon = 1e-12);
                assert_relative_eq!(ip.im, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_identity_ptm_is_identity() {
        let ptm = unitary_to_ptm(&pauli_matrices()[0]).unwrap();
        for ((i, j), v) in ptm.indexed_iter() {
            assert_relative_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_x_pi_over_2_ptm() {
        // X(π/2) fixes X and maps Y -> Z, Z -> -Y
        let ptm = unitary_to_ptm(&rotation(Axis::X, PI / 2.0)).unwrap();
        assert_relative_eq!(ptm[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ptm[[1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ptm[[3, 2]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ptm[[2, 3]], -1.0, epsilon = 1e-12);
        assert_relative_eq!(ptm[[2, 2]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ptm_rejects_non_power_of_two() {
        let u = Array2::from_diag_elem(3, Complex64::new(1.0, 0.0));
        assert!(unitary_to_ptm(&u).is_err());
    }

    #[test]
    fn test_hilbert_dim() {
        assert_eq!(hilbert_dim(4).unwrap(), 2);
        assert_eq!(hilbert_dim(16).unwrap(), 4);
        assert!(hilbert_dim(5).is_err());
    }

    #[test]
    fn test_hermitian_evolution_is_unitary() {
        let mut rng = StdRng::seed_from_u64(7);
        let h = random_hermitian(2, &mut rng);
        let u = hermitian_evolution(&h, 0.3);
        let product = u.dot(&adjoint(&u));
        for ((i, j), v) in product.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((v - Complex64::new(expected, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_hermitian_evolution_matches_rotation() {
        // exp(-i·(θ/2)·X) == rotation(X, θ)
        let x = pauli_matrices()[1].clone();
        let u = hermitian_evolution(&x, 0.7 / 2.0);
        let expected = rotation(Axis::X, 0.7);
        for (a, b) in u.iter().zip(expected.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }
}
