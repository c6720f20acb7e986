// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Degeneracy-aware twirling superoperator.
//!
//! For a reference M = V·diag(λ)·V⁻¹, twirling projects X onto the part that
//! does not couple distinct eigenspaces of M:
//!
//!   X -> Σ_g Π_g · X · Π_g,   Π_g = V · P_g · V⁻¹
//!
//! where P_g selects the eigenvalues of group g. With row-major vectorization
//! each term is kron(Π_g, Π_gᵗ).

use std::collections::BTreeSet;

use ndarray::{linalg::kron, s, Array2};
use num_complex::Complex64;

use super::types::TwirlConvention;
use crate::error::{Result, ValidationError};
use crate::linalg::{eigendecompose, EigenDecomposition};

/// Builds twirl superoperators at a fixed degeneracy tolerance.
#[derive(Debug, Clone, Copy)]
pub struct TwirlOperator {
    eps: f64,
    convention: TwirlConvention,
}

/// A twirl superoperator and the conditioning of the eigenbasis it came from.
#[derive(Debug, Clone)]
pub struct Twirl {
    /// d²×d² superoperator acting on row-major vec(X).
    pub superop: Array2<Complex64>,
    /// Number of distinct degeneracy groups.
    pub num_blocks: usize,
    /// Eigendecomposition of the reference matrix.
    pub eigen: EigenDecomposition,
}

impl TwirlOperator {
    /// Eigenvalues within `eps` of each other are treated as degenerate.
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            convention: TwirlConvention::Standard,
        }
    }

    pub fn with_convention(mut self, convention: TwirlConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Build the twirl superoperator of `m`.
    ///
    /// For every eigenvalue index i the projector onto {j : |λ_i − λ_j| ≤ eps}
    /// is normalized by √(group size), conjugated by V and accumulated as
    /// kron(A_i, A_iᵗ). A group of size k is visited k times, so it
    /// contributes exactly once overall.
    pub fn build(&self, m: &Array2<Complex64>) -> Result<Twirl> {
        let d = m.nrows();
        if m.ncols() != d {
            return Err(ValidationError::DimensionMismatch {
                context: "twirl reference columns".into(),
                expected: d,
                actual: m.ncols(),
            }
            .into());
        }

        let eig = eigendecompose(m)?;
        let mut superop = Array2::<Complex64>::zeros((d * d, d * d));
        let mut groups = BTreeSet::new();

        for i in 0..d {
            let members: Vec<usize> = (0..d)
                .filter(|&j| (eig.values[i] - eig.values[j]).norm() <= self.eps)
                .collect();
            let norm = Complex64::new(1.0 / (members.len() as f64).sqrt(), 0.0);

            // A = V[:, members] · V⁻¹[members, :] / √k
            let mut a = Array2::<Complex64>::zeros((d, d));
            for &j in &members {
                let col = eig.vectors.slice(s![.., j..j + 1]);
                let row = eig.inverse.slice(s![j..j + 1, ..]);
                a += &col.dot(&row);
            }
            a.mapv_inplace(|x| x * norm);

            let term = match self.convention {
                TwirlConvention::Standard => kron(&a, &a.t()),
                TwirlConvention::Transposed => kron(&a.t(), &a),
            };
            superop += &term;
            groups.insert(members);
        }

        Ok(Twirl {
            superop,
            num_blocks: groups.len(),
            eigen: eig,
        })
    }
}

impl Twirl {
    /// Twirl a d×d matrix.
    pub fn apply(&self, x: &Array2<Complex64>) -> Result<Array2<Complex64>> {
        let d = x.nrows();
        if d * d != self.superop.nrows() || x.ncols() != d {
            return Err(ValidationError::DimensionMismatch {
                context: "twirl input".into(),
                expected: self.superop.nrows(),
                actual: x.len(),
            }
            .into());
        }
        let flat = x.iter().copied().collect::<ndarray::Array1<Complex64>>();
        let out = self.superop.dot(&flat);
        Ok(Array2::from_shape_fn((d, d), |(i, j)| out[i * d + j]))
    }

    /// Twirl every column of a flattened d²×P Jacobian.
    pub fn apply_to_jacobian(&self, jacobian: &Array2<Complex64>) -> Array2<Complex64> {
        self.superop.dot(jacobian)
    }
}
