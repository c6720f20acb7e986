// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Eigendecomposition of general (non-Hermitian) complex matrices.
//!
//! Gate superoperators are typically normal or close to it but carry exact
//! degeneracies (every unitary PTM has eigenvalue 1 at least twice). Triangular
//! back-substitution on the Schur form handles those poorly, so eigenvectors
//! are instead taken per cluster of equal eigenvalues as the null space of
//! (M - λI), read off the SVD. A diagonalizable matrix then gets a
//! well-conditioned eigenbasis even inside a degenerate eigenspace. A defective
//! matrix has too small a null space; the extra columns are not eigenvectors,
//! which shows up in [`EigenDecomposition::max_residual`]. Nearly coincident
//! but distinct eigenvalues show up in [`EigenDecomposition::condition_number`].

use nalgebra::{DMatrix, Schur, SVD};
use ndarray::Array2;
use num_complex::Complex64;
use tracing::warn;

use super::{from_dmatrix, to_dmatrix};
use crate::error::{Error, Result, ValidationError};

/// Relative tolerance below which two Schur eigenvalues are treated as one
/// eigenspace when extracting eigenvectors.
const CLUSTER_RTOL: f64 = 1e-9;

/// Cutoff used for the pseudo-inverse fallback of a singular eigenbasis.
const PINV_EPS: f64 = 1e-12;

/// M = V · diag(values) · V⁻¹
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues in Schur order.
    pub values: Vec<Complex64>,
    /// Eigenvectors as columns, unit norm, aligned with `values`.
    pub vectors: Array2<Complex64>,
    /// Inverse (or pseudo-inverse, if singular) of `vectors`.
    pub inverse: Array2<Complex64>,
    /// 2-norm condition number of `vectors`.
    pub condition_number: f64,
    /// Largest relative eigenpair residual ‖M·v − λ·v‖ / max(1, |λ|max).
    pub max_residual: f64,
}

impl EigenDecomposition {
    /// Whether the eigenbasis is too ill-conditioned (or not an eigenbasis at
    /// all) for a similarity transform through it to be trusted.
    pub fn is_ill_conditioned(&self, max_condition: f64, max_residual: f64) -> bool {
        !(self.condition_number <= max_condition) || !(self.max_residual <= max_residual)
    }
}

/// Eigendecompose a square complex matrix.
///
/// # Errors
/// - `Validation` if `m` is not square.
/// - `Numeric` if the Schur iteration or an SVD fails to converge.
pub fn eigendecompose(m: &Array2<Complex64>) -> Result<EigenDecomposition> {
    let n = m.nrows();
    if m.ncols() != n {
        return Err(ValidationError::DimensionMismatch {
            context: "eigendecomposition input columns".into(),
            expected: n,
            actual: m.ncols(),
        }
        .into());
    }
    if n == 0 {
        return Ok(EigenDecomposition {
            values: Vec::new(),
            vectors: Array2::zeros((0, 0)),
            inverse: Array2::zeros((0, 0)),
            condition_number: 1.0,
            max_residual: 0.0,
        });
    }

    let dm = to_dmatrix(m);
    let schur = Schur::try_new(dm.clone(), f64::EPSILON, 0)
        .ok_or_else(|| Error::Numeric("Schur decomposition did not converge".into()))?;
    let values: Vec<Complex64> = schur
        .eigenvalues()
        .ok_or_else(|| Error::Numeric("Schur form is not triangular".into()))?
        .iter()
        .copied()
        .collect();

    let scale = values.iter().fold(1.0f64, |acc, v| acc.max(v.norm()));
    let clusters = cluster_eigenvalues(&values, CLUSTER_RTOL * scale);

    let mut vectors = DMatrix::<Complex64>::zeros(n, n);
    for members in &clusters {
        let center = members.iter().map(|&i| values[i]).sum::<Complex64>()
            / Complex64::new(members.len() as f64, 0.0);
        let mut shifted = dm.clone();
        for i in 0..n {
            shifted[(i, i)] -= center;
        }

        let svd = SVD::try_new(shifted, false, true, f64::EPSILON, 0)
            .ok_or_else(|| Error::Numeric("SVD did not converge".into()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| Error::Numeric("SVD returned no right singular vectors".into()))?;

        // Right singular vectors with the smallest singular values span the
        // (approximate) null space of M - λI.
        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&a, &b| svd.singular_values[a].total_cmp(&svd.singular_values[b]));

        for (k, &col) in members.iter().enumerate() {
            let row = order[k];
            for r in 0..n {
                vectors[(r, col)] = v_t[(row, r)].conj();
            }
        }
    }

    let mut max_residual = 0.0f64;
    for (col, value) in values.iter().enumerate() {
        let v = vectors.column(col);
        let residual = (&dm * v - v * *value).norm();
        max_residual = max_residual.max(residual / scale);
    }

    let singular = vectors.singular_values();
    let s_max = singular.iter().fold(0.0f64, |acc, &s| acc.max(s));
    let s_min = singular.iter().fold(f64::INFINITY, |acc, &s| acc.min(s));
    let condition_number = if s_min > 0.0 {
        s_max / s_min
    } else {
        f64::INFINITY
    };

    let inverse = match vectors.clone().try_inverse() {
        Some(inv) => inv,
        None => {
            warn!(
                condition_number,
                "Eigenbasis is singular; falling back to pseudo-inverse"
            );
            vectors
                .clone()
                .pseudo_inverse(PINV_EPS)
                .map_err(|e| Error::Numeric(format!("pseudo-inverse failed: {e}")))?
        }
    };

    Ok(EigenDecomposition {
        values,
        vectors: from_dmatrix(&vectors),
        inverse: from_dmatrix(&inverse),
        condition_number,
        max_residual,
    })
}

/// Group eigenvalue indices whose values agree to within `tol` of the first
/// member of the group.
fn cluster_eigenvalues(values: &[Complex64], tol: f64) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match clusters
            .iter_mut()
            .find(|c| (values[c[0]] - v).norm() <= tol)
        {
            Some(cluster) => cluster.push(i),
            None => clusters.push(vec![i]),
        }
    }
    clusters
}
