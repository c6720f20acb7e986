// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Amplification scoring.
//!
//! Each germ contributes JᴴJ of its (length-normalized) twirled Jacobian. A
//! subset is scored from the spectrum of the weighted sum of contributions,
//! ignoring the lowest `num_gauge_params` eigenvalues. Lower is better.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::mask::GermMask;
use crate::error::{Error, Result, ValidationError};
use crate::linalg::hermitian_eigenvalues;
use crate::model::GateSequence;

/// Reduction of the non-gauge spectrum to a scalar score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreMode {
    /// Σ 1/|λ| over the non-gauge eigenvalues.
    #[serde(alias = "all")]
    SumReciprocal,
    /// 1 / min |λ| over the non-gauge eigenvalues.
    #[default]
    #[serde(alias = "worst")]
    WorstCase,
}

impl FromStr for ScoreMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "sum-reciprocal" => Ok(ScoreMode::SumReciprocal),
            "worst" | "worst-case" => Ok(ScoreMode::WorstCase),
            other => Err(Error::Config(format!(
                "unknown score mode '{}' (expected 'sum-reciprocal' or 'worst-case')",
                other
            ))),
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMode::SumReciprocal => write!(f, "sum-reciprocal"),
            ScoreMode::WorstCase => write!(f, "worst-case"),
        }
    }
}

/// JᴴJ of each Jacobian after dividing it by its germ's length.
pub fn germ_contributions(
    jacobians: &[Array2<Complex64>],
    germs: &[GateSequence],
) -> Result<Vec<Array2<Complex64>>> {
    if jacobians.len() != germs.len() {
        return Err(ValidationError::DimensionMismatch {
            context: "germ Jacobians".into(),
            expected: germs.len(),
            actual: jacobians.len(),
        }
        .into());
    }
    jacobians
        .iter()
        .zip(germs)
        .map(|(jac, germ)| {
            if germ.is_empty() {
                return Err(ValidationError::EmptySequence.into());
            }
            let scaled = jac.mapv(|x| x / germ.len() as f64);
            Ok(jtj(&scaled))
        })
        .collect()
}

/// Jᴴ·J
pub(crate) fn jtj(jac: &Array2<Complex64>) -> Array2<Complex64> {
    jac.t().mapv(|x| x.conj()).dot(jac)
}

/// Σ weights[i] · contributions[i]
pub fn combined_jtj(weights: &[f64], contributions: &[Array2<Complex64>]) -> Result<Array2<Complex64>> {
    if weights.len() != contributions.len() {
        return Err(ValidationError::DimensionMismatch {
            context: "germ weights".into(),
            expected: contributions.len(),
            actual: weights.len(),
        }
        .into());
    }
    let p = contributions.first().map_or(0, |c| c.nrows());
    let mut total = Array2::<Complex64>::zeros((p, p));
    for (&w, contribution) in weights.iter().zip(contributions) {
        if w != 0.0 {
            total.scaled_add(Complex64::new(w, 0.0), contribution);
        }
    }
    Ok(total)
}

/// Ascending real eigenvalues of a Hermitian JtJ.
pub fn spectrum(jtj: &Array2<Complex64>) -> Vec<f64> {
    hermitian_eigenvalues(jtj)
}

/// Score a sorted spectrum, skipping the first `num_gauge_params` entries.
///
/// A zero eigenvalue scores +∞. With no non-gauge eigenvalues the score is 0.
pub fn score(sorted_eigenvalues: &[f64], num_gauge_params: usize, mode: ScoreMode) -> f64 {
    let rest = sorted_eigenvalues.get(num_gauge_params..).unwrap_or(&[]);
    if rest.is_empty() {
        return 0.0;
    }
    match mode {
        ScoreMode::SumReciprocal => rest.iter().map(|l| 1.0 / l.abs()).sum(),
        ScoreMode::WorstCase => {
            let min = rest.iter().fold(f64::INFINITY, |acc, l| acc.min(l.abs()));
            1.0 / min
        }
    }
}

/// Precomputed per-germ contributions for one model.
#[derive(Debug, Clone)]
pub struct AmplificationScorer {
    contributions: Vec<Array2<Complex64>>,
    num_gauge_params: usize,
    mode: ScoreMode,
}

impl AmplificationScorer {
    pub fn new(contributions: Vec<Array2<Complex64>>, num_gauge_params: usize, mode: ScoreMode) -> Self {
        Self {
            contributions,
            num_gauge_params,
            mode,
        }
    }

    pub fn num_germs(&self) -> usize {
        self.contributions.len()
    }

    pub fn num_gauge_params(&self) -> usize {
        self.num_gauge_params
    }

    pub fn mode(&self) -> ScoreMode {
        self.mode
    }

    /// Spectrum of the weighted JtJ.
    pub fn spectrum(&self, weights: &[f64]) -> Result<Vec<f64>> {
        Ok(spectrum(&combined_jtj(weights, &self.contributions)?))
    }

    pub fn score_weights(&self, weights: &[f64]) -> Result<f64> {
        Ok(score(&self.spectrum(weights)?, self.num_gauge_params, self.mode))
    }

    pub fn score_mask(&self, mask: &GermMask) -> Result<f64> {
        self.score_weights(&mask.to_weights())
    }
}
