// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Germ-set completeness tests.
//!
//! Both tests run on a copy of the model with state preparations and
//! measurements removed, so only gate parameters are counted.

use ndarray::Array2;
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

use super::deriv::TwirledDerivativeEngine;
use super::score::{combined_jtj, germ_contributions, jtj, score, spectrum, ScoreMode};
use super::twirl::TwirlOperator;
use crate::error::{Result, ValidationError};
use crate::linalg::to_complex;
use crate::model::{GateModel, GateSequence};
use crate::validation::validate_weights;

/// Outcome of a completeness test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletenessReport {
    /// Whether every non-gauge parameter is amplified.
    pub success: bool,
    /// Ascending JᴴJ eigenvalues.
    pub spectrum: Vec<f64>,
    /// Score of the non-gauge spectrum.
    pub score: f64,
    pub num_gauge_params: usize,
}

fn resolve_weights(weights: Option<&[f64]>, num_germs: usize) -> Result<Vec<f64>> {
    match weights {
        Some(w) => {
            validate_weights(w, num_germs)?;
            Ok(w.to_vec())
        }
        None => Ok(vec![1.0 / num_germs as f64; num_germs]),
    }
}

/// Finite-length completeness test.
///
/// Uses the plain (un-twirled) derivative of every germ repeated `length`
/// times. Each germ's JᴴJ is divided by (germ length)² and length², weighted
/// (uniform 1/n by default) and summed. Succeeds iff the first non-gauge
/// eigenvalue exceeds `tol`.
pub fn test_germ_set_finite<M: GateModel>(
    model: &M,
    germs: &[GateSequence],
    length: usize,
    weights: Option<&[f64]>,
    tol: f64,
) -> Result<CompletenessReport> {
    if germs.is_empty() {
        return Err(ValidationError::Field {
            field: "germs".into(),
            message: "at least one germ is required".into(),
        }
        .into());
    }
    if length == 0 {
        return Err(ValidationError::Field {
            field: "length".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }
    let weights = resolve_weights(weights, germs.len())?;

    let model = model.without_spam();
    let powers: Vec<GateSequence> = germs.iter().map(|g| g.repeat(length)).collect();
    let eval = model.bulk_evaluate(&powers)?;

    let l2 = (length * length) as f64;
    let mut contributions: Vec<Array2<Complex64>> = Vec::with_capacity(germs.len());
    for (germ, deriv) in germs.iter().zip(&eval.derivatives) {
        if germ.is_empty() {
            return Err(ValidationError::EmptySequence.into());
        }
        let germ_len2 = (germ.len() * germ.len()) as f64;
        contributions.push(jtj(&to_complex(deriv)).mapv(|x| x / (germ_len2 * l2)));
    }

    let spectrum = spectrum(&combined_jtj(&weights, &contributions)?);
    let num_gauge_params = model.num_gauge_params();
    let success = spectrum
        .get(num_gauge_params)
        .is_some_and(|&lambda| lambda > tol);
    let score = score(&spectrum, num_gauge_params, ScoreMode::WorstCase);

    debug!(
        germs = germs.len(),
        length,
        num_gauge_params,
        success,
        "Finite-length completeness test"
    );

    Ok(CompletenessReport {
        success,
        spectrum,
        score,
        num_gauge_params,
    })
}

/// Asymptotic completeness test.
///
/// Twirls each germ's derivative with degeneracy tolerance 1/`threshold`,
/// then scores the weighted JᴴJ spectrum. Succeeds iff the score is below
/// `threshold`.
pub fn test_germ_set_asymptotic<M: GateModel>(
    model: &M,
    germs: &[GateSequence],
    mode: ScoreMode,
    weights: Option<&[f64]>,
    threshold: f64,
) -> Result<CompletenessReport> {
    if germs.is_empty() {
        return Err(ValidationError::Field {
            field: "germs".into(),
            message: "at least one germ is required".into(),
        }
        .into());
    }
    if !(threshold > 0.0) {
        return Err(ValidationError::Field {
            field: "threshold".into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }
    let weights = resolve_weights(weights, germs.len())?;

    let model = model.without_spam();
    let engine = TwirledDerivativeEngine::new(TwirlOperator::new(1.0 / threshold));
    let derivs = engine.bulk(&model, germs)?;
    let contributions = germ_contributions(&derivs.jacobians, germs)?;

    let spectrum = spectrum(&combined_jtj(&weights, &contributions)?);
    let num_gauge_params = model.num_gauge_params();
    let score = score(&spectrum, num_gauge_params, mode);
    let success = score < threshold;

    debug!(
        germs = germs.len(),
        threshold,
        score,
        success,
        "Asymptotic completeness test"
    );

    Ok(CompletenessReport {
        success,
        spectrum,
        score,
        num_gauge_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GateSet;

    fn std_germs() -> Vec<GateSequence> {
        GateSequence::parse_list("Gx,Gy,GxGy,GxGxGy,GxGyGy,GxGxGyGxGyGy").unwrap()
    }

    #[test]
    fn test_finite_too_few_germs_fails() {
        // One germ at L=1 spans at most 16 directions; 32 params, 14 gauge.
        let model = GateSet::std1q_xy();
        let germs = GateSequence::parse_list("Gx").unwrap();
        let report = test_germ_set_finite(&model, &germs, 1, None, 1e-6).unwrap();
        assert!(!report.success);
        assert_eq!(report.num_gauge_params, 14);
        assert_eq!(report.spectrum.len(), 32);
    }

    #[test]
    fn test_finite_spectrum_sorted_and_spam_free() {
        let model = GateSet::std1q_xy();
        let report = test_germ_set_finite(&model, &std_germs(), 4, None, 1e-6).unwrap();
        assert_eq!(report.spectrum.len(), 32);
        assert!(report.spectrum.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_finite_standard_germs_pass_at_all_lengths() {
        let model = GateSet::std1q_xy();
        for length in [1, 4, 16] {
            let report = test_germ_set_finite(&model, &std_germs(), length, None, 1e-6).unwrap();
            assert!(report.success, "L={length}");
            assert_eq!(report.num_gauge_params, 14);
            assert!(report.spectrum[report.num_gauge_params] > 1e-6, "L={length}");
        }
    }

    #[test]
    fn test_asymptotic_single_germ_fails() {
        let model = GateSet::std1q_xy();
        let germs = GateSequence::parse_list("Gx").unwrap();
        let report =
            test_germ_set_asymptotic(&model, &germs, ScoreMode::WorstCase, None, 1e6).unwrap();
        assert!(!report.success);
    }

    #[test]
    fn test_asymptotic_standard_germs_pass() {
        let model = GateSet::std1q_xy();
        let report =
            test_germ_set_asymptotic(&model, &std_germs(), ScoreMode::SumReciprocal, None, 1e6)
                .unwrap();
        assert!(report.success, "score {}", report.score);
        assert!(report.score.is_finite());
        assert_eq!(report.success, report.score < 1e6);
    }

    #[test]
    fn test_weights_validated() {
        let model = GateSet::std1q_xy();
        let germs = std_germs();
        let bad = vec![1.0; germs.len() - 1];
        assert!(test_germ_set_asymptotic(&model, &germs, ScoreMode::WorstCase, Some(&bad), 1e6)
            .is_err());
        let nan = vec![f64::NAN; germs.len()];
        assert!(test_germ_set_finite(&model, &germs, 1, Some(&nan), 1e-6).is_err());
    }

    #[test]
    fn test_empty_germ_list_rejected() {
        let model = GateSet::std1q_xy();
        assert!(test_germ_set_finite(&model, &[], 1, None, 1e-6).is_err());
        assert!(test_germ_set_asymptotic(&model, &[], ScoreMode::WorstCase, None, 1e6).is_err());
    }
}
