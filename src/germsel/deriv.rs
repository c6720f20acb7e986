// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Twirled derivatives of germs.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::{debug, warn};

use super::twirl::TwirlOperator;
use super::types::CheckSeverity;
use crate::error::{Error, Result};
use crate::linalg::{frobenius_norm, to_complex};
use crate::model::{GateModel, GateSequence};

/// Frobenius norm of bulk − single above which the two paths disagree.
const CHECK_TOL: f64 = 1e-6;
/// Eigenbasis condition number above which a twirl is flagged.
const MAX_CONDITION: f64 = 1e10;
/// Eigenpair residual above which a twirl is flagged.
const MAX_RESIDUAL: f64 = 1e-6;

/// A numerical problem found while checking twirled derivatives.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Bulk and single-germ derivatives have different norms.
    DerivativeMismatch {
        germ: GateSequence,
        bulk_norm: f64,
        single_norm: f64,
    },
    /// The germ's eigenbasis is (near-)singular or not an eigenbasis.
    IllConditioned {
        germ: GateSequence,
        condition_number: f64,
        max_residual: f64,
    },
}

/// Twirled Jacobians for a list of germs.
#[derive(Debug, Clone)]
pub struct TwirledDerivatives {
    /// One d²×P Jacobian per germ, in input order.
    pub jacobians: Vec<Array2<Complex64>>,
    /// Empty unless checking is enabled.
    pub diagnostics: Vec<Diagnostic>,
}

/// Computes twirled derivatives: twirl(product(germ)) · derivative(germ).
#[derive(Debug, Clone, Copy)]
pub struct TwirledDerivativeEngine {
    twirl: TwirlOperator,
    check: bool,
    severity: CheckSeverity,
}

impl TwirledDerivativeEngine {
    pub fn new(twirl: TwirlOperator) -> Self {
        Self {
            twirl,
            check: false,
            severity: CheckSeverity::Warn,
        }
    }

    /// Cross-check bulk results against the single-germ path.
    pub fn with_check(mut self, check: bool, severity: CheckSeverity) -> Self {
        self.check = check;
        self.severity = severity;
        self
    }

    /// Twirled derivative of one germ.
    pub fn single_germ<M: GateModel>(&self, model: &M, germ: &GateSequence) -> Result<Array2<Complex64>> {
        let product = model.product(germ)?;
        let derivative = model.derivative(germ)?;
        let twirl = self.twirl.build(&to_complex(&product))?;
        Ok(twirl.apply_to_jacobian(&to_complex(&derivative)))
    }

    /// Twirled derivatives of many germs from one shared model evaluation.
    pub fn bulk<M: GateModel>(&self, model: &M, germs: &[GateSequence]) -> Result<TwirledDerivatives> {
        let eval = model.bulk_evaluate(germs)?;
        let mut jacobians = Vec::with_capacity(germs.len());
        let mut diagnostics = Vec::new();

        for (k, germ) in germs.iter().enumerate() {
            let twirl = self.twirl.build(&to_complex(&eval.products[k]))?;
            let eigen = &twirl.eigen;
            if self.check && eigen.is_ill_conditioned(MAX_CONDITION, MAX_RESIDUAL) {
                warn!(
                    germ = %germ,
                    condition_number = eigen.condition_number,
                    max_residual = eigen.max_residual,
                    "Ill-conditioned eigenbasis in germ twirl"
                );
                diagnostics.push(Diagnostic::IllConditioned {
                    germ: germ.clone(),
                    condition_number: eigen.condition_number,
                    max_residual: eigen.max_residual,
                });
            }
            jacobians.push(twirl.apply_to_jacobian(&to_complex(&eval.derivatives[k])));
        }

        if self.check {
            for (germ, bulk) in germs.iter().zip(&jacobians) {
                let single = self.single_germ(model, germ)?;
                let bulk_norm = frobenius_norm(bulk);
                let single_norm = frobenius_norm(&single);
                let diff = frobenius_norm(&(bulk - &single));
                if diff > CHECK_TOL {
                    let message = format!(
                        "bulk twirled derivative of {} differs from single-germ result (|bulk|={:.6e}, |single|={:.6e})",
                        germ, bulk_norm, single_norm
                    );
                    if self.severity == CheckSeverity::Error {
                        return Err(Error::Numeric(message));
                    }
                    warn!(germ = %germ, bulk_norm, single_norm, "Twirled derivative mismatch");
                    diagnostics.push(Diagnostic::DerivativeMismatch {
                        germ: germ.clone(),
                        bulk_norm,
                        single_norm,
                    });
                }
            }
        }

        debug!(
            germs = germs.len(),
            eps = self.twirl.eps(),
            diagnostics = diagnostics.len(),
            "Computed twirled derivatives"
        );

        Ok(TwirledDerivatives {
            jacobians,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BulkEvaluation, GateSet};
    use crate::test_utils::assert_matrix_close;

    fn engine() -> TwirledDerivativeEngine {
        TwirledDerivativeEngine::new(TwirlOperator::new(1e-6))
    }

    #[test]
    fn test_bulk_matches_single_germ() {
        let model = GateSet::std1q_xy().without_spam();
        let germs = GateSequence::parse_list("Gx,Gy,GxGy,GxGxGy").unwrap();
        let bulk = engine().bulk(&model, &germs).unwrap();
        assert_eq!(bulk.jacobians.len(), 4);
        for (germ, jac) in germs.iter().zip(&bulk.jacobians) {
            assert_eq!(jac.shape(), &[16, 32]);
            let single = engine().single_germ(&model, germ).unwrap();
            assert_matrix_close(jac, &single, 1e-12);
        }
    }

    #[test]
    fn test_check_mode_clean_run_has_no_diagnostics() {
        let model = GateSet::std1q_xy().without_spam();
        let germs = GateSequence::parse_list("Gx,GxGy").unwrap();
        let result = engine()
            .with_check(true, CheckSeverity::Error)
            .bulk(&model, &germs)
            .unwrap();
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_single_gate_twirl_zeroes_off_block_directions() {
        // Twirling w.r.t. Gx keeps only derivative directions that commute
        // with Gx's eigenspace structure, so the rank drops below d².
        let model = GateSet::std1q_xy().without_spam();
        let germ: GateSequence = "Gx".parse().unwrap();
        let jac = engine().single_germ(&model, &germ).unwrap();
        let evals = crate::linalg::hermitian_eigenvalues(&super::super::score::jtj(&jac));
        let max = evals.last().copied().unwrap();
        let rank = evals.iter().filter(|&&l| l > 1e-9 * max).count();
        // {1, 1} block contributes 4 directions, {i} and {-i} one each
        assert_eq!(rank, 6);
    }

    /// Gate set whose bulk path disagrees with its single-sequence path.
    #[derive(Clone)]
    struct SkewedBulk {
        inner: GateSet,
        skew: fn(&mut Array2<f64>),
    }

    impl SkewedBulk {
        fn doubled(inner: GateSet) -> Self {
            Self {
                inner,
                skew: |d| d.mapv_inplace(|x| 2.0 * x),
            }
        }

        fn nudged(inner: GateSet) -> Self {
            Self {
                inner,
                skew: |d| d[[0, 0]] += 1.8e-6,
            }
        }
    }

    impl GateModel for SkewedBulk {
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn num_params(&self) -> usize {
            self.inner.num_params()
        }
        fn num_gauge_params(&self) -> usize {
            self.inner.num_gauge_params()
        }
        fn elementary_gate_labels(&self) -> Vec<String> {
            self.inner.elementary_gate_labels()
        }
        fn without_spam(&self) -> Self {
            Self {
                inner: self.inner.without_spam(),
                skew: self.skew,
            }
        }
        fn product(&self, sequence: &GateSequence) -> Result<Array2<f64>> {
            self.inner.product(sequence)
        }
        fn derivative(&self, sequence: &GateSequence) -> Result<Array2<f64>> {
            self.inner.derivative(sequence)
        }
        fn bulk_evaluate(&self, sequences: &[GateSequence]) -> Result<BulkEvaluation> {
            let mut eval = self.inner.bulk_evaluate(sequences)?;
            for d in eval.derivatives.iter_mut() {
                (self.skew)(d);
            }
            Ok(eval)
        }
        fn randomize_with_unitary(&self, strength: f64, seed: u64) -> Result<Self> {
            Ok(Self {
                inner: self.inner.randomize_with_unitary(strength, seed)?,
                skew: self.skew,
            })
        }
    }

    #[test]
    fn test_check_mode_reports_mismatch() {
        let model = SkewedBulk::doubled(GateSet::std1q_xy().without_spam());
        let germs = GateSequence::parse_list("Gx,Gy").unwrap();

        let result = engine()
            .with_check(true, CheckSeverity::Warn)
            .bulk(&model, &germs)
            .unwrap();
        assert_eq!(result.diagnostics.len(), 2);
        assert!(matches!(
            result.diagnostics[0],
            Diagnostic::DerivativeMismatch { .. }
        ));

        let err = engine()
            .with_check(true, CheckSeverity::Error)
            .bulk(&model, &germs);
        assert!(matches!(err, Err(Error::Numeric(_))));

        // Without checking the mismatch goes unnoticed
        let unchecked = engine().bulk(&model, &germs).unwrap();
        assert!(unchecked.diagnostics.is_empty());
    }

    #[test]
    fn test_check_tolerance_is_absolute() {
        // Twirled Gx Jacobian has norm √6; the (I, I) entry survives twirling,
        // so the difference is 1.8e-6: above 1e-6 but below 1e-6·√6.
        let model = SkewedBulk::nudged(GateSet::std1q_xy().without_spam());
        let germs = GateSequence::parse_list("Gx").unwrap();

        let result = engine()
            .with_check(true, CheckSeverity::Warn)
            .bulk(&model, &germs)
            .unwrap();
        match result.diagnostics.as_slice() {
            [Diagnostic::DerivativeMismatch {
                bulk_norm,
                single_norm,
                ..
            }] => {
                approx::assert_relative_eq!(*single_norm, 6f64.sqrt(), epsilon = 1e-9);
                approx::assert_relative_eq!(*bulk_norm, *single_norm, epsilon = 1e-5);
            }
            other => panic!("expected one mismatch, got {:?}", other),
        }
    }
}
