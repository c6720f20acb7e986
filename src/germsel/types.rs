// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Germ-selection configuration and result types.

use serde::{Deserialize, Serialize};

use super::completeness::CompletenessReport;
use super::mask::{GermMask, ScoreCache};
use super::score::ScoreMode;
use crate::error::{Error, Result};
use crate::model::GateSequence;

/// Kronecker ordering used when accumulating the twirl superoperator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TwirlConvention {
    /// Σ kron(A, Aᵗ): the projection X -> Σ A·X·A on row-major vec(X).
    #[default]
    Standard,
    /// Σ kron(Aᵗ, A).
    Transposed,
}

/// How derivative-check mismatches are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckSeverity {
    /// Log and return a diagnostic.
    #[default]
    Warn,
    /// Fail with `Error::Numeric`.
    Error,
}

/// Resolved slack rule for the relaxation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slack {
    /// Add a constant to the current score.
    Fixed(f64),
    /// Add a fraction of the current score.
    Fraction(f64),
}

impl Slack {
    /// Slack amount at the given score.
    pub fn amount(&self, score: f64) -> f64 {
        match *self {
            Slack::Fixed(value) => value,
            Slack::Fraction(frac) => frac * score,
        }
    }
}

/// Configuration for the germ-set optimizer.
///
/// Exactly one of `fixed_slack` and `slack_fraction` must be set. The default
/// uses a 10% slack fraction; a config file that switches to a fixed slack
/// should set `slack_fraction: ~`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum number of search iterations.
    pub max_iterations: usize,
    /// Constant slack added to the score when relaxing.
    pub fixed_slack: Option<f64>,
    /// Slack as a fraction of the current score.
    pub slack_fraction: Option<f64>,
    /// Reduction of the non-gauge spectrum to a score.
    pub score_mode: ScoreMode,
    /// Eigenvalue degeneracy tolerance for twirling.
    pub degeneracy_tol: f64,
    /// Cross-check bulk derivatives against the single-germ path.
    pub check: bool,
    pub check_severity: CheckSeverity,
    /// Require every elementary gate to stay in the set.
    pub force_singletons: bool,
    /// Score assigned to sets missing an elementary gate.
    pub singleton_sentinel: f64,
    pub twirl_convention: TwirlConvention,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            fixed_slack: None,
            slack_fraction: Some(0.1),
            score_mode: ScoreMode::WorstCase,
            degeneracy_tol: 1e-6,
            check: false,
            check_severity: CheckSeverity::Warn,
            force_singletons: true,
            singleton_sentinel: 1e100,
            twirl_convention: TwirlConvention::Standard,
        }
    }
}

impl OptimizerConfig {
    /// Resolve the slack rule.
    ///
    /// # Errors
    /// `Config` if both or neither slack is set, or the value is not positive.
    pub fn slack(&self) -> Result<Slack> {
        let slack = match (self.fixed_slack, self.slack_fraction) {
            (Some(value), None) => Slack::Fixed(value),
            (None, Some(frac)) => Slack::Fraction(frac),
            _ => {
                return Err(Error::Config(
                    "exactly one of fixed_slack and slack_fraction must be set".into(),
                ))
            }
        };
        let value = match slack {
            Slack::Fixed(v) | Slack::Fraction(v) => v,
        };
        if !(value > 0.0) || !value.is_finite() {
            return Err(Error::Config(format!(
                "slack must be a positive finite number, got {}",
                value
            )));
        }
        Ok(slack)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        self.slack()?;
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be > 0".into()));
        }
        if !(self.degeneracy_tol >= 0.0) {
            return Err(Error::Config("degeneracy_tol must be >= 0".into()));
        }
        if !(self.singleton_sentinel > 0.0) {
            return Err(Error::Config("singleton_sentinel must be > 0".into()));
        }
        Ok(())
    }
}

/// Configuration for the robust (multi-model) search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustConfig {
    /// Number of perturbed copies when starting from a single base model.
    pub num_copies: usize,
    /// Strength of the random unitary perturbation.
    pub randomization_strength: f64,
    /// Seed of the first copy; copy `i` uses `seed + i`.
    pub seed: u64,
    /// Perturb explicitly listed models as well.
    pub randomize: bool,
    /// Completeness threshold for the precondition check.
    pub threshold: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            num_copies: 5,
            randomization_strength: 1e-3,
            seed: 0,
            randomize: true,
            threshold: 1e6,
        }
    }
}

impl RobustConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.randomization_strength >= 0.0) {
            return Err(Error::Config(
                "randomization_strength must be >= 0".into(),
            ));
        }
        if !(self.threshold > 0.0) {
            return Err(Error::Config("threshold must be > 0".into()));
        }
        Ok(())
    }
}

/// Models for a robust search.
#[derive(Debug, Clone)]
pub enum RobustModels<M> {
    /// Use these models (perturbed first if `randomize` is set).
    Explicit(Vec<M>),
    /// `num_copies` perturbed copies of `base`.
    Copies { base: M, num_copies: usize },
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// No neighbor improves, even with slack.
    Stationary,
    /// `max_iterations` reached.
    IterationLimit,
}

/// Result of a germ-set search.
#[derive(Debug, Clone)]
pub struct GermSelection {
    /// Selected germs, in candidate order.
    pub germs: Vec<GateSequence>,
    /// Final inclusion mask over the candidates.
    pub weights: GermMask,
    /// Score of the final set (max over models for robust searches).
    pub score: f64,
    /// Iterations executed.
    pub iterations: usize,
    pub termination: Termination,
    /// Every score computed during the run.
    pub score_cache: ScoreCache,
}

/// Result of a robust search.
#[derive(Debug, Clone)]
pub enum RobustOutcome {
    Selected(GermSelection),
    /// The full candidate set already fails on one of the models, so no
    /// search was run.
    Infeasible {
        model_index: usize,
        report: CompletenessReport,
    },
}

impl RobustOutcome {
    /// The selection, if the search ran.
    pub fn selection(&self) -> Option<&GermSelection> {
        match self {
            RobustOutcome::Selected(selection) => Some(selection),
            RobustOutcome::Infeasible { .. } => None,
        }
    }
}
