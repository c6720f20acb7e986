// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Greedy germ-set search with slack relaxation.
//!
//! The search walks the hypercube of inclusion masks one bit flip at a time:
//!
//! 1. Score every neighbor of the current mask (cached per model and mask).
//! 2. Move to the first neighbor that scores no worse and, once the search is
//!    shrink-only, has fewer germs.
//! 3. Otherwise switch to shrink-only and move to the best smaller neighbor
//!    scoring within `score + slack`.
//! 4. Otherwise stop at a stationary point.
//!
//! Starting from the full set the search is shrink-only from the outset.
//! With several models a mask scores as the worst (largest) per-model score.

use tracing::{debug, info, warn};

use super::deriv::TwirledDerivativeEngine;
use super::mask::{GermMask, ScoreCache};
use super::observer::{SearchEvent, SearchObserver, TracingObserver};
use super::score::{germ_contributions, AmplificationScorer};
use super::twirl::TwirlOperator;
use super::types::{GermSelection, OptimizerConfig, Slack, Termination};
use crate::error::{Result, ValidationError};
use crate::model::{GateModel, GateSequence};
use crate::validation::{has_singleton_prefix, validate_germs, validate_initial_weights};

/// Greedy germ-set optimizer.
#[derive(Debug, Clone)]
pub struct GermSetOptimizer {
    config: OptimizerConfig,
    slack: Slack,
    initial: Option<Vec<bool>>,
}

impl GermSetOptimizer {
    /// Create a new optimizer with the given configuration.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        let slack = config.slack()?;
        Ok(Self {
            config,
            slack,
            initial: None,
        })
    }

    /// Start from this inclusion vector instead of the full set.
    pub fn with_initial_weights(mut self, initial: Vec<bool>) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Select germs for a single model, reporting progress through `tracing`.
    pub fn optimize<M: GateModel>(&self, model: &M, germs: &[GateSequence]) -> Result<GermSelection> {
        self.optimize_with_observer(model, germs, &mut TracingObserver)
    }

    /// Select germs for a single model.
    pub fn optimize_with_observer<M, O>(
        &self,
        model: &M,
        germs: &[GateSequence],
        observer: &mut O,
    ) -> Result<GermSelection>
    where
        M: GateModel,
        O: SearchObserver + ?Sized,
    {
        validate_germs(germs)?;
        let scorer = self.build_scorer(model, germs)?;
        let singletons = self.singleton_count(model, germs);
        self.search(&[scorer], germs, singletons, observer)
    }

    /// Precompute per-germ contributions for one model.
    pub(crate) fn build_scorer<M: GateModel>(
        &self,
        model: &M,
        germs: &[GateSequence],
    ) -> Result<AmplificationScorer> {
        let model = model.without_spam();
        let engine = TwirledDerivativeEngine::new(
            TwirlOperator::new(self.config.degeneracy_tol).with_convention(self.config.twirl_convention),
        )
        .with_check(self.config.check, self.config.check_severity);

        let derivs = engine.bulk(&model, germs)?;
        let contributions = germ_contributions(&derivs.jacobians, germs)?;
        let num_gauge_params = model.num_gauge_params();
        debug!(
            germs = germs.len(),
            num_params = model.num_params(),
            num_gauge_params,
            "Precomputed germ contributions"
        );
        Ok(AmplificationScorer::new(
            contributions,
            num_gauge_params,
            self.config.score_mode,
        ))
    }

    /// Number of leading candidates that must stay selected.
    pub(crate) fn singleton_count<M: GateModel>(&self, model: &M, germs: &[GateSequence]) -> usize {
        if !self.config.force_singletons {
            return 0;
        }
        let labels = model.elementary_gate_labels();
        if !has_singleton_prefix(germs, &labels) {
            warn!(
                gates = ?labels,
                "force_singletons is set but the first candidates are not the elementary gates"
            );
        }
        labels.len()
    }

    /// Shared search over one or more models.
    pub(crate) fn search<O>(
        &self,
        scorers: &[AmplificationScorer],
        germs: &[GateSequence],
        singletons: usize,
        observer: &mut O,
    ) -> Result<GermSelection>
    where
        O: SearchObserver + ?Sized,
    {
        let n = germs.len();
        if let Some(scorer) = scorers.iter().find(|s| s.num_germs() != n) {
            return Err(ValidationError::DimensionMismatch {
                context: "germ contributions".into(),
                expected: n,
                actual: scorer.num_germs(),
            }
            .into());
        }
        let (mut weights, mut shrink_only) = match &self.initial {
            Some(initial) => {
                validate_initial_weights(initial, n)?;
                (GermMask::from_bools(initial), false)
            }
            None => (GermMask::full(n), true),
        };

        let mut state = SearchState {
            scorers,
            cache: ScoreCache::new(),
            singletons,
            sentinel: self.config.singleton_sentinel,
        };

        info!(
            germs = n,
            models = scorers.len(),
            mode = ?scorers.first().map(|s| s.mode()),
            num_gauge_params = scorers.first().map_or(0, |s| s.num_gauge_params()),
            "Starting germ set optimization; lower score is better"
        );

        let mut score = state.score(&weights)?;
        let mut count = weights.count();
        let mut termination = Termination::IterationLimit;
        let mut iterations = 0;

        for iteration in 0..self.config.max_iterations {
            iterations = iteration + 1;
            observer.on_event(&SearchEvent::IterationStarted {
                iteration,
                score,
                num_germs: count,
            });

            let mut neighbors = weights
                .neighbors()
                .map(|mask| {
                    let s = state.score(&mask)?;
                    Ok((mask, s))
                })
                .collect::<Result<Vec<_>>>()?;

            if let Some(pos) = neighbors
                .iter()
                .position(|(mask, s)| *s <= score && (mask.count() < count || !shrink_only))
            {
                let (mask, s) = neighbors.swap_remove(pos);
                weights = mask;
                score = s;
                count = weights.count();
                observer.on_event(&SearchEvent::NeighborAccepted {
                    score,
                    num_germs: count,
                });
                continue;
            }

            shrink_only = true;
            let bound = score + self.slack.amount(score);
            observer.on_event(&SearchEvent::Relaxed {
                from: score,
                to: bound,
            });

            let mut best: Option<(GermMask, f64)> = None;
            for (mask, s) in neighbors {
                if mask.count() >= count || !(s <= bound) {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, b)| s < *b) {
                    best = Some((mask, s));
                }
            }

            match best {
                Some((mask, s)) => {
                    weights = mask;
                    score = s;
                    count = weights.count();
                }
                None => {
                    termination = Termination::Stationary;
                    break;
                }
            }
        }

        observer.on_event(&SearchEvent::Terminated {
            reason: termination,
            score,
            num_germs: count,
        });

        Ok(GermSelection {
            germs: weights.ones().map(|i| germs[i].clone()).collect(),
            weights,
            score,
            iterations,
            termination,
            score_cache: state.cache,
        })
    }
}

/// Scoring context for one search run.
struct SearchState<'a> {
    scorers: &'a [AmplificationScorer],
    cache: ScoreCache,
    singletons: usize,
    sentinel: f64,
}

impl SearchState<'_> {
    /// Worst score over all models, computing and caching as needed.
    fn score(&mut self, mask: &GermMask) -> Result<f64> {
        let mut worst = f64::NEG_INFINITY;
        for (index, scorer) in self.scorers.iter().enumerate() {
            let s = match self.cache.get(index, mask) {
                Some(s) => s,
                None => {
                    let s = if mask.has_prefix(self.singletons) {
                        scorer.score_mask(mask)?
                    } else {
                        self.sentinel
                    };
                    self.cache.insert(index, mask.clone(), s)
                }
            };
            worst = worst.max(s);
        }
        Ok(worst)
    }
}

/// Select germs for a single model with the given configuration.
pub fn optimize_germ_set<M: GateModel>(
    model: &M,
    germs: &[GateSequence],
    config: &OptimizerConfig,
) -> Result<GermSelection> {
    GermSetOptimizer::new(config.clone())?.optimize(model, germs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::germsel::completeness::test_germ_set_asymptotic;
    use crate::germsel::score::ScoreMode;
    use crate::model::GateSet;
    use crate::test_utils::RecordingObserver;
    use ndarray::Array2;
    use num_complex::Complex64;

    fn germs(s: &str) -> Vec<GateSequence> {
        GateSequence::parse_list(s).unwrap()
    }

    fn complete_germs() -> Vec<GateSequence> {
        germs("Gx,Gy,GxGy,GxGxGy,GxGyGy,GxGxGyGxGyGy")
    }

    fn fixed_slack(value: f64) -> OptimizerConfig {
        OptimizerConfig {
            fixed_slack: Some(value),
            slack_fraction: None,
            ..Default::default()
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let config = OptimizerConfig {
            fixed_slack: Some(1e-3),
            ..Default::default()
        };
        assert!(matches!(GermSetOptimizer::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_initial_weights_length_checked() {
        let model = GateSet::std1q_xy();
        let optimizer = GermSetOptimizer::new(OptimizerConfig::default())
            .unwrap()
            .with_initial_weights(vec![true, true]);
        assert!(optimizer.optimize(&model, &complete_germs()).is_err());
    }

    // ========================================================================
    // Scenarios on the standard single-qubit model
    // ========================================================================

    #[test]
    fn test_three_candidates_keep_elementary_gates() {
        let model = GateSet::std1q_xy();
        let config = OptimizerConfig {
            max_iterations: 20,
            ..fixed_slack(1e-3)
        };
        let selection = optimize_germ_set(&model, &germs("Gx,Gy,GxGy"), &config).unwrap();

        assert!(selection.weights.get(0) && selection.weights.get(1));
        assert_eq!(selection.germs[0].to_string(), "Gx");
        assert_eq!(selection.germs[1].to_string(), "Gy");
        // The three candidates span 16 of 18 non-gauge directions, so the
        // score is either +∞ or 1/round-off; never the sentinel.
        assert_ne!(selection.score, config.singleton_sentinel);
        assert!(!selection.score.is_nan());
        assert!(selection.score > 1e6);
        assert!(selection.iterations <= 20);
    }

    #[test]
    fn test_complete_set_selection_passes_asymptotic_test() {
        let model = GateSet::std1q_xy();
        for mode in [ScoreMode::WorstCase, ScoreMode::SumReciprocal] {
            let config = OptimizerConfig {
                score_mode: mode,
                ..Default::default()
            };
            let selection = optimize_germ_set(&model, &complete_germs(), &config).unwrap();
            assert!(selection.score < 1e6, "{mode}: {}", selection.score);

            let ones = vec![1.0; selection.germs.len()];
            let report =
                test_germ_set_asymptotic(&model, &selection.germs, mode, Some(&ones), 1e6).unwrap();
            assert!(report.success);
            assert!((report.score - selection.score).abs() <= 1e-6 * selection.score);
        }
    }

    #[test]
    fn test_force_singletons_never_drops_elementary_gates() {
        let model = GateSet::std1q_xy();
        let config = OptimizerConfig {
            score_mode: ScoreMode::SumReciprocal,
            ..fixed_slack(1e6)
        };
        // Huge slack lets the search shrink as far as the sentinel allows
        let selection = optimize_germ_set(&model, &complete_germs(), &config).unwrap();
        assert!(selection.weights.has_prefix(2));
        assert_eq!(selection.termination, Termination::Stationary);
    }

    #[test]
    fn test_without_force_singletons_sentinel_unused() {
        let model = GateSet::std1q_xy();
        let config = OptimizerConfig {
            force_singletons: false,
            max_iterations: 3,
            ..Default::default()
        };
        let selection = optimize_germ_set(&model, &complete_germs(), &config).unwrap();
        assert!(selection
            .score_cache
            .iter()
            .all(|(_, &s)| s != config.singleton_sentinel));
    }

    #[test]
    fn test_cache_holds_every_scored_neighbor() {
        let model = GateSet::std1q_xy();
        let config = OptimizerConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let candidates = complete_germs();
        let selection = optimize_germ_set(&model, &candidates, &config).unwrap();
        // Full set plus its six neighbors
        assert_eq!(selection.score_cache.len(), candidates.len() + 1);
        let full = GermMask::full(candidates.len());
        assert!(selection.score_cache.get(0, &full).is_some());
        // Missing Gx scores the sentinel
        assert_eq!(
            selection.score_cache.get(0, &full.toggled(0)),
            Some(config.singleton_sentinel)
        );
    }

    #[test]
    fn test_iteration_limit_reported() {
        let model = GateSet::std1q_xy();
        let config = OptimizerConfig {
            max_iterations: 1,
            ..fixed_slack(1e6)
        };
        let selection = optimize_germ_set(&model, &complete_germs(), &config).unwrap();
        assert_eq!(selection.termination, Termination::IterationLimit);
        assert_eq!(selection.iterations, 1);
        assert_eq!(selection.germs.len(), 5);
    }

    #[test]
    fn test_observer_sees_iterations_and_termination() {
        let model = GateSet::std1q_xy();
        let optimizer = GermSetOptimizer::new(OptimizerConfig::default()).unwrap();
        let mut observer = RecordingObserver::default();
        let selection = optimizer
            .optimize_with_observer(&model, &complete_germs(), &mut observer)
            .unwrap();

        let started = observer
            .events
            .iter()
            .filter(|e| matches!(e, SearchEvent::IterationStarted { .. }))
            .count();
        assert_eq!(started, selection.iterations);
        assert!(matches!(
            observer.events.last(),
            Some(SearchEvent::Terminated { .. })
        ));
    }

    // ========================================================================
    // Search mechanics on synthetic contributions
    // ========================================================================

    fn diag(values: &[f64]) -> Array2<Complex64> {
        let mut m = Array2::zeros((values.len(), values.len()));
        for (i, &v) in values.iter().enumerate() {
            m[[i, i]] = Complex64::new(v, 0.0);
        }
        m
    }

    fn labels(n: usize) -> Vec<GateSequence> {
        (0..n).map(|i| GateSequence::new([format!("G{}", i)])).collect()
    }

    #[test]
    fn test_redundant_germ_removed_without_slack_growth() {
        // Germ 2 duplicates germ 0 with zero weight of its own
        let scorer = AmplificationScorer::new(
            vec![diag(&[1.0, 0.0]), diag(&[0.0, 1.0]), diag(&[0.0, 0.0])],
            0,
            ScoreMode::WorstCase,
        );
        let optimizer = GermSetOptimizer::new(fixed_slack(1e-9)).unwrap();
        let selection = optimizer
            .search(&[scorer], &labels(3), 0, &mut TracingObserver)
            .unwrap();
        assert_eq!(selection.weights.to_bools(), vec![true, true, false]);
        assert_eq!(selection.termination, Termination::Stationary);
    }

    #[test]
    fn test_relaxation_picks_best_smaller_neighbor() {
        // Dropping germ 1 costs less than dropping germ 0
        let scorer = AmplificationScorer::new(
            vec![diag(&[1.0]), diag(&[0.1]), diag(&[0.5])],
            0,
            ScoreMode::WorstCase,
        );
        let optimizer = GermSetOptimizer::new(fixed_slack(10.0)).unwrap();
        let mut observer = RecordingObserver::default();
        let selection = optimizer
            .search(&[scorer], &labels(3), 0, &mut observer)
            .unwrap();
        assert!(observer
            .events
            .iter()
            .any(|e| matches!(e, SearchEvent::Relaxed { .. })));
        // With a large slack it keeps shrinking to the single best germ
        assert_eq!(selection.weights.to_bools(), vec![true, false, false]);
        assert_eq!(selection.score, 1.0);
    }

    #[test]
    fn test_initial_weights_allow_growth() {
        let scorer = AmplificationScorer::new(
            vec![diag(&[1.0, 0.5]), diag(&[0.0, 1.0])],
            0,
            ScoreMode::WorstCase,
        );
        let optimizer = GermSetOptimizer::new(fixed_slack(1e-9))
            .unwrap()
            .with_initial_weights(vec![true, false]);
        let selection = optimizer
            .search(&[scorer], &labels(2), 0, &mut TracingObserver)
            .unwrap();
        assert_eq!(selection.weights.to_bools(), vec![true, true]);
        approx::assert_relative_eq!(selection.score, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_first_qualifying_neighbor_wins_over_best() {
        // From the empty set both single-germ neighbors improve on +∞;
        // germ 0 comes first even though germ 1 scores better.
        let scorer = AmplificationScorer::new(
            vec![diag(&[1.0]), diag(&[4.0])],
            0,
            ScoreMode::WorstCase,
        );
        let optimizer = GermSetOptimizer::new(fixed_slack(1e-9))
            .unwrap()
            .with_initial_weights(vec![false, false]);
        let mut observer = RecordingObserver::default();
        let selection = optimizer
            .search(&[scorer], &labels(2), 0, &mut observer)
            .unwrap();

        let accepted: Vec<_> = observer
            .events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::NeighborAccepted { score, num_germs } => Some((*score, *num_germs)),
                _ => None,
            })
            .collect();
        assert_eq!(accepted[0], (1.0, 1));
        assert_eq!(selection.weights.to_bools(), vec![true, true]);
        approx::assert_relative_eq!(selection.score, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_no_growth_after_relaxation() {
        // Grow to the full set, relax to a single germ, then refuse to grow
        // back even though the full set scores better.
        let scorer = AmplificationScorer::new(
            vec![diag(&[1.0]), diag(&[1.0])],
            0,
            ScoreMode::WorstCase,
        );
        let optimizer = GermSetOptimizer::new(fixed_slack(10.0))
            .unwrap()
            .with_initial_weights(vec![true, false]);
        let mut observer = RecordingObserver::default();
        let selection = optimizer
            .search(&[scorer], &labels(2), 0, &mut observer)
            .unwrap();

        let accepted = observer
            .events
            .iter()
            .filter(|e| matches!(e, SearchEvent::NeighborAccepted { .. }))
            .count();
        let first_relax = observer
            .events
            .iter()
            .position(|e| matches!(e, SearchEvent::Relaxed { .. }))
            .unwrap();
        assert_eq!(accepted, 1);
        assert!(!observer.events[first_relax..]
            .iter()
            .any(|e| matches!(e, SearchEvent::NeighborAccepted { .. })));
        // Ties among smaller neighbors go to the lowest index
        assert_eq!(selection.weights.to_bools(), vec![false, true]);
        approx::assert_relative_eq!(selection.score, 1.0, epsilon = 1e-12);
        assert_eq!(selection.termination, Termination::Stationary);
        assert_eq!(selection.iterations, 3);
    }

    #[test]
    fn test_contribution_count_must_match_candidates() {
        let scorer = AmplificationScorer::new(vec![diag(&[1.0]), diag(&[1.0])], 0, ScoreMode::WorstCase);
        assert_eq!(scorer.num_germs(), 2);
        let optimizer = GermSetOptimizer::new(fixed_slack(1e-9)).unwrap();
        let result = optimizer.search(&[scorer], &labels(3), 0, &mut TracingObserver);
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::DimensionMismatch { expected: 3, actual: 2, .. }))
        ));
    }

    #[test]
    fn test_multi_model_score_is_worst_case() {
        let a = AmplificationScorer::new(vec![diag(&[2.0]), diag(&[1.0])], 0, ScoreMode::WorstCase);
        let b = AmplificationScorer::new(vec![diag(&[0.5]), diag(&[4.0])], 0, ScoreMode::WorstCase);
        let optimizer = GermSetOptimizer::new(OptimizerConfig {
            max_iterations: 1,
            ..fixed_slack(1e-9)
        })
        .unwrap();
        let selection = optimizer
            .search(&[a, b], &labels(2), 0, &mut TracingObserver)
            .unwrap();
        let full = GermMask::full(2);
        assert_eq!(selection.score_cache.get(0, &full), Some(1.0 / 3.0));
        assert_eq!(selection.score_cache.get(1, &full), Some(1.0 / 4.5));
        // Neighbors: {1} -> max(1, 0.25), {0} -> max(0.5, 2)
        assert_eq!(selection.score_cache.get(1, &full.toggled(0)), Some(0.25));
        assert_eq!(selection.score_cache.len(), 6);
    }
}
