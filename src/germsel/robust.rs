// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Germ selection that is robust over several models.

use tracing::info;

use super::completeness::test_germ_set_asymptotic;
use super::observer::{SearchEvent, SearchObserver, TracingObserver};
use super::optimize::GermSetOptimizer;
use super::types::{OptimizerConfig, RobustConfig, RobustModels, RobustOutcome};
use crate::error::{Error, Result};
use crate::model::{GateModel, GateSequence};
use crate::validation::validate_germs;

/// Expand `RobustModels` into the concrete model list.
fn resolve_models<M: GateModel>(models: RobustModels<M>, config: &RobustConfig) -> Result<Vec<M>> {
    let strength = config.randomization_strength;
    match models {
        RobustModels::Explicit(list) => {
            if list.is_empty() {
                return Err(Error::Config("robust search needs at least one model".into()));
            }
            if !config.randomize {
                return Ok(list);
            }
            list.iter()
                .enumerate()
                .map(|(i, m)| {
                    m.randomize_with_unitary(strength, config.seed.wrapping_add(i as u64))
                })
                .collect()
        }
        RobustModels::Copies { base, num_copies } => {
            if num_copies == 0 {
                return Err(Error::Config("num_copies must be > 0".into()));
            }
            (0..num_copies)
                .map(|i| {
                    base.randomize_with_unitary(strength, config.seed.wrapping_add(i as u64))
                })
                .collect()
        }
    }
}

/// Select germs that score well on every model, reporting through `tracing`.
pub fn optimize_germ_set_robust<M: GateModel>(
    models: RobustModels<M>,
    germs: &[GateSequence],
    optimizer: &OptimizerConfig,
    robust: &RobustConfig,
) -> Result<RobustOutcome> {
    optimize_germ_set_robust_with_observer(models, germs, optimizer, robust, &mut TracingObserver)
}

/// Select germs that score well on every model.
///
/// The full candidate set must already pass the asymptotic completeness test
/// on every model (same score mode, `robust.threshold`); otherwise the
/// first failing model is reported and no search runs.
pub fn optimize_germ_set_robust_with_observer<M, O>(
    models: RobustModels<M>,
    germs: &[GateSequence],
    optimizer: &OptimizerConfig,
    robust: &RobustConfig,
    observer: &mut O,
) -> Result<RobustOutcome>
where
    M: GateModel,
    O: SearchObserver + ?Sized,
{
    let search = GermSetOptimizer::new(optimizer.clone())?;
    robust.validate()?;
    validate_germs(germs)?;
    let models = resolve_models(models, robust)?;

    for (model_index, model) in models.iter().enumerate() {
        let report =
            test_germ_set_asymptotic(model, germs, optimizer.score_mode, None, robust.threshold)?;
        if !report.success {
            observer.on_event(&SearchEvent::Aborted { model_index });
            return Ok(RobustOutcome::Infeasible {
                model_index,
                report,
            });
        }
    }
    info!(
        models = models.len(),
        "Full germ set succeeds on all models; searching for best subset"
    );

    let scorers = models
        .iter()
        .map(|m| search.build_scorer(m, germs))
        .collect::<Result<Vec<_>>>()?;
    let singletons = search.singleton_count(&models[0], germs);
    let selection = search.search(&scorers, germs, singletons, observer)?;
    Ok(RobustOutcome::Selected(selection))
}
