// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Germ selection.
//!
//! A germ is a short gate sequence that is repeated to amplify a model's
//! sensitivity to its parameters. Repeating germ g amplifies exactly the
//! parameter directions that survive twirling the derivative of g with
//! respect to g's own eigenspaces. This module:
//!
//! - builds the twirled Jacobian of every candidate germ ([`twirl`], [`deriv`]),
//! - scores germ subsets by the non-gauge spectrum of Σ JᴴJ ([`score`]),
//! - tests a germ set for completeness ([`completeness`]),
//! - searches for a small complete subset, for one model or robustly over
//!   several ([`optimize`], [`robust`]).
//!
//! # Example
//!
//! ```no_run
//! use qubit_os_germsel::germsel::{optimize_germ_set, OptimizerConfig};
//! use qubit_os_germsel::model::{GateSequence, GateSet};
//!
//! let model = GateSet::std1q_xy();
//! let germs = GateSequence::parse_list("Gx,Gy,GxGy,GxGxGy,GxGyGy").unwrap();
//! let selection = optimize_germ_set(&model, &germs, &OptimizerConfig::default()).unwrap();
//! println!("{} germs, score {:.3}", selection.germs.len(), selection.score);
//! ```

pub mod completeness;
pub mod deriv;
pub mod mask;
pub mod observer;
pub mod optimize;
pub mod robust;
pub mod score;
pub mod twirl;
pub mod types;

pub use completeness::{test_germ_set_asymptotic, test_germ_set_finite, CompletenessReport};
pub use deriv::{Diagnostic, TwirledDerivativeEngine, TwirledDerivatives};
pub use mask::{GermMask, ScoreCache};
pub use observer::{SearchEvent, SearchObserver, TracingObserver};
pub use optimize::{optimize_germ_set, GermSetOptimizer};
pub use robust::{optimize_germ_set_robust, optimize_germ_set_robust_with_observer};
pub use score::{AmplificationScorer, ScoreMode};
pub use twirl::{Twirl, TwirlOperator};
pub use types::{
    CheckSeverity, GermSelection, OptimizerConfig, RobustConfig, RobustModels, RobustOutcome,
    Slack, Termination, TwirlConvention,
};
