// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Search progress reporting.

use tracing::{debug, info, warn};

use super::types::Termination;

/// A step of the germ-set search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    IterationStarted {
        iteration: usize,
        score: f64,
        num_germs: usize,
    },
    /// Moved to a neighbor without slack.
    NeighborAccepted { score: f64, num_germs: usize },
    /// No neighbor improved; the score bound was relaxed by the slack.
    Relaxed { from: f64, to: f64 },
    Terminated {
        reason: Termination,
        score: f64,
        num_germs: usize,
    },
    /// The full candidate set failed on a model; no search was run.
    Aborted { model_index: usize },
}

/// Receives search events.
pub trait SearchObserver {
    fn on_event(&mut self, event: &SearchEvent);
}

impl<F: FnMut(&SearchEvent)> SearchObserver for F {
    fn on_event(&mut self, event: &SearchEvent) {
        self(event)
    }
}

/// Forwards search events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_event(&mut self, event: &SearchEvent) {
        match *event {
            SearchEvent::IterationStarted {
                iteration,
                score,
                num_germs,
            } => info!(iteration, score, num_germs, "Germ search iteration"),
            SearchEvent::NeighborAccepted { score, num_germs } => {
                debug!(score, num_germs, "Found better neighbor")
            }
            SearchEvent::Relaxed { from, to } => {
                debug!(from, to, "No better neighbor; relaxing score with slack")
            }
            SearchEvent::Terminated {
                reason,
                score,
                num_germs,
            } => info!(?reason, score, num_germs, "Germ search finished"),
            SearchEvent::Aborted { model_index } => {
                warn!(model_index, "Full germ set fails on model; aborting search")
            }
        }
    }
}
