// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gate model trait.
//!
//! This is the only surface of a physical model the germ-selection engine
//! touches. A model maps gate labels to d×d superoperators, knows its
//! parameterization, and can evaluate products and parameter derivatives of
//! gate sequences.

use ndarray::Array2;

use super::sequence::GateSequence;
use crate::error::Result;

/// Products and flattened derivatives for a batch of sequences.
#[derive(Debug, Clone)]
pub struct BulkEvaluation {
    /// One d×d product per sequence.
    pub products: Vec<Array2<f64>>,
    /// One d²×P flattened derivative per sequence.
    pub derivatives: Vec<Array2<f64>>,
}

/// A parameterized gate model.
///
/// `Clone` is the model copy; copies are independent of the original.
pub trait GateModel: Clone {
    /// Superoperator dimension d.
    fn dimension(&self) -> usize;

    /// Total number of free parameters P.
    fn num_params(&self) -> usize;

    /// Number of parameter directions that leave every observable unchanged.
    fn num_gauge_params(&self) -> usize;

    /// Labels of the elementary gates, in model order.
    fn elementary_gate_labels(&self) -> Vec<String>;

    /// A copy with all state preparations and measurements removed.
    fn without_spam(&self) -> Self;

    /// Product of the sequence's gates (last gate leftmost).
    fn product(&self, sequence: &GateSequence) -> Result<Array2<f64>>;

    /// Derivative of the product with respect to every model parameter,
    /// flattened row-major to d²×P.
    fn derivative(&self, sequence: &GateSequence) -> Result<Array2<f64>>;

    /// Products and derivatives for many sequences at once.
    ///
    /// Implementations should share intermediate products across sequences;
    /// the default evaluates each sequence independently.
    fn bulk_evaluate(&self, sequences: &[GateSequence]) -> Result<BulkEvaluation> {
        let mut products = Vec::with_capacity(sequences.len());
        let mut derivatives = Vec::with_capacity(sequences.len());
        for seq in sequences {
            products.push(self.product(seq)?);
            derivatives.push(self.derivative(seq)?);
        }
        Ok(BulkEvaluation {
            products,
            derivatives,
        })
    }

    /// A copy with every gate perturbed by a random unitary of the given
    /// strength. The same seed always yields the same copy.
    fn randomize_with_unitary(&self, strength: f64, seed: u64) -> Result<Self>;
}
