// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared evaluation plan for sequence products and derivatives.
//!
//! For a sequence s_0 s_1 … s_{n-1} the product is G = G_{s_{n-1}} ··· G_{s_0}.
//! Two chains are built per sequence:
//!
//! - forward:  F[0] = I, F[m] = G_{s_{m-1}} · F[m-1]   (first m gates)
//! - backward: B[n] = I, B[m] = B[m+1] · G_{s_m}       (gates from m on)
//!
//! so F[n] = B[0] = G. The derivative with respect to element (a, b) of gate
//! g collects B[m+1] · E_ab · F[m] over every position m with s_m = g, which in
//! row-major vectorization is the block Σ_m kron(B[m+1], F[m]ᵀ).
//!
//! Forward chains are keyed by prefix, so sequences sharing a prefix (germs
//! and their powers, for instance) compute it once per plan.

use std::collections::HashMap;

use ndarray::{linalg::kron, s, Array2};
use tracing::debug;

use super::r#trait::BulkEvaluation;

/// A batch of sequences, already resolved to gate indices.
#[derive(Debug, Clone)]
pub struct EvalPlan {
    sequences: Vec<Vec<usize>>,
}

impl EvalPlan {
    pub fn new(sequences: Vec<Vec<usize>>) -> Self {
        Self { sequences }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Evaluate products and flattened derivatives.
    ///
    /// `num_params` is the full parameter count; gate `g` owns columns
    /// `g·d² .. (g+1)·d²`, any remaining columns (SPAM) stay zero.
    pub fn evaluate(&self, gates: &[Array2<f64>], dim: usize, num_params: usize) -> BulkEvaluation {
        let mut prefixes: HashMap<&[usize], Array2<f64>> = HashMap::new();
        let mut products = Vec::with_capacity(self.sequences.len());
        let mut derivatives = Vec::with_capacity(self.sequences.len());
        let mut computed = 0usize;

        for seq in &self.sequences {
            let mut forward = Vec::with_capacity(seq.len() + 1);
            forward.push(Array2::eye(dim));
            for m in 1..=seq.len() {
                let key = &seq[..m];
                let next = match prefixes.get(key) {
                    Some(p) => p.clone(),
                    None => {
                        let p = gates[seq[m - 1]].dot(&forward[m - 1]);
                        prefixes.insert(key, p.clone());
                        computed += 1;
                        p
                    }
                };
                forward.push(next);
            }

            let backward = backward_chain(gates, seq, dim);
            products.push(forward[seq.len()].clone());
            derivatives.push(sequence_derivative(
                seq, &forward, &backward, dim, num_params,
            ));
        }

        debug!(
            sequences = self.sequences.len(),
            prefix_products = computed,
            "Evaluated sequence plan"
        );

        BulkEvaluation {
            products,
            derivatives,
        }
    }
}

/// Backward chain: B[n] = I, B[m] = B[m+1] · G_{s_m}.
fn backward_chain(gates: &[Array2<f64>], seq: &[usize], dim: usize) -> Vec<Array2<f64>> {
    let n = seq.len();
    let mut chain = vec![Array2::eye(dim); n + 1];
    for m in (0..n).rev() {
        chain[m] = chain[m + 1].dot(&gates[seq[m]]);
    }
    chain
}

/// Flattened d²×P derivative from precomputed chains.
fn sequence_derivative(
    seq: &[usize],
    forward: &[Array2<f64>],
    backward: &[Array2<f64>],
    dim: usize,
    num_params: usize,
) -> Array2<f64> {
    let d2 = dim * dim;
    let mut deriv = Array2::zeros((d2, num_params));
    for (m, &g) in seq.iter().enumerate() {
        let block = kron(&backward[m + 1], &forward[m].t());
        let mut target = deriv.slice_mut(s![.., g * d2..(g + 1) * d2]);
        target += &block;
    }
    deriv
}
