// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense, fully parameterized gate set.
//!
//! Every gate is a real d×d Pauli transfer matrix with all d² entries free;
//! every state preparation and measurement effect is a d-vector with all d
//! entries free. Parameters are ordered gates first (row-major within each
//! gate), then preparations, then effects.

use std::f64::consts::PI;

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, SeedableRng};
use tracing::debug;

use super::basis::{
    hermitian_evolution, hilbert_dim, random_hermitian, rotation, unitary_to_ptm, Axis,
};
use super::eval::EvalPlan;
use super::r#trait::{BulkEvaluation, GateModel};
use super::sequence::GateSequence;
use crate::error::{Error, Result, ValidationError};
use crate::linalg::matrix_rank;

/// Relative singular-value cutoff for counting gauge directions.
const GAUGE_RANK_RTOL: f64 = 1e-9;

/// A labeled state preparation or measurement effect.
#[derive(Debug, Clone)]
pub struct SpamVector {
    pub label: String,
    pub vector: Array1<f64>,
}

/// Gate set with dense Pauli-transfer-matrix gates.
#[derive(Debug, Clone)]
pub struct GateSet {
    dim: usize,
    labels: Vec<String>,
    gates: Vec<Array2<f64>>,
    preps: Vec<SpamVector>,
    effects: Vec<SpamVector>,
}

impl GateSet {
    /// Create an empty gate set of superoperator dimension `dim`.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(ValidationError::Field {
                field: "dimension".into(),
                message: "must be greater than 0".into(),
            }
            .into());
        }
        Ok(Self {
            dim,
            labels: Vec::new(),
            gates: Vec::new(),
            preps: Vec::new(),
            effects: Vec::new(),
        })
    }

    /// Add a gate. Labels must be unique.
    pub fn add_gate(&mut self, label: impl Into<String>, matrix: Array2<f64>) -> Result<()> {
        let label = label.into();
        if self.labels.contains(&label) {
            return Err(ValidationError::Field {
                field: "gate".into(),
                message: format!("duplicate gate label '{}'", label),
            }
            .into());
        }
        for extent in [matrix.nrows(), matrix.ncols()] {
            if extent != self.dim {
                return Err(ValidationError::DimensionMismatch {
                    context: format!("gate '{}'", label),
                    expected: self.dim,
                    actual: extent,
                }
                .into());
            }
        }
        self.labels.push(label);
        self.gates.push(matrix);
        Ok(())
    }

    /// Add a state preparation vector.
    pub fn add_prep(&mut self, label: impl Into<String>, vector: Array1<f64>) -> Result<()> {
        let spam = self.spam_vector(label.into(), vector)?;
        self.preps.push(spam);
        Ok(())
    }

    /// Add a measurement effect vector.
    pub fn add_effect(&mut self, label: impl Into<String>, vector: Array1<f64>) -> Result<()> {
        let spam = self.spam_vector(label.into(), vector)?;
        self.effects.push(spam);
        Ok(())
    }

    fn spam_vector(&self, label: String, vector: Array1<f64>) -> Result<SpamVector> {
        if vector.len() != self.dim {
            return Err(ValidationError::DimensionMismatch {
                context: format!("SPAM vector '{}'", label),
                expected: self.dim,
                actual: vector.len(),
            }
            .into());
        }
        Ok(SpamVector { label, vector })
    }

    /// Gate matrix by label.
    pub fn gate(&self, label: &str) -> Option<&Array2<f64>> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| &self.gates[i])
    }

    pub fn preps(&self) -> &[SpamVector] {
        &self.preps
    }

    pub fn effects(&self) -> &[SpamVector] {
        &self.effects
    }

    /// Resolve a sequence to gate indices.
    fn resolve(&self, sequence: &GateSequence) -> Result<Vec<usize>> {
        sequence
            .labels()
            .iter()
            .map(|label| {
                self.labels
                    .iter()
                    .position(|l| l == label)
                    .ok_or_else(|| Error::from(ValidationError::UnknownGate(label.clone())))
            })
            .collect()
    }

    /// Gauge Jacobian: P × d², one column per generator T = E_ab of the
    /// gauge group G -> S·G·S⁻¹ (S = I + εT).
    ///
    /// - gate block:   vec(T·G − G·T)
    /// - prep block:   T·ρ
    /// - effect block: −Tᵀ·E
    fn gauge_jacobian(&self) -> Array2<f64> {
        let d = self.dim;
        let d2 = d * d;
        let mut jac = Array2::zeros((self.num_params(), d2));
        for a in 0..d {
            for b in 0..d {
                let col = a * d + b;
                for (g, gate) in self.gates.iter().enumerate() {
                    let offset = g * d2;
                    for j in 0..d {
                        // (T·G)[a, j] = G[b, j]
                        jac[[offset + a * d + j, col]] += gate[[b, j]];
                    }
                    for i in 0..d {
                        // (G·T)[i, b] = G[i, a]
                        jac[[offset + i * d + b, col]] -= gate[[i, a]];
                    }
                }
                let mut offset = self.gates.len() * d2;
                for prep in &self.preps {
                    jac[[offset + a, col]] += prep.vector[b];
                    offset += d;
                }
                for effect in &self.effects {
                    jac[[offset + b, col]] -= effect.vector[a];
                    offset += d;
                }
            }
        }
        jac
    }

    /// Standard single-qubit model with Gx = X(π/2) and Gy = Y(π/2).
    pub fn std1q_xy() -> Self {
        Self::std1q(&[("Gx", Some(Axis::X)), ("Gy", Some(Axis::Y))])
    }

    /// Standard single-qubit model with Gi, Gx = X(π/2) and Gy = Y(π/2).
    pub fn std1q_xyi() -> Self {
        Self::std1q(&[("Gi", None), ("Gx", Some(Axis::X)), ("Gy", Some(Axis::Y))])
    }

    fn std1q(gates_axes: &[(&str, Option<Axis>)]) -> Self {
        let mut gates = Vec::with_capacity(gates_axes.len());
        let mut labels = Vec::with_capacity(gates_axes.len());
        for (label, axis) in gates_axes {
            let u = match axis {
                Some(axis) => rotation(*axis, PI / 2.0),
                None => rotation(Axis::Z, 0.0),
            };
            // Single-qubit unitaries always have a PTM.
            let ptm = unitary_to_ptm(&u).unwrap_or_else(|_| Array2::eye(4));
            labels.push((*label).to_string());
            gates.push(ptm);
        }

        let r = 1.0 / 2f64.sqrt();
        Self {
            dim: 4,
            labels,
            gates,
            preps: vec![SpamVector {
                label: "rho0".into(),
                vector: Array1::from(vec![r, 0.0, 0.0, r]),
            }],
            effects: vec![SpamVector {
                label: "E0".into(),
                vector: Array1::from(vec![r, 0.0, 0.0, -r]),
            }],
        }
    }
}

impl GateModel for GateSet {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn num_params(&self) -> usize {
        self.gates.len() * self.dim * self.dim + (self.preps.len() + self.effects.len()) * self.dim
    }

    fn num_gauge_params(&self) -> usize {
        matrix_rank(&self.gauge_jacobian(), GAUGE_RANK_RTOL)
    }

    fn elementary_gate_labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn without_spam(&self) -> Self {
        Self {
            dim: self.dim,
            labels: self.labels.clone(),
            gates: self.gates.clone(),
            preps: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn product(&self, sequence: &GateSequence) -> Result<Array2<f64>> {
        let mut eval = self.bulk_evaluate(std::slice::from_ref(sequence))?;
        Ok(eval.products.swap_remove(0))
    }

    fn derivative(&self, sequence: &GateSequence) -> Result<Array2<f64>> {
        let mut eval = self.bulk_evaluate(std::slice::from_ref(sequence))?;
        Ok(eval.derivatives.swap_remove(0))
    }

    fn bulk_evaluate(&self, sequences: &[GateSequence]) -> Result<BulkEvaluation> {
        let resolved = sequences
            .iter()
            .map(|s| self.resolve(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(EvalPlan::new(resolved).evaluate(&self.gates, self.dim, self.num_params()))
    }

    fn randomize_with_unitary(&self, strength: f64, seed: u64) -> Result<Self> {
        let n = hilbert_dim(self.dim)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut randomized = self.clone();
        for gate in randomized.gates.iter_mut() {
            let h = random_hermitian(n, &mut rng);
            let ptm = unitary_to_ptm(&hermitian_evolution(&h, strength))?;
            *gate = ptm.dot(gate);
        }
        debug!(strength, seed, gates = randomized.gates.len(), "Randomized gate set");
        Ok(randomized)
    }
}
