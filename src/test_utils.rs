// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities.

use ndarray::Array2;
use num_complex::Complex64;

use crate::germsel::observer::{SearchEvent, SearchObserver};

/// Assert two complex matrices agree element-wise within `tol`.
pub fn assert_matrix_close(actual: &Array2<Complex64>, expected: &Array2<Complex64>, tol: f64) {
    assert_eq!(actual.shape(), expected.shape(), "shape mismatch");
    for ((idx, a), b) in actual.indexed_iter().zip(expected.iter()) {
        assert!(
            (a - b).norm() <= tol,
            "mismatch at {:?}: {} vs {} (tol {})",
            idx,
            a,
            b,
            tol
        );
    }
}

/// Observer that records every event it sees.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<SearchEvent>,
}

impl SearchObserver for RecordingObserver {
    fn on_event(&mut self, event: &SearchEvent) {
        self.events.push(event.clone());
    }
}
