// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for germ-selection requests.

use crate::error::{Result, ValidationError};
use crate::model::GateSequence;

/// Validate a candidate germ list.
pub fn validate_germs(germs: &[GateSequence]) -> Result<()> {
    if germs.is_empty() {
        return Err(ValidationError::Field {
            field: "germs".into(),
            message: "candidate list cannot be empty".into(),
        }
        .into());
    }

    for (i, germ) in germs.iter().enumerate() {
        if germ.is_empty() {
            return Err(ValidationError::Field {
                field: "germs".into(),
                message: format!("germ at index {} is empty", i),
            }
            .into());
        }
        if let Some(j) = germs[..i].iter().position(|g| g == germ) {
            return Err(ValidationError::Field {
                field: "germs".into(),
                message: format!("germ {} at index {} duplicates index {}", germ, i, j),
            }
            .into());
        }
    }

    Ok(())
}

/// Validate per-germ weights.
pub fn validate_weights(weights: &[f64], num_germs: usize) -> Result<()> {
    if weights.len() != num_germs {
        return Err(ValidationError::Field {
            field: "weights".into(),
            message: format!(
                "length {} does not match number of germs {}",
                weights.len(),
                num_germs
            ),
        }
        .into());
    }

    // Check for NaN or Inf
    for (i, val) in weights.iter().enumerate() {
        if val.is_nan() {
            return Err(ValidationError::Field {
                field: "weights".into(),
                message: format!("contains NaN at index {}", i),
            }
            .into());
        }
        if val.is_infinite() {
            return Err(ValidationError::Field {
                field: "weights".into(),
                message: format!("contains Inf at index {}", i),
            }
            .into());
        }
    }

    Ok(())
}

/// Validate an initial inclusion vector.
pub fn validate_initial_weights(initial: &[bool], num_germs: usize) -> Result<()> {
    if initial.len() != num_germs {
        return Err(ValidationError::Field {
            field: "initial_weights".into(),
            message: format!(
                "length {} does not match number of germs {}",
                initial.len(),
                num_germs
            ),
        }
        .into());
    }
    Ok(())
}

/// Parse an inclusion vector written as 0/1 digits, optionally separated by
/// commas or whitespace ("1,0,1" or "101").
pub fn parse_inclusion_bits(s: &str) -> Result<Vec<bool>> {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| match c {
            '1' => Ok(true),
            '0' => Ok(false),
            other => Err(ValidationError::Field {
                field: "initial_weights".into(),
                message: format!("unexpected character '{}' (expected 0 or 1)", other),
            }
            .into()),
        })
        .collect()
}

/// Whether the first candidates are exactly the elementary gates, in order.
pub fn has_singleton_prefix(germs: &[GateSequence], gate_labels: &[String]) -> bool {
    germs.len() >= gate_labels.len()
        && germs
            .iter()
            .zip(gate_labels)
            .all(|(germ, label)| germ.labels() == std::slice::from_ref(label))
}
