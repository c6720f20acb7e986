// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gate sequences.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationError};

/// An ordered sequence of gate labels, applied first to last.
///
/// The text form concatenates labels, each starting with an uppercase ASCII
/// letter (`"GxGxGy"`); the empty sequence is written `"{}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateSequence {
    labels: Vec<String>,
}

impl GateSequence {
    /// Build a sequence from gate labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// The empty sequence.
    pub fn empty() -> Self {
        Self { labels: Vec::new() }
    }

    /// Gate labels in application order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of gates.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// This sequence repeated `power` times.
    pub fn repeat(&self, power: usize) -> Self {
        let mut labels = Vec::with_capacity(self.labels.len() * power);
        for _ in 0..power {
            labels.extend(self.labels.iter().cloned());
        }
        Self { labels }
    }

    /// Parse a comma-separated list of sequences (`"Gx,Gy,GxGy"`).
    pub fn parse_list(s: &str) -> Result<Vec<Self>, Error> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for GateSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, "{{}}");
        }
        for label in &self.labels {
            write!(f, "{}", label)?;
        }
        Ok(())
    }
}

impl FromStr for GateSequence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if s.is_empty() || s == "{}" {
            return Ok(Self::empty());
        }
        if !s.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(ValidationError::Field {
                field: "sequence".into(),
                message: format!("'{}' must start with an uppercase gate label", s),
            }
            .into());
        }

        let mut labels = Vec::new();
        let mut current = String::new();
        for ch in s.chars() {
            if ch.is_ascii_uppercase() && !current.is_empty() {
                labels.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
        labels.push(current);
        Ok(Self { labels })
    }
}
