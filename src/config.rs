// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for germ selection.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. germsel.yaml file
//! 3. Environment variables (QUBITOS_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};
use crate::germsel::{OptimizerConfig, RobustConfig, ScoreMode};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Greedy search settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Completeness test settings
    #[serde(default)]
    pub completeness: CompletenessConfig,

    /// Multi-model search settings
    #[serde(default)]
    pub robust: RobustConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        // Load from file if specified
        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            // Try default locations
            for path in &["germsel.yaml", "germsel.yml", "/etc/qubitos/germsel.yaml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from a key lookup.
    ///
    /// Unparsable numbers are ignored; an unknown score mode is an error.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("QUBITOS_GERMSEL_MAX_ITER") {
            if let Ok(n) = val.parse() {
                self.optimizer.max_iterations = n;
            }
        }
        if let Some(val) = lookup("QUBITOS_GERMSEL_SCORE_MODE") {
            self.optimizer.score_mode = val.parse::<ScoreMode>()?;
        }
        // Setting one slack form clears the other
        if let Some(val) = lookup("QUBITOS_GERMSEL_FIXED_SLACK") {
            if let Ok(v) = val.parse() {
                self.optimizer.fixed_slack = Some(v);
                self.optimizer.slack_fraction = None;
            }
        }
        if let Some(val) = lookup("QUBITOS_GERMSEL_SLACK_FRAC") {
            if let Ok(v) = val.parse() {
                self.optimizer.slack_fraction = Some(v);
                self.optimizer.fixed_slack = None;
            }
        }
        if let Some(val) = lookup("QUBITOS_GERMSEL_SEED") {
            if let Ok(seed) = val.parse() {
                self.robust.seed = seed;
            }
        }
        if let Some(val) = lookup("QUBITOS_GERMSEL_THRESHOLD") {
            if let Ok(t) = val.parse() {
                self.completeness.threshold = t;
                self.robust.threshold = t;
            }
        }
        if let Some(val) = lookup("QUBITOS_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.optimizer.validate()?;
        self.robust.validate()?;
        self.completeness.validate()?;
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(Error::Config(format!(
                "unknown log format '{}' (expected 'json' or 'pretty')",
                self.logging.format
            )));
        }
        Ok(())
    }
}

/// Completeness test configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessConfig {
    /// Eigenvalue cutoff for the finite-length test
    #[serde(default = "default_finite_tol")]
    pub finite_tol: f64,

    /// Score threshold for the asymptotic test
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Germ power for the finite-length test
    #[serde(default = "default_finite_length")]
    pub finite_length: usize,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            finite_tol: default_finite_tol(),
            threshold: default_threshold(),
            finite_length: default_finite_length(),
        }
    }
}

impl CompletenessConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.finite_tol >= 0.0) {
            return Err(Error::Config("finite_tol must be >= 0".into()));
        }
        if !(self.threshold > 0.0) {
            return Err(Error::Config("threshold must be > 0".into()));
        }
        if self.finite_length == 0 {
            return Err(Error::Config("finite_length must be > 0".into()));
        }
        Ok(())
    }
}

fn default_finite_tol() -> f64 {
    1e-6
}

fn default_threshold() -> f64 {
    1e6
}

fn default_finite_length() -> usize {
    16
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
