// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Germ Selection
//!
//! Selects small, complete sets of germs for gate set tomography. A germ
//! set is complete when repeating its germs amplifies every non-gauge
//! parameter of the gate model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Greedy search / robust search     │
//! ├──────────────────┬──────────────────────┤
//! │  Scoring (JᴴJ)   │  Completeness tests  │
//! ├──────────────────┴──────────────────────┤
//! │     Twirled germ derivatives             │
//! ├─────────────────────────────────────────┤
//! │  Gate model (PTM gate set, gauge, eval)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`model`]: Gate models, gate sequences and derivative evaluation
//! - [`germsel`]: Twirling, scoring, completeness tests and germ search
//! - [`linalg`]: Dense linear algebra helpers
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod config;
pub mod error;
pub mod germsel;
pub mod linalg;
pub mod model;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
