// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gate models.
//!
//! The germ-selection engine only sees the [`GateModel`] trait. [`GateSet`]
//! is the bundled dense implementation, with built-in single-qubit models
//! for tests and the CLI.

pub mod basis;
pub mod eval;
pub mod gateset;
pub mod sequence;
pub mod r#trait;

pub use gateset::{GateSet, SpamVector};
pub use r#trait::{BulkEvaluation, GateModel};
pub use sequence::GateSequence;
