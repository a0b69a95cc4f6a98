// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alert rule evaluation for the Vigil incident service.
//!
//! Rules are compiled once from configuration (`compile_rules`), then
//! evaluated as a pure function against incident changes (`evaluate`).
//! A malformed rule is reported and skipped at compile time; it never blocks
//! other rules or the request that triggered evaluation.

pub mod evaluate;
pub mod rule;

pub use evaluate::{evaluate, evaluate_with_value, relevant_value};
pub use rule::{AlertRule, compile_rules};
