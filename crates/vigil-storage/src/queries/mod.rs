// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod audit;
pub mod comments;
pub mod events;
pub mod incidents;

/// Outcome of a version-guarded incident mutation.
///
/// Distinguishes "row does not exist" from "row exists but the caller's
/// version is stale" so the adapter can surface `NotFound` vs `Conflict`.
#[derive(Debug)]
pub enum MutationOutcome {
    NotFound,
    Conflict,
    Updated(crate::models::Incident),
}
