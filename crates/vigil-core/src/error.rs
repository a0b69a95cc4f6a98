// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Vigil incident service.

use thiserror::Error;

use crate::types::{Channel, IncidentStatus};

/// The primary error type used across all Vigil components.
#[derive(Debug, Error)]
pub enum VigilError {
    /// No incident exists with the requested id.
    #[error("incident not found: {id}")]
    NotFound { id: String },

    /// A requested status change is not an edge in the lifecycle graph.
    /// The incident is left unmodified.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
    },

    /// Optimistic-concurrency mismatch: the caller's version is stale.
    /// The caller is expected to re-read and re-issue the update.
    #[error("version conflict on incident {id}")]
    Conflict { id: String },

    /// Malformed input at the API boundary (missing fields, bad enum values).
    #[error("validation error: {0}")]
    Validation(String),

    /// A channel could not be reached after exhausting retries.
    #[error("delivery failed on {channel}: {message}")]
    Delivery {
        channel: Channel,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A malformed alert rule. Prevents only that rule from firing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel sender errors (connection failure, provider rejection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// True if the error is caller-correctable and must never be retried
    /// automatically (spec'd propagation: surface directly to the caller).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            VigilError::NotFound { .. }
                | VigilError::InvalidTransition { .. }
                | VigilError::Conflict { .. }
                | VigilError::Validation(_)
        )
    }
}
