// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Vigil incident service.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Vigil workspace. The storage and channel
//! adapter crates implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VigilError;
pub use traits::{ChannelSender, IncidentStore};
pub use types::{
    AuditEntry, Channel, ChannelOutcome, Comment, DeliveryReceipt, DeliveryState, EventType,
    HealthStatus, Incident, IncidentFilter, IncidentPatch, IncidentStatus, NotificationEvent,
    NotificationMessage, Severity, dedupe_key,
};
