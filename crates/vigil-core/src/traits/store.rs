// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incident store trait: the only boundary through which durable state is touched.

use async_trait::async_trait;

use crate::error::VigilError;
use crate::types::{
    AuditEntry, ChannelOutcome, Comment, DeliveryState, Incident, IncidentFilter, IncidentPatch,
    NotificationEvent,
};

/// CRUD access to persisted incident and notification-event records.
///
/// All other components depend on storage only through this interface. The
/// implementation owns the per-incident serialization point: `update` and
/// `apply_transition` are guarded by the incident's `version` column, so two
/// concurrent mutations against the same prior state cannot both succeed --
/// one fails with [`VigilError::Conflict`].
#[async_trait]
pub trait IncidentStore: Send + Sync + 'static {
    /// Persist a new incident. The store assigns nothing; the caller supplies
    /// a fully-formed record (id, timestamps, version 1).
    async fn create(&self, incident: &Incident) -> Result<(), VigilError>;

    /// Fetch one incident by id.
    async fn get(&self, id: &str) -> Result<Incident, VigilError>;

    /// List incidents matching the filter, newest first.
    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, VigilError>;

    /// Apply a field patch if `expected_version` still matches.
    ///
    /// Returns the updated incident. `Conflict` when the version is stale,
    /// `NotFound` when the id is unknown.
    async fn update(
        &self,
        id: &str,
        expected_version: i64,
        patch: &IncidentPatch,
    ) -> Result<Incident, VigilError>;

    /// Persist a status transition already validated by the lifecycle state
    /// machine, guarded by `expected_version`, and append its audit entry
    /// in the same transaction.
    async fn apply_transition(
        &self,
        id: &str,
        expected_version: i64,
        new_status: crate::types::IncidentStatus,
        audit: &AuditEntry,
    ) -> Result<Incident, VigilError>;

    // --- Comments and attachments ---

    async fn add_comment(&self, incident_id: &str, comment: &Comment) -> Result<i64, VigilError>;

    async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, VigilError>;

    async fn add_attachment(&self, incident_id: &str, key: &str) -> Result<(), VigilError>;

    async fn list_attachments(&self, incident_id: &str) -> Result<Vec<String>, VigilError>;

    // --- Audit trail ---

    async fn list_audit(&self, incident_id: &str) -> Result<Vec<AuditEntry>, VigilError>;

    // --- Notification events (dedupe store + dispatch queue) ---

    /// Insert a pending notification event keyed by dedupe key.
    /// Returns `false` without modifying anything if the key already exists.
    async fn insert_event(&self, event: &NotificationEvent) -> Result<bool, VigilError>;

    /// Fetch an event and its recorded delivery state by dedupe key.
    async fn get_event(
        &self,
        dedupe_key: &str,
    ) -> Result<Option<(NotificationEvent, DeliveryState)>, VigilError>;

    /// Record the terminal (or still-pending) state of an event.
    async fn mark_event(&self, dedupe_key: &str, state: DeliveryState)
    -> Result<(), VigilError>;

    /// Record the outcome of delivery attempts on one channel.
    async fn record_attempt(
        &self,
        dedupe_key: &str,
        outcome: &ChannelOutcome,
    ) -> Result<(), VigilError>;

    /// List recorded channel outcomes for an event, oldest first. Used to
    /// reconstruct the receipt on idempotent re-entry.
    async fn list_attempts(&self, dedupe_key: &str) -> Result<Vec<ChannelOutcome>, VigilError>;

    /// Dequeue the oldest event still `pending`, if any. Used by the
    /// dispatch worker to drain the queue after bursts or restarts.
    async fn next_pending_event(&self) -> Result<Option<NotificationEvent>, VigilError>;

    /// Delete delivered/abandoned events older than the RFC 3339 cutoff.
    /// Pending events are never pruned. Returns the number deleted.
    async fn prune_events(&self, older_than: &str) -> Result<usize, VigilError>;
}
