// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Vigil workspace.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

/// Incident severity, ordered from least to most urgent.
///
/// The derived `Ord` follows declaration order, so threshold checks like
/// `severity >= Severity::High` work as expected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of an incident. `Closed` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

/// A tracked operational event with a severity and lifecycle status.
///
/// Incidents are created `Open`, mutated only through the lifecycle state
/// machine and the store's versioned update path, and never physically
/// deleted (`Closed` is retained for audit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier, immutable once created.
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    /// Optional user id. Weak reference -- may dangle if the user is removed.
    pub assignee: Option<String>,
    /// Opaque id of whoever reported the incident.
    pub reported_by: String,
    pub tags: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last mutation. Monotonically non-decreasing.
    pub updated_at: String,
    /// Optimistic-concurrency token, incremented on every mutation.
    pub version: i64,
}

/// Field-level patch applied through the versioned update path.
///
/// `None` fields are left untouched. Status is intentionally absent: status
/// changes go through the lifecycle state machine, not the patch path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    /// `None`: leave untouched. `Some(None)`: clear the assignee
    /// (an explicit `"assignee": null` in the request body).
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Maps a present-but-null JSON value to `Some(None)` so patches can
/// distinguish "clear this field" from "leave it alone".
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

impl IncidentPatch {
    /// True when the patch would not change any field.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.severity.is_none()
            && self.assignee.is_none()
            && self.tags.is_none()
    }
}

/// Filter parameters for incident listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
}

/// An append-only comment on an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub created_at: String,
}

/// One audit trail entry, appended on every successful status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub incident_id: String,
    pub from: IncidentStatus,
    pub to: IncidentStatus,
    /// Opaque actor id from the validated caller identity.
    pub actor: String,
    pub created_at: String,
}

/// What kind of incident change triggered a notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    StatusChanged,
    CommentAdded,
    SeverityChanged,
    /// Ad hoc notification requested through the API, bypassing rules.
    Manual,
}

/// A notification delivery channel.
///
/// Ordered so channel lists can be kept in canonical form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Webhook,
}

/// Delivery state of a notification event or a single channel attempt.
///
/// Event-level state advances monotonically: `Pending` -> `Delivered` or
/// `Abandoned`. `Failed` is recorded per channel attempt; an event is
/// `Abandoned` only when every channel has failed past max attempts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Delivered,
    Failed,
    Abandoned,
}

/// Compute the deterministic dedupe key for a notification trigger.
///
/// SHA-256 over (incident id, event type, relevant field value) with a unit
/// separator between components so `("ab", "c")` and `("a", "bc")` cannot
/// collide. Used to collapse duplicate notification attempts into one
/// logical delivery.
pub fn dedupe_key(incident_id: &str, event_type: EventType, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(incident_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(event_type.to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// A notification to be delivered over one or more channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Deterministic fingerprint, see [`dedupe_key`]. Primary key in storage.
    pub dedupe_key: String,
    pub incident_id: String,
    pub event_type: EventType,
    pub channels: Vec<Channel>,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub created_at: String,
}

/// The rendered message handed to a channel sender.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
    /// The originating event's fingerprint, exposed so receivers on
    /// non-idempotent channels (webhooks) can dedupe retried attempts.
    pub dedupe_key: String,
}

/// Outcome of delivery attempts on a single channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub channel: Channel,
    pub state: DeliveryState,
    pub attempts: u32,
    pub error: Option<String>,
}

/// The recorded result of dispatching one notification event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub dedupe_key: String,
    pub state: DeliveryState,
    pub channels: Vec<ChannelOutcome>,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}
