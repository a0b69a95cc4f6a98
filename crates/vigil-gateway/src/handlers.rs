// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handlers perform input validation and translation only; status rules live
//! in `vigil-lifecycle`, matching in `vigil-rules`, and delivery in
//! `vigil-dispatch`. Notification enqueue failures are logged, never
//! surfaced: a failed notification must not invalidate a successful
//! incident mutation.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use vigil_core::types::{
    AuditEntry, Channel, Comment, DeliveryReceipt, EventType, Incident, IncidentFilter,
    IncidentPatch, IncidentStatus, NotificationEvent, Severity, dedupe_key,
};
use vigil_core::VigilError;

use crate::auth::actor_from_headers;
use crate::error::ApiError;
use crate::server::GatewayState;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Enqueue rule-produced events for the dispatch worker. Failures are
/// logged and swallowed by design of the error propagation rules.
async fn enqueue_all(state: &GatewayState, events: Vec<NotificationEvent>) {
    for event in events {
        if let Err(e) = state.dispatcher.enqueue(&event).await {
            warn!(dedupe_key = %event.dedupe_key, error = %e,
                  "failed to enqueue notification event");
        }
    }
}

// --- Public health ---

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

// --- Incident CRUD ---

/// Query parameters for GET /v1/incidents.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
}

/// List response wrapper shared by collection endpoints.
#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

/// GET /v1/incidents?status=&severity=
pub async fn list_incidents(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ItemsResponse<Incident>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            IncidentStatus::from_str(s)
                .map_err(|_| VigilError::Validation(format!("unknown status filter `{s}`")))
        })
        .transpose()?;
    let severity = query
        .severity
        .as_deref()
        .map(|s| {
            Severity::from_str(s)
                .map_err(|_| VigilError::Validation(format!("unknown severity filter `{s}`")))
        })
        .transpose()?;

    let items = state
        .store
        .list(&IncidentFilter { status, severity })
        .await?;
    Ok(Json(ItemsResponse { items }))
}

/// Request body for POST /v1/incidents.
#[derive(Debug, Deserialize)]
pub struct CreateIncidentRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// POST /v1/incidents
///
/// Creates the incident in `open`, then evaluates alert rules for the
/// `created` event and enqueues any matches.
pub async fn create_incident(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(VigilError::Validation("title must not be empty".to_string()).into());
    }

    let actor = actor_from_headers(&headers);
    let ts = now();
    let incident = Incident {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title,
        description: body.description,
        severity: body.severity,
        status: IncidentStatus::Open,
        assignee: body.assignee,
        reported_by: body.reported_by.unwrap_or(actor),
        tags: body.tags,
        created_at: ts.clone(),
        updated_at: ts.clone(),
        version: 1,
    };

    state.store.create(&incident).await?;

    let events = vigil_rules::evaluate(&state.rules, &incident, EventType::Created, &ts);
    enqueue_all(&state, events).await;

    Ok((StatusCode::CREATED, Json(incident)))
}

/// GET /v1/incidents/{id}
pub async fn get_incident(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Incident>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

/// Request body for PUT /v1/incidents/{id}.
#[derive(Debug, Deserialize)]
pub struct UpdateIncidentRequest {
    /// The version the caller last read; a mismatch yields 409 Conflict.
    pub expected_version: i64,
    #[serde(flatten)]
    pub patch: IncidentPatch,
}

/// PUT /v1/incidents/{id}
///
/// Field patch under optimistic concurrency. A severity change evaluates
/// alert rules for `severity_changed`.
pub async fn update_incident(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateIncidentRequest>,
) -> Result<Json<Incident>, ApiError> {
    if body.patch.is_empty() {
        return Err(VigilError::Validation("patch must change at least one field".to_string())
            .into());
    }

    let before = state.store.get(&id).await?;
    let updated = state
        .store
        .update(&id, body.expected_version, &body.patch)
        .await?;

    if updated.severity != before.severity {
        let events = vigil_rules::evaluate(
            &state.rules,
            &updated,
            EventType::SeverityChanged,
            &updated.updated_at,
        );
        enqueue_all(&state, events).await;
    }

    Ok(Json(updated))
}

// --- Status transitions ---

/// Request body for PUT /v1/incidents/{id}/status.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: IncidentStatus,
    pub expected_version: i64,
}

/// PUT /v1/incidents/{id}/status
///
/// Validates the edge against the lifecycle graph, persists the transition
/// with its audit entry, and evaluates rules for `status_changed`.
pub async fn transition_incident(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<Incident>, ApiError> {
    let actor = actor_from_headers(&headers);
    let current = state.store.get(&id).await?;

    let (_, audit) = vigil_lifecycle::transition(&current, body.status, &actor, &now())?;
    let updated = state
        .store
        .apply_transition(&id, body.expected_version, body.status, &audit)
        .await?;

    let events = vigil_rules::evaluate(
        &state.rules,
        &updated,
        EventType::StatusChanged,
        &updated.updated_at,
    );
    enqueue_all(&state, events).await;

    Ok(Json(updated))
}

// --- Comments ---

/// Request body for POST /v1/incidents/{id}/comments.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// POST /v1/incidents/{id}/comments
pub async fn add_comment(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    if body.text.trim().is_empty() {
        return Err(VigilError::Validation("comment text must not be empty".to_string()).into());
    }

    let incident = state.store.get(&id).await?;
    let comment = Comment {
        author: actor_from_headers(&headers),
        text: body.text,
        created_at: now(),
    };
    let seq = state.store.add_comment(&id, &comment).await?;

    let events = vigil_rules::evaluate_with_value(
        &state.rules,
        &incident,
        EventType::CommentAdded,
        &seq.to_string(),
        &comment.created_at,
    );
    enqueue_all(&state, events).await;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /v1/incidents/{id}/comments
pub async fn list_comments(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ItemsResponse<Comment>>, ApiError> {
    // Distinguish an unknown incident from one with no comments.
    state.store.get(&id).await?;
    let items = state.store.list_comments(&id).await?;
    Ok(Json(ItemsResponse { items }))
}

// --- Attachments ---

/// Request body for POST /v1/incidents/{id}/attachments.
#[derive(Debug, Deserialize)]
pub struct AttachmentRequest {
    /// Object-store key of a blob uploaded out of band.
    pub object_key: String,
}

/// POST /v1/incidents/{id}/attachments
pub async fn add_attachment(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<AttachmentRequest>,
) -> Result<StatusCode, ApiError> {
    if body.object_key.trim().is_empty() {
        return Err(VigilError::Validation("object_key must not be empty".to_string()).into());
    }
    state.store.get(&id).await?;
    state.store.add_attachment(&id, &body.object_key).await?;
    Ok(StatusCode::CREATED)
}

/// GET /v1/incidents/{id}/attachments
pub async fn list_attachments(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ItemsResponse<String>>, ApiError> {
    state.store.get(&id).await?;
    let items = state.store.list_attachments(&id).await?;
    Ok(Json(ItemsResponse { items }))
}

// --- Audit ---

/// GET /v1/incidents/{id}/audit
pub async fn get_audit(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ItemsResponse<AuditEntry>>, ApiError> {
    state.store.get(&id).await?;
    let items = state.store.list_audit(&id).await?;
    Ok(Json(ItemsResponse { items }))
}

// --- Ad hoc notification ---

/// Request body for POST /v1/notify.
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub incident_id: String,
    pub channels: Vec<Channel>,
    pub recipients: Vec<String>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// POST /v1/notify
///
/// Triggers an ad hoc notification, bypassing rule evaluation. Dispatches
/// inline and returns the delivery receipt.
pub async fn notify(
    State(state): State<GatewayState>,
    Json(body): Json<NotifyRequest>,
) -> Result<Json<DeliveryReceipt>, ApiError> {
    if body.channels.is_empty() {
        return Err(VigilError::Validation("at least one channel is required".to_string()).into());
    }
    if body.recipients.is_empty() {
        return Err(
            VigilError::Validation("at least one recipient is required".to_string()).into(),
        );
    }
    if body.subject.trim().is_empty() {
        return Err(VigilError::Validation("subject must not be empty".to_string()).into());
    }

    // The incident must exist; manual notifications still reference one.
    state.store.get(&body.incident_id).await?;

    let event = NotificationEvent {
        dedupe_key: dedupe_key(&body.incident_id, EventType::Manual, &body.subject),
        incident_id: body.incident_id,
        event_type: EventType::Manual,
        channels: body.channels,
        recipients: body.recipients,
        subject: body.subject,
        body: body.body,
        created_at: now(),
    };

    let receipt = state.dispatcher.dispatch(&event).await?;
    Ok(Json(receipt))
}
