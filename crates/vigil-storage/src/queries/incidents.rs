// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incident CRUD with optimistic-concurrency-guarded mutations.
//!
//! Every mutation runs `UPDATE ... WHERE id = ? AND version = ?`; zero
//! affected rows on an existing incident means the caller raced another
//! writer and gets `Conflict`. This is the per-incident serialization point.

use rusqlite::params;

use vigil_core::VigilError;
use vigil_core::types::{
    AuditEntry, Incident, IncidentFilter, IncidentPatch, IncidentStatus,
};

use crate::database::{Database, map_tr_err};
use crate::queries::MutationOutcome;

const INCIDENT_COLUMNS: &str =
    "id, title, description, severity, status, assignee, reported_by, tags, \
     created_at, updated_at, version";

/// Map one row (selected with [`INCIDENT_COLUMNS`]) into an [`Incident`].
pub(crate) fn incident_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Incident> {
    let severity: String = row.get(3)?;
    let status: String = row.get(4)?;
    let tags: String = row.get(7)?;
    Ok(Incident {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        severity: severity.parse().map_err(|e| text_conversion_err(3, e))?,
        status: status.parse().map_err(|e| text_conversion_err(4, e))?,
        assignee: row.get(5)?,
        reported_by: row.get(6)?,
        tags: serde_json::from_str(&tags).map_err(|e| text_conversion_err(7, e))?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        version: row.get(10)?,
    })
}

fn text_conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Insert a fully-formed incident record.
pub async fn create_incident(db: &Database, incident: &Incident) -> Result<(), VigilError> {
    let incident = incident.clone();
    db.connection()
        .call(move |conn| {
            let tags = serde_json::to_string(&incident.tags)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO incidents
                 (id, title, description, severity, status, assignee, reported_by, tags,
                  created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    incident.id,
                    incident.title,
                    incident.description,
                    incident.severity.to_string(),
                    incident.status.to_string(),
                    incident.assignee,
                    incident.reported_by,
                    tags,
                    incident.created_at,
                    incident.updated_at,
                    incident.version,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one incident by id.
pub async fn get_incident(db: &Database, id: &str) -> Result<Option<Incident>, VigilError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], incident_from_row);
            match result {
                Ok(incident) => Ok(Some(incident)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List incidents matching the filter, newest first.
pub async fn list_incidents(
    db: &Database,
    filter: &IncidentFilter,
) -> Result<Vec<Incident>, VigilError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents");
            let mut clauses = Vec::new();
            let mut bound: Vec<String> = Vec::new();

            if let Some(status) = filter.status {
                bound.push(status.to_string());
                clauses.push(format!("status = ?{}", bound.len()));
            }
            if let Some(severity) = filter.severity {
                bound.push(severity.to_string());
                clauses.push(format!("severity = ?{}", bound.len()));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY created_at DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                rusqlite::params_from_iter(bound.iter()),
                incident_from_row,
            )?;
            let mut incidents = Vec::new();
            for row in rows {
                incidents.push(row?);
            }
            Ok(incidents)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a field patch guarded by `expected_version`.
///
/// `now` is the RFC 3339 timestamp for `updated_at`; the stored value never
/// moves backwards even if the caller's clock does.
pub async fn update_incident(
    db: &Database,
    id: &str,
    expected_version: i64,
    patch: &IncidentPatch,
    now: &str,
) -> Result<MutationOutcome, VigilError> {
    let id = id.to_string();
    let patch = patch.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let current = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"
                ))?;
                match stmt.query_row(params![id], incident_from_row) {
                    Ok(incident) => incident,
                    Err(rusqlite::Error::QueryReturnedNoRows) => {
                        return Ok(MutationOutcome::NotFound);
                    }
                    Err(e) => return Err(e.into()),
                }
            };

            let mut updated = current.clone();
            if let Some(title) = patch.title {
                updated.title = title;
            }
            if let Some(description) = patch.description {
                updated.description = description;
            }
            if let Some(severity) = patch.severity {
                updated.severity = severity;
            }
            if let Some(assignee) = patch.assignee {
                updated.assignee = assignee;
            }
            if let Some(tags) = patch.tags {
                updated.tags = tags;
            }
            if now.as_str() > updated.updated_at.as_str() {
                updated.updated_at = now.clone();
            }
            updated.version = current.version + 1;

            let tags = serde_json::to_string(&updated.tags)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            let affected = tx.execute(
                "UPDATE incidents
                 SET title = ?1, description = ?2, severity = ?3, assignee = ?4,
                     tags = ?5, updated_at = ?6, version = ?7
                 WHERE id = ?8 AND version = ?9",
                params![
                    updated.title,
                    updated.description,
                    updated.severity.to_string(),
                    updated.assignee,
                    tags,
                    updated.updated_at,
                    updated.version,
                    id,
                    expected_version,
                ],
            )?;

            if affected == 0 {
                // The row exists (selected above), so the guard failed on
                // version: the caller's snapshot is stale.
                return Ok(MutationOutcome::Conflict);
            }

            tx.commit()?;
            Ok(MutationOutcome::Updated(updated))
        })
        .await
        .map_err(map_tr_err)
}

/// Persist a lifecycle transition and its audit entry in one transaction,
/// guarded by `expected_version`.
pub async fn apply_transition(
    db: &Database,
    id: &str,
    expected_version: i64,
    new_status: IncidentStatus,
    audit: &AuditEntry,
) -> Result<MutationOutcome, VigilError> {
    let id = id.to_string();
    let audit = audit.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM incidents WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(MutationOutcome::NotFound);
            }

            let affected = tx.execute(
                "UPDATE incidents
                 SET status = ?1,
                     updated_at = MAX(updated_at, ?2),
                     version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![new_status.to_string(), audit.created_at, id, expected_version],
            )?;
            if affected == 0 {
                return Ok(MutationOutcome::Conflict);
            }

            tx.execute(
                "INSERT INTO audit_log (incident_id, from_status, to_status, actor, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    audit.incident_id,
                    audit.from.to_string(),
                    audit.to.to_string(),
                    audit.actor,
                    audit.created_at,
                ],
            )?;

            let updated = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"
                ))?;
                stmt.query_row(params![id], incident_from_row)?
            };

            tx.commit()?;
            Ok(MutationOutcome::Updated(updated))
        })
        .await
        .map_err(map_tr_err)
}
