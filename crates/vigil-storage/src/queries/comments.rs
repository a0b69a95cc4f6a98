// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only comments and attachment references.

use rusqlite::params;

use vigil_core::VigilError;
use vigil_core::types::Comment;

use crate::database::{Database, map_tr_err};

/// Append a comment. Returns its sequence number within the table
/// (rowid), used as the dedupe field value for comment notifications.
pub async fn add_comment(
    db: &Database,
    incident_id: &str,
    comment: &Comment,
) -> Result<i64, VigilError> {
    let incident_id = incident_id.to_string();
    let comment = comment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO comments (incident_id, author, text, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![incident_id, comment.author, comment.text, comment.created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// List comments for an incident in insertion order.
pub async fn list_comments(db: &Database, incident_id: &str) -> Result<Vec<Comment>, VigilError> {
    let incident_id = incident_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT author, text, created_at FROM comments
                 WHERE incident_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![incident_id], |row| {
                Ok(Comment {
                    author: row.get(0)?,
                    text: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?;
            let mut comments = Vec::new();
            for row in rows {
                comments.push(row?);
            }
            Ok(comments)
        })
        .await
        .map_err(map_tr_err)
}

/// Record an attachment's object-store key against an incident.
/// The blob itself lives in external object storage and is not owned here.
pub async fn add_attachment(
    db: &Database,
    incident_id: &str,
    object_key: &str,
) -> Result<(), VigilError> {
    let incident_id = incident_id.to_string();
    let object_key = object_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO attachments (incident_id, object_key) VALUES (?1, ?2)",
                params![incident_id, object_key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List attachment keys for an incident in insertion order.
pub async fn list_attachments(
    db: &Database,
    incident_id: &str,
) -> Result<Vec<String>, VigilError> {
    let incident_id = incident_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT object_key FROM attachments WHERE incident_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![incident_id], |row| row.get(0))?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(row?);
            }
            Ok(keys)
        })
        .await
        .map_err(map_tr_err)
}
