// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail reads. Entries are written inside the transition
//! transaction in `queries::incidents`.

use rusqlite::params;

use vigil_core::VigilError;
use vigil_core::types::AuditEntry;

use crate::database::{Database, map_tr_err};

/// List audit entries for an incident, oldest first.
pub async fn list_audit(db: &Database, incident_id: &str) -> Result<Vec<AuditEntry>, VigilError> {
    let incident_id = incident_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT incident_id, from_status, to_status, actor, created_at
                 FROM audit_log WHERE incident_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![incident_id], |row| {
                let from: String = row.get(1)?;
                let to: String = row.get(2)?;
                Ok(AuditEntry {
                    incident_id: row.get(0)?,
                    from: from.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    to: to.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    actor: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}
