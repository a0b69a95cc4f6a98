// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification event persistence: dedupe store and dispatch queue in one.
//!
//! An event row is created `pending`, and its `state` only ever advances
//! (pending -> delivered | abandoned). `locked_until` is a short-lived claim
//! taken by the dispatch worker so one event is not dispatched twice
//! concurrently; it expires so a crashed dispatch resumes from `pending`.

use rusqlite::params;

use vigil_core::VigilError;
use vigil_core::types::{ChannelOutcome, DeliveryState, NotificationEvent};

use crate::database::{Database, map_tr_err};

const EVENT_COLUMNS: &str =
    "dedupe_key, incident_id, event_type, channels, recipients, subject, body, \
     state, created_at";

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationEvent> {
    let event_type: String = row.get(2)?;
    let channels: String = row.get(3)?;
    let recipients: String = row.get(4)?;
    Ok(NotificationEvent {
        dedupe_key: row.get(0)?,
        incident_id: row.get(1)?,
        event_type: event_type.parse().map_err(|e| conversion_err(2, e))?,
        channels: serde_json::from_str(&channels).map_err(|e| conversion_err(3, e))?,
        recipients: serde_json::from_str(&recipients).map_err(|e| conversion_err(4, e))?,
        subject: row.get(5)?,
        body: row.get(6)?,
        created_at: row.get(8)?,
    })
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Insert a pending event keyed by dedupe key.
///
/// Returns `false` without modifying anything if an event with this key
/// already exists -- the idempotent-re-entry fast path.
pub async fn insert_event(db: &Database, event: &NotificationEvent) -> Result<bool, VigilError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            let channels = serde_json::to_string(&event.channels)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            let recipients = serde_json::to_string(&event.recipients)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            let affected = conn.execute(
                "INSERT OR IGNORE INTO notification_events
                 (dedupe_key, incident_id, event_type, channels, recipients, subject, body,
                  state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?8)",
                params![
                    event.dedupe_key,
                    event.incident_id,
                    event.event_type.to_string(),
                    channels,
                    recipients,
                    event.subject,
                    event.body,
                    event.created_at,
                ],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch an event and its recorded delivery state by dedupe key.
pub async fn get_event(
    db: &Database,
    dedupe_key: &str,
) -> Result<Option<(NotificationEvent, DeliveryState)>, VigilError> {
    let dedupe_key = dedupe_key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM notification_events WHERE dedupe_key = ?1"
            ))?;
            let result = stmt.query_row(params![dedupe_key], |row| {
                let state: String = row.get(7)?;
                let state = state.parse().map_err(|e| conversion_err(7, e))?;
                Ok((event_from_row(row)?, state))
            });
            match result {
                Ok(pair) => Ok(Some(pair)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record the event's delivery state and release any worker claim.
pub async fn mark_event(
    db: &Database,
    dedupe_key: &str,
    state: DeliveryState,
) -> Result<(), VigilError> {
    let dedupe_key = dedupe_key.to_string();
    let state = state.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notification_events
                 SET state = ?1, locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE dedupe_key = ?2",
                params![state, dedupe_key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record the outcome of delivery attempts on one channel.
pub async fn record_attempt(
    db: &Database,
    dedupe_key: &str,
    outcome: &ChannelOutcome,
) -> Result<(), VigilError> {
    let dedupe_key = dedupe_key.to_string();
    let outcome = outcome.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO delivery_attempts (dedupe_key, channel, state, attempts, error)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    dedupe_key,
                    outcome.channel.to_string(),
                    outcome.state.to_string(),
                    outcome.attempts,
                    outcome.error,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List recorded channel outcomes for an event, oldest first.
pub async fn list_attempts(
    db: &Database,
    dedupe_key: &str,
) -> Result<Vec<ChannelOutcome>, VigilError> {
    let dedupe_key = dedupe_key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT channel, state, attempts, error FROM delivery_attempts
                 WHERE dedupe_key = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![dedupe_key], |row| {
                let channel: String = row.get(0)?;
                let state: String = row.get(1)?;
                Ok(ChannelOutcome {
                    channel: channel.parse().map_err(|e| conversion_err(0, e))?,
                    state: state.parse().map_err(|e| conversion_err(1, e))?,
                    attempts: row.get(2)?,
                    error: row.get(3)?,
                })
            })?;
            let mut outcomes = Vec::new();
            for row in rows {
                outcomes.push(row?);
            }
            Ok(outcomes)
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the oldest unclaimed `pending` event for dispatch.
///
/// Atomically selects and stamps `locked_until` five minutes out. The state
/// stays `pending`: a dispatch cancelled mid-flight is not delivered, and
/// retries resume from `pending` once the claim expires. Returns `None` when
/// the queue is drained.
pub async fn next_pending_event(db: &Database) -> Result<Option<NotificationEvent>, VigilError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {EVENT_COLUMNS} FROM notification_events
                     WHERE state = 'pending'
                       AND (locked_until IS NULL
                            OR locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY created_at ASC
                     LIMIT 1"
                ))?;
                stmt.query_row([], event_from_row)
            };

            match result {
                Ok(event) => {
                    tx.execute(
                        "UPDATE notification_events
                         SET locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE dedupe_key = ?1",
                        params![event.dedupe_key],
                    )?;
                    tx.commit()?;
                    Ok(Some(event))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Delete delivered/abandoned events (and their attempt records) older than
/// the RFC 3339 cutoff. Pending events are never pruned. Returns the number
/// of events deleted.
pub async fn prune_events(db: &Database, older_than: &str) -> Result<usize, VigilError> {
    let older_than = older_than.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM delivery_attempts WHERE dedupe_key IN (
                     SELECT dedupe_key FROM notification_events
                     WHERE state IN ('delivered', 'abandoned') AND updated_at < ?1)",
                params![older_than],
            )?;
            let deleted = tx.execute(
                "DELETE FROM notification_events
                 WHERE state IN ('delivered', 'abandoned') AND updated_at < ?1",
                params![older_than],
            )?;
            tx.commit()?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use vigil_core::types::{Channel, EventType};

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    fn make_event(key: &str) -> NotificationEvent {
        NotificationEvent {
            dedupe_key: key.to_string(),
            incident_id: "inc-1".to_string(),
            event_type: EventType::Created,
            channels: vec![Channel::Email],
            recipients: vec!["ops@example.com".to_string()],
            subject: "[high] incident opened: disk filling".to_string(),
            body: "details".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent_by_dedupe_key() {
        let (db, _dir) = setup_db().await;
        let event = make_event("key-1");

        assert!(insert_event(&db, &event).await.unwrap());
        assert!(!insert_event(&db, &event).await.unwrap(), "second insert is ignored");

        let (fetched, state) = get_event(&db, "key-1").await.unwrap().unwrap();
        assert_eq!(fetched, event);
        assert_eq!(state, DeliveryState::Pending);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_event_advances_state() {
        let (db, _dir) = setup_db().await;
        insert_event(&db, &make_event("key-2")).await.unwrap();

        mark_event(&db, "key-2", DeliveryState::Delivered).await.unwrap();
        let (_, state) = get_event(&db, "key-2").await.unwrap().unwrap();
        assert_eq!(state, DeliveryState::Delivered);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn attempts_are_recorded_and_listed() {
        let (db, _dir) = setup_db().await;
        insert_event(&db, &make_event("key-3")).await.unwrap();

        record_attempt(
            &db,
            "key-3",
            &ChannelOutcome {
                channel: Channel::Email,
                state: DeliveryState::Failed,
                attempts: 3,
                error: Some("connection refused".to_string()),
            },
        )
        .await
        .unwrap();
        record_attempt(
            &db,
            "key-3",
            &ChannelOutcome {
                channel: Channel::Sms,
                state: DeliveryState::Delivered,
                attempts: 1,
                error: None,
            },
        )
        .await
        .unwrap();

        let outcomes = list_attempts(&db, "key-3").await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].channel, Channel::Email);
        assert_eq!(outcomes[0].state, DeliveryState::Failed);
        assert_eq!(outcomes[1].channel, Channel::Sms);
        assert_eq!(outcomes[1].state, DeliveryState::Delivered);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn next_pending_claims_oldest_and_skips_claimed() {
        let (db, _dir) = setup_db().await;
        let mut older = make_event("key-old");
        older.created_at = "2026-01-01T00:00:00.000Z".to_string();
        let mut newer = make_event("key-new");
        newer.created_at = "2026-01-02T00:00:00.000Z".to_string();
        insert_event(&db, &newer).await.unwrap();
        insert_event(&db, &older).await.unwrap();

        let first = next_pending_event(&db).await.unwrap().unwrap();
        assert_eq!(first.dedupe_key, "key-old");

        // The claim hides the first event; the second is returned next.
        let second = next_pending_event(&db).await.unwrap().unwrap();
        assert_eq!(second.dedupe_key, "key-new");

        // Both claimed: the queue looks empty.
        assert!(next_pending_event(&db).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn terminal_events_are_not_dequeued() {
        let (db, _dir) = setup_db().await;
        insert_event(&db, &make_event("key-done")).await.unwrap();
        mark_event(&db, "key-done", DeliveryState::Abandoned).await.unwrap();

        assert!(next_pending_event(&db).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn prune_removes_only_old_terminal_events() {
        let (db, _dir) = setup_db().await;
        insert_event(&db, &make_event("key-delivered")).await.unwrap();
        insert_event(&db, &make_event("key-pending")).await.unwrap();
        mark_event(&db, "key-delivered", DeliveryState::Delivered).await.unwrap();

        // Cutoff far in the future: everything terminal qualifies.
        let deleted = prune_events(&db, "2999-01-01T00:00:00.000Z").await.unwrap();
        assert_eq!(deleted, 1);

        assert!(get_event(&db, "key-delivered").await.unwrap().is_none());
        assert!(get_event(&db, "key-pending").await.unwrap().is_some(), "pending survives");

        // Cutoff in the past: nothing qualifies.
        insert_event(&db, &make_event("key-recent")).await.unwrap();
        mark_event(&db, "key-recent", DeliveryState::Delivered).await.unwrap();
        let deleted = prune_events(&db, "2000-01-01T00:00:00.000Z").await.unwrap();
        assert_eq!(deleted, 0);

        db.close().await.unwrap();
    }
}
