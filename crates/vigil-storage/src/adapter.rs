// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the IncidentStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use vigil_config::model::StorageConfig;
use vigil_core::types::{
    AuditEntry, ChannelOutcome, Comment, DeliveryState, Incident, IncidentFilter, IncidentPatch,
    IncidentStatus, NotificationEvent,
};
use vigil_core::{IncidentStore, VigilError};

use crate::database::Database;
use crate::queries;
use crate::queries::MutationOutcome;

/// SQLite-backed incident store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), VigilError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| VigilError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Checkpoint and close the database.
    pub async fn close(&self) -> Result<(), VigilError> {
        self.db()?.close().await
    }

    fn db(&self) -> Result<&Database, VigilError> {
        self.db.get().ok_or_else(|| VigilError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    fn outcome_to_result(id: &str, outcome: MutationOutcome) -> Result<Incident, VigilError> {
        match outcome {
            MutationOutcome::Updated(incident) => Ok(incident),
            MutationOutcome::Conflict => Err(VigilError::Conflict { id: id.to_string() }),
            MutationOutcome::NotFound => Err(VigilError::NotFound { id: id.to_string() }),
        }
    }
}

#[async_trait]
impl IncidentStore for SqliteStore {
    async fn create(&self, incident: &Incident) -> Result<(), VigilError> {
        queries::incidents::create_incident(self.db()?, incident).await
    }

    async fn get(&self, id: &str) -> Result<Incident, VigilError> {
        queries::incidents::get_incident(self.db()?, id)
            .await?
            .ok_or_else(|| VigilError::NotFound { id: id.to_string() })
    }

    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, VigilError> {
        queries::incidents::list_incidents(self.db()?, filter).await
    }

    async fn update(
        &self,
        id: &str,
        expected_version: i64,
        patch: &IncidentPatch,
    ) -> Result<Incident, VigilError> {
        let now = chrono::Utc::now().to_rfc3339();
        let outcome =
            queries::incidents::update_incident(self.db()?, id, expected_version, patch, &now)
                .await?;
        Self::outcome_to_result(id, outcome)
    }

    async fn apply_transition(
        &self,
        id: &str,
        expected_version: i64,
        new_status: IncidentStatus,
        audit: &AuditEntry,
    ) -> Result<Incident, VigilError> {
        let outcome = queries::incidents::apply_transition(
            self.db()?,
            id,
            expected_version,
            new_status,
            audit,
        )
        .await?;
        Self::outcome_to_result(id, outcome)
    }

    async fn add_comment(&self, incident_id: &str, comment: &Comment) -> Result<i64, VigilError> {
        queries::comments::add_comment(self.db()?, incident_id, comment).await
    }

    async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>, VigilError> {
        queries::comments::list_comments(self.db()?, incident_id).await
    }

    async fn add_attachment(&self, incident_id: &str, key: &str) -> Result<(), VigilError> {
        queries::comments::add_attachment(self.db()?, incident_id, key).await
    }

    async fn list_attachments(&self, incident_id: &str) -> Result<Vec<String>, VigilError> {
        queries::comments::list_attachments(self.db()?, incident_id).await
    }

    async fn list_audit(&self, incident_id: &str) -> Result<Vec<AuditEntry>, VigilError> {
        queries::audit::list_audit(self.db()?, incident_id).await
    }

    async fn insert_event(&self, event: &NotificationEvent) -> Result<bool, VigilError> {
        queries::events::insert_event(self.db()?, event).await
    }

    async fn get_event(
        &self,
        dedupe_key: &str,
    ) -> Result<Option<(NotificationEvent, DeliveryState)>, VigilError> {
        queries::events::get_event(self.db()?, dedupe_key).await
    }

    async fn mark_event(
        &self,
        dedupe_key: &str,
        state: DeliveryState,
    ) -> Result<(), VigilError> {
        queries::events::mark_event(self.db()?, dedupe_key, state).await
    }

    async fn record_attempt(
        &self,
        dedupe_key: &str,
        outcome: &ChannelOutcome,
    ) -> Result<(), VigilError> {
        queries::events::record_attempt(self.db()?, dedupe_key, outcome).await
    }

    async fn list_attempts(&self, dedupe_key: &str) -> Result<Vec<ChannelOutcome>, VigilError> {
        queries::events::list_attempts(self.db()?, dedupe_key).await
    }

    async fn next_pending_event(&self) -> Result<Option<NotificationEvent>, VigilError> {
        queries::events::next_pending_event(self.db()?).await
    }

    async fn prune_events(&self, older_than: &str) -> Result<usize, VigilError> {
        queries::events::prune_events(self.db()?, older_than).await
    }
}
