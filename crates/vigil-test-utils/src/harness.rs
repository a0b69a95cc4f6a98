// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete service core with mock channel
//! senders, a temp SQLite database, compiled alert rules, and a dispatcher,
//! so tests can drive the incident -> rules -> dispatch pipeline without
//! any real network or filesystem configuration.

use std::collections::HashMap;
use std::sync::Arc;

use vigil_config::model::{DispatchConfig, RuleConfig, StorageConfig};
use vigil_core::types::Channel;
use vigil_core::{ChannelSender, VigilError};
use vigil_dispatch::Dispatcher;
use vigil_rules::AlertRule;
use vigil_storage::SqliteStore;

use crate::mock_channel::{MockBehavior, MockSender};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    rules: Vec<RuleConfig>,
    dispatch: DispatchConfig,
    email: MockBehavior,
    sms: MockBehavior,
    webhook: MockBehavior,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            dispatch: DispatchConfig {
                // Fast retries so failure-path tests stay quick.
                max_attempts: 3,
                base_delay_ms: 1,
                send_timeout_secs: 1,
                retention_hours: 24,
                worker_poll_ms: 10,
            },
            email: MockBehavior::AlwaysSucceed,
            sms: MockBehavior::AlwaysSucceed,
            webhook: MockBehavior::AlwaysSucceed,
        }
    }

    /// Set the alert rules compiled into the harness.
    pub fn with_rules(mut self, rules: Vec<RuleConfig>) -> Self {
        self.rules = rules;
        self
    }

    /// Override dispatch tuning.
    pub fn with_dispatch_config(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Script the email channel's behavior.
    pub fn with_email_behavior(mut self, behavior: MockBehavior) -> Self {
        self.email = behavior;
        self
    }

    /// Script the SMS channel's behavior.
    pub fn with_sms_behavior(mut self, behavior: MockBehavior) -> Self {
        self.sms = behavior;
        self
    }

    /// Script the webhook channel's behavior.
    pub fn with_webhook_behavior(mut self, behavior: MockBehavior) -> Self {
        self.webhook = behavior;
        self
    }

    /// Build the harness, creating the temp database and all components.
    pub async fn build(self) -> Result<TestHarness, VigilError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| VigilError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        store.initialize().await?;
        let store = Arc::new(store);

        let email = MockSender::new(Channel::Email, self.email);
        let sms = MockSender::new(Channel::Sms, self.sms);
        let webhook = MockSender::new(Channel::Webhook, self.webhook);

        let senders: HashMap<Channel, Arc<dyn ChannelSender>> = HashMap::from([
            (Channel::Email, email.clone() as Arc<dyn ChannelSender>),
            (Channel::Sms, sms.clone() as Arc<dyn ChannelSender>),
            (Channel::Webhook, webhook.clone() as Arc<dyn ChannelSender>),
        ]);

        let dispatcher = Arc::new(Dispatcher::new(store.clone(), senders, self.dispatch));

        let (rules, rule_errors) = vigil_rules::compile_rules(&self.rules);

        Ok(TestHarness {
            store,
            dispatcher,
            rules: Arc::new(rules),
            rule_errors,
            email,
            sms,
            webhook,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired service core over a temp database and mock senders.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub rules: Arc<Vec<AlertRule>>,
    /// Compile errors from malformed rule configs, for assertions.
    pub rule_errors: Vec<VigilError>,
    pub email: Arc<MockSender>,
    pub sms: Arc<MockSender>,
    pub webhook: Arc<MockSender>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Start building a harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }
}
