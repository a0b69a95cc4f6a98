// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel sender for deterministic testing.
//!
//! `MockSender` implements `ChannelSender` with scriptable outcomes and
//! captured sends for assertion in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use vigil_core::types::{Channel, HealthStatus, NotificationMessage};
use vigil_core::{ChannelSender, VigilError};

/// How the mock behaves across `send` calls.
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Every send succeeds.
    AlwaysSucceed,
    /// Every send fails.
    AlwaysFail,
    /// Fail the first n sends, then succeed (transient outage).
    FailFirst(u32),
}

/// A scriptable channel sender capturing everything sent through it.
pub struct MockSender {
    channel: Channel,
    behavior: MockBehavior,
    calls: AtomicU32,
    sent: Mutex<Vec<(String, NotificationMessage)>>,
}

impl MockSender {
    pub fn new(channel: Channel, behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            channel,
            behavior,
            calls: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Total `send` calls, including failed attempts.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successfully delivered (recipient, message) pairs, in order.
    pub async fn sent_messages(&self) -> Vec<(String, NotificationMessage)> {
        self.sent.lock().await.clone()
    }

    /// Count of successful deliveries.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl ChannelSender for MockSender {
    fn name(&self) -> &str {
        "mock"
    }

    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<(), VigilError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = match self.behavior {
            MockBehavior::AlwaysSucceed => false,
            MockBehavior::AlwaysFail => true,
            MockBehavior::FailFirst(n) => call < n,
        };
        if fail {
            return Err(VigilError::Channel {
                message: format!("mock {} sender failing on purpose", self.channel),
                source: None,
            });
        }
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), message.clone()));
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, VigilError> {
        Ok(HealthStatus::Healthy)
    }
}
