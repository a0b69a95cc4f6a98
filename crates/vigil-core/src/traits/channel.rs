// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel sender trait for outbound notification delivery (email, SMS, webhook).

use async_trait::async_trait;

use crate::error::VigilError;
use crate::types::{Channel, HealthStatus, NotificationMessage};

/// Adapter for a single outbound notification channel.
///
/// Senders are injected collaborators: the dispatcher never talks to a
/// provider directly, so tests can substitute deterministic fakes. A sender
/// delivers one message to one recipient; fan-out and retry live in the
/// dispatcher.
///
/// Idempotency caveat: the dispatcher's dedupe key makes duplicate *attempts*
/// safe only when the provider behind a sender applies its own message-level
/// dedupe (most email providers do via Message-ID; plain webhooks do not).
/// Implementations should document which case they are.
#[async_trait]
pub trait ChannelSender: Send + Sync + 'static {
    /// Human-readable name of this sender instance.
    fn name(&self) -> &str;

    /// Which channel this sender delivers on.
    fn channel(&self) -> Channel;

    /// Deliver one message to one recipient.
    ///
    /// A returned error marks this attempt failed and eligible for retry;
    /// the sender itself must not retry internally.
    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<(), VigilError>;

    /// Check reachability of the underlying provider.
    async fn health_check(&self) -> Result<HealthStatus, VigilError> {
        Ok(HealthStatus::Healthy)
    }
}
