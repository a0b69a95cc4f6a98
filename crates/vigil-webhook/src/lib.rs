// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook channel sender: JSON POST to recipient URLs.
//!
//! Duplicate-attempt safety: a plain webhook endpoint sees every attempt.
//! Receivers that need exactly-once must dedupe on the `dedupe_key` field
//! included in the payload.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use vigil_core::types::{Channel, HealthStatus, NotificationMessage};
use vigil_core::{ChannelSender, VigilError};

/// JSON payload delivered to webhook recipients.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
    dedupe_key: &'a str,
}

/// HTTP webhook sender. The recipient string is the target URL.
pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    fn name(&self) -> &str {
        "webhook"
    }

    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<(), VigilError> {
        let url: reqwest::Url = recipient.parse().map_err(|e| VigilError::Channel {
            message: format!("invalid webhook URL `{recipient}`"),
            source: Some(Box::new(e)),
        })?;

        let response = self
            .client
            .post(url)
            .json(&WebhookPayload {
                subject: &message.subject,
                body: &message.body,
                dedupe_key: &message.dedupe_key,
            })
            .send()
            .await
            .map_err(|e| VigilError::Channel {
                message: format!("webhook POST to {recipient} failed"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VigilError::Channel {
                message: format!("webhook {recipient} returned {status}"),
                source: None,
            });
        }

        debug!(recipient, "webhook accepted");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, VigilError> {
        // Recipients are per-event URLs; nothing global to probe.
        Ok(HealthStatus::Healthy)
    }
}
