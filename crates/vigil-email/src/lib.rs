// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email channel sender over SMTP (STARTTLS) via lettre.
//!
//! Duplicate-attempt safety: mail providers generally deduplicate on the
//! Message-ID header, so a retried send of the same logical notification is
//! collapsed downstream. This is the idempotent-channel case the
//! dispatcher's dedupe key relies on.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use vigil_config::model::EmailConfig;
use vigil_core::types::{Channel, HealthStatus, NotificationMessage};
use vigil_core::{ChannelSender, VigilError};

/// SMTP-backed email sender.
#[derive(Debug)]
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    /// Build a sender from configuration.
    ///
    /// Fails with a configuration error when `email.smtp_host` is unset
    /// (the channel is disabled) or the from address does not parse.
    pub fn new(config: &EmailConfig) -> Result<Self, VigilError> {
        let host = config.smtp_host.as_deref().ok_or_else(|| {
            VigilError::Configuration("email.smtp_host is not configured".to_string())
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| VigilError::Channel {
                message: format!("invalid SMTP relay `{host}`"),
                source: Some(Box::new(e)),
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config.from_address.parse::<Mailbox>().map_err(|e| {
            VigilError::Configuration(format!(
                "email.from_address `{}` is not a valid mailbox: {e}",
                config.from_address
            ))
        })?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn name(&self) -> &str {
        "smtp"
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<(), VigilError> {
        let to = recipient.parse::<Mailbox>().map_err(|e| VigilError::Channel {
            message: format!("invalid recipient address `{recipient}`"),
            source: Some(Box::new(e)),
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| VigilError::Channel {
                message: "failed to build email".to_string(),
                source: Some(Box::new(e)),
            })?;

        self.transport
            .send(email)
            .await
            .map_err(|e| VigilError::Channel {
                message: format!("SMTP send to {recipient} failed"),
                source: Some(Box::new(e)),
            })?;

        debug!(recipient, "email accepted by relay");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, VigilError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Unhealthy("SMTP relay refused NOOP".to_string())),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("SMTP unreachable: {e}"))),
        }
    }
}
