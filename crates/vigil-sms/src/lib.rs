// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS channel sender against a Twilio-compatible Messages API.
//!
//! Duplicate-attempt safety: the Messages API has no caller-visible dedupe,
//! so a retried send may produce a second text. The dispatcher's dedupe key
//! prevents duplicate *dispatches*, not duplicate attempts within one.

use async_trait::async_trait;
use tracing::debug;

use vigil_config::model::SmsConfig;
use vigil_core::types::{Channel, HealthStatus, NotificationMessage};
use vigil_core::{ChannelSender, VigilError};

const DEFAULT_API_URL: &str = "https://api.twilio.com/2010-04-01";

/// HTTP-backed SMS sender.
#[derive(Debug)]
pub struct SmsSender {
    client: reqwest::Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsSender {
    /// Build a sender from configuration.
    ///
    /// Fails with a configuration error when the account is unset (the
    /// channel is disabled). `sms.api_url` defaults to the Twilio endpoint
    /// and is overridable for tests and compatible gateways.
    pub fn new(config: &SmsConfig) -> Result<Self, VigilError> {
        let account_sid = config.account_sid.clone().ok_or_else(|| {
            VigilError::Configuration("sms.account_sid is not configured".to_string())
        })?;
        let auth_token = config.auth_token.clone().ok_or_else(|| {
            VigilError::Configuration("sms.auth_token is not configured".to_string())
        })?;
        let from_number = config.from_number.clone().ok_or_else(|| {
            VigilError::Configuration("sms.from_number is not configured".to_string())
        })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            account_sid,
            auth_token,
            from_number,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn name(&self) -> &str {
        "sms"
    }

    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(
        &self,
        recipient: &str,
        message: &NotificationMessage,
    ) -> Result<(), VigilError> {
        // SMS has no subject line; prepend it to keep the context.
        let body = format!("{}\n{}", message.subject, message.body);
        let params = [
            ("To", recipient),
            ("From", self.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| VigilError::Channel {
                message: format!("SMS API request to {recipient} failed"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VigilError::Channel {
                message: format!("SMS API returned {status}: {detail}"),
                source: None,
            });
        }

        debug!(recipient, "SMS accepted by provider");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, VigilError> {
        // No cheap provider-side probe without sending; report healthy when
        // configured.
        Ok(HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server_url: &str) -> SmsConfig {
        SmsConfig {
            api_url: Some(server_url.to_string()),
            account_sid: Some("AC000".to_string()),
            auth_token: Some("token".to_string()),
            from_number: Some("+15550000".to_string()),
        }
    }

    fn make_message() -> NotificationMessage {
        NotificationMessage {
            subject: "[critical] incident opened: db down".to_string(),
            body: "primary unreachable".to_string(),
            dedupe_key: "k".to_string(),
        }
    }

    #[test]
    fn missing_account_is_a_configuration_error() {
        let err = SmsSender::new(&SmsConfig::default()).unwrap_err();
        assert!(matches!(err, VigilError::Configuration(_)));
    }

    #[tokio::test]
    async fn posts_form_encoded_message_to_account_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Accounts/AC000/Messages.json"))
            .and(body_string_contains("To=%2B15550100"))
            .and(body_string_contains("Body="))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sender = SmsSender::new(&config_for(&server.uri())).unwrap();
        sender.send("+15550100", &make_message()).await.unwrap();
    }

    #[tokio::test]
    async fn provider_error_status_fails_the_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid To number"))
            .mount(&server)
            .await;

        let sender = SmsSender::new(&config_for(&server.uri())).unwrap();
        let err = sender.send("bogus", &make_message()).await.unwrap_err();
        match err {
            VigilError::Channel { message, .. } => {
                assert!(message.contains("400"));
                assert!(message.contains("invalid To number"));
            }
            other => panic!("expected Channel error, got {other:?}"),
        }
    }
}
