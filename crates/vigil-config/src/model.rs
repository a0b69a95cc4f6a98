// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Vigil incident service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Vigil configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; alert rules default to an empty set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VigilConfig {
    /// API server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification dispatch settings (retry, timeout, retention).
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Email (SMTP) channel settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// SMS channel settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Alert rules, evaluated independently against incident changes.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// API server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*` routes. `None` rejects all
    /// authenticated requests (fail-closed).
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8420
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("vigil").join("vigil.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "vigil.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Notification dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum delivery attempts per channel before it is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts, in milliseconds.
    /// Attempt n waits `base_delay_ms * 2^(n-1)`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Per-attempt send timeout in seconds. An attempt still in flight at
    /// the deadline counts as failed and eligible for retry.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Hours to retain delivered/abandoned events for dedupe before pruning.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Queue worker poll interval in milliseconds.
    #[serde(default = "default_worker_poll_ms")]
    pub worker_poll_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            retention_hours: default_retention_hours(),
            worker_poll_ms: default_worker_poll_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_send_timeout_secs() -> u64 {
    5
}

fn default_retention_hours() -> u64 {
    24
}

fn default_worker_poll_ms() -> u64 {
    500
}

/// Email (SMTP) channel configuration. `smtp_host = None` disables the channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// SMTP relay hostname. `None` disables email delivery.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username, if the relay requires authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// SMTP password, if the relay requires authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// From address on outbound mail.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "vigil@localhost".to_string()
}

/// SMS channel configuration. `account_sid = None` disables the channel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Provider API base URL. Defaults to the Twilio REST endpoint;
    /// overridable for tests and compatible gateways.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Provider account identifier. `None` disables SMS delivery.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Provider auth token.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender phone number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,
}

/// One alert rule: a condition-to-notification mapping.
///
/// Kept stringly-typed here; `vigil-rules` compiles each entry into a typed
/// rule and reports per-rule configuration errors without blocking the rest.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Rule name, used in logs and diagnostics. Must be unique.
    pub name: String,

    /// Fire only when incident severity is at or above this level.
    #[serde(default)]
    pub min_severity: Option<String>,

    /// Fire only for these event types. Empty means all types.
    #[serde(default)]
    pub event_types: Vec<String>,

    /// Fire only when title or description contains this string
    /// (case-insensitive).
    #[serde(default)]
    pub keyword: Option<String>,

    /// Channels to notify when the condition holds.
    #[serde(default)]
    pub channels: Vec<String>,

    /// Recipients to notify (addresses, phone numbers, or URLs depending
    /// on channel).
    #[serde(default)]
    pub recipients: Vec<String>,
}
