// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Rule *contents* (severity names, channel names) are
//! deliberately not validated here: a malformed rule is a per-rule
//! configuration error reported at compile time in `vigil-rules`, and must
//! not prevent the service from starting.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::VigilConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VigilConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // server.host must be a plausible bind address.
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.dispatch.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.max_attempts must be at least 1, got {}",
                config.dispatch.max_attempts
            ),
        });
    }

    if config.dispatch.send_timeout_secs < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.send_timeout_secs must be at least 1, got {}",
                config.dispatch.send_timeout_secs
            ),
        });
    }

    // SMS config must be all-or-nothing once enabled.
    if config.sms.account_sid.is_some() {
        if config.sms.auth_token.is_none() {
            errors.push(ConfigError::Validation {
                message: "sms.auth_token is required when sms.account_sid is set".to_string(),
            });
        }
        if config.sms.from_number.is_none() {
            errors.push(ConfigError::Validation {
                message: "sms.from_number is required when sms.account_sid is set".to_string(),
            });
        }
    }

    // Rule names must be present and unique so diagnostics can name them.
    let mut seen_names = HashSet::new();
    for (i, rule) in config.rules.iter().enumerate() {
        if rule.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("rules[{i}].name must not be empty"),
            });
        } else if !seen_names.insert(&rule.name) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate rule name `{}` in [[rules]] array", rule.name),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
