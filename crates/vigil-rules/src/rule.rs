// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed alert rules compiled from configuration.

use std::str::FromStr;

use tracing::warn;

use vigil_config::model::RuleConfig;
use vigil_core::VigilError;
use vigil_core::types::{Channel, EventType, Incident, Severity};

/// A compiled alert rule: a condition-to-notification mapping.
///
/// Rules are unordered and evaluated independently. Compilation is the only
/// place rule contents can fail; a compiled rule always evaluates cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub name: String,
    /// Fire only at or above this severity. `None` matches any severity.
    pub min_severity: Option<Severity>,
    /// Fire only for these event types. Empty matches all types.
    pub event_types: Vec<EventType>,
    /// Case-insensitive substring match over title + description.
    /// Stored lowercased.
    pub keyword: Option<String>,
    pub channels: Vec<Channel>,
    pub recipients: Vec<String>,
}

impl AlertRule {
    /// Compile one config entry into a typed rule.
    ///
    /// Any unparseable field is a [`VigilError::Configuration`] naming the
    /// rule, and a rule that targets no channel or no recipient is malformed
    /// (it could never notify anyone).
    pub fn compile(config: &RuleConfig) -> Result<Self, VigilError> {
        let min_severity = config
            .min_severity
            .as_deref()
            .map(|s| {
                Severity::from_str(s).map_err(|_| {
                    VigilError::Configuration(format!(
                        "rule `{}`: unknown severity `{s}` (expected low|medium|high|critical)",
                        config.name
                    ))
                })
            })
            .transpose()?;

        let event_types = config
            .event_types
            .iter()
            .map(|s| {
                EventType::from_str(s).map_err(|_| {
                    VigilError::Configuration(format!(
                        "rule `{}`: unknown event type `{s}`",
                        config.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let channels = config
            .channels
            .iter()
            .map(|s| {
                Channel::from_str(s).map_err(|_| {
                    VigilError::Configuration(format!(
                        "rule `{}`: unknown channel `{s}` (expected email|sms|webhook)",
                        config.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if channels.is_empty() {
            return Err(VigilError::Configuration(format!(
                "rule `{}`: at least one channel is required",
                config.name
            )));
        }
        if config.recipients.is_empty() {
            return Err(VigilError::Configuration(format!(
                "rule `{}`: at least one recipient is required",
                config.name
            )));
        }

        Ok(AlertRule {
            name: config.name.clone(),
            min_severity,
            event_types,
            keyword: config.keyword.as_deref().map(str::to_lowercase),
            channels,
            recipients: config.recipients.clone(),
        })
    }

    /// Test this rule's condition against an incident snapshot and the
    /// change that occurred. Pure; no I/O.
    pub fn matches(&self, incident: &Incident, event_type: EventType) -> bool {
        if let Some(min) = self.min_severity
            && incident.severity < min
        {
            return false;
        }

        if !self.event_types.is_empty() && !self.event_types.contains(&event_type) {
            return false;
        }

        if let Some(ref keyword) = self.keyword {
            let haystack =
                format!("{} {}", incident.title, incident.description).to_lowercase();
            if !haystack.contains(keyword.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Compile all configured rules, collecting per-rule failures.
///
/// A malformed rule is skipped with a warning and its error returned for
/// reporting; it never blocks compilation of other rules or service startup.
pub fn compile_rules(configs: &[RuleConfig]) -> (Vec<AlertRule>, Vec<VigilError>) {
    let mut rules = Vec::new();
    let mut errors = Vec::new();

    for config in configs {
        match AlertRule::compile(config) {
            Ok(rule) => rules.push(rule),
            Err(e) => {
                warn!(rule = %config.name, error = %e, "skipping malformed alert rule");
                errors.push(e);
            }
        }
    }

    (rules, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::IncidentStatus;

    fn make_incident(severity: Severity) -> Incident {
        Incident {
            id: "inc-1".to_string(),
            title: "API latency spike".to_string(),
            description: "p99 above 4s on the checkout service".to_string(),
            severity,
            status: IncidentStatus::Open,
            assignee: None,
            reported_by: "monitor".to_string(),
            tags: vec![],
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            version: 1,
        }
    }

    fn rule_config(name: &str) -> RuleConfig {
        RuleConfig {
            name: name.to_string(),
            min_severity: None,
            event_types: vec![],
            keyword: None,
            channels: vec!["email".to_string()],
            recipients: vec!["ops@example.com".to_string()],
        }
    }

    #[test]
    fn compiles_a_full_rule() {
        let mut config = rule_config("page-on-critical");
        config.min_severity = Some("high".to_string());
        config.event_types = vec!["created".to_string(), "severity_changed".to_string()];
        config.keyword = Some("Checkout".to_string());

        let rule = AlertRule::compile(&config).unwrap();
        assert_eq!(rule.min_severity, Some(Severity::High));
        assert_eq!(
            rule.event_types,
            vec![EventType::Created, EventType::SeverityChanged]
        );
        // Keyword is lowercased at compile time.
        assert_eq!(rule.keyword.as_deref(), Some("checkout"));
    }

    #[test]
    fn unknown_severity_is_a_configuration_error() {
        let mut config = rule_config("bad");
        config.min_severity = Some("catastrophic".to_string());
        let err = AlertRule::compile(&config).unwrap_err();
        assert!(matches!(err, VigilError::Configuration(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn empty_channels_is_a_configuration_error() {
        let mut config = rule_config("no-channels");
        config.channels = vec![];
        assert!(AlertRule::compile(&config).is_err());
    }

    #[test]
    fn severity_threshold_is_inclusive() {
        let mut config = rule_config("r");
        config.min_severity = Some("high".to_string());
        let rule = AlertRule::compile(&config).unwrap();

        assert!(rule.matches(&make_incident(Severity::High), EventType::Created));
        assert!(rule.matches(&make_incident(Severity::Critical), EventType::Created));
        assert!(!rule.matches(&make_incident(Severity::Medium), EventType::Created));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let mut config = rule_config("r");
        config.keyword = Some("CHECKOUT".to_string());
        let rule = AlertRule::compile(&config).unwrap();
        assert!(rule.matches(&make_incident(Severity::Low), EventType::Created));

        let mut config = rule_config("r2");
        config.keyword = Some("billing".to_string());
        let rule = AlertRule::compile(&config).unwrap();
        assert!(!rule.matches(&make_incident(Severity::Low), EventType::Created));
    }

    #[test]
    fn empty_event_types_matches_all() {
        let rule = AlertRule::compile(&rule_config("r")).unwrap();
        for event_type in [
            EventType::Created,
            EventType::StatusChanged,
            EventType::CommentAdded,
            EventType::SeverityChanged,
        ] {
            assert!(rule.matches(&make_incident(Severity::Low), event_type));
        }
    }

    #[test]
    fn compile_rules_skips_bad_entries_and_keeps_good_ones() {
        let mut bad = rule_config("bad");
        bad.channels = vec!["pigeon".to_string()];
        let good = rule_config("good");

        let (rules, errors) = compile_rules(&[bad, good]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "good");
        assert_eq!(errors.len(), 1);
    }
}
