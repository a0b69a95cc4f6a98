// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure evaluation of alert rules against incident changes.

use std::collections::BTreeMap;

use vigil_core::types::{EventType, Incident, NotificationEvent, dedupe_key};

use crate::rule::AlertRule;

/// The field value that identifies one logical change for dedupe purposes.
///
/// `CommentAdded` has no value derivable from the incident snapshot (the
/// comment lives in its own table); callers pass the comment sequence number
/// to [`evaluate_with_value`] instead.
pub fn relevant_value(incident: &Incident, event_type: EventType) -> String {
    match event_type {
        EventType::Created | EventType::SeverityChanged => incident.severity.to_string(),
        EventType::StatusChanged => incident.status.to_string(),
        EventType::CommentAdded | EventType::Manual => incident.updated_at.clone(),
    }
}

/// Evaluate all rules against an incident change.
///
/// Pure function of the rule set + incident snapshot: no side effects, no
/// I/O, deterministic output. Each matching rule produces one notification
/// event; events whose dedupe keys collide (two rules matching the same
/// logical change) are merged with the union of channels and recipients so
/// downstream dedupe never drops a rule's targets. An empty result is the
/// normal outcome when nothing matches.
///
/// `now` is the RFC 3339 timestamp stamped on emitted events.
pub fn evaluate(
    rules: &[AlertRule],
    incident: &Incident,
    event_type: EventType,
    now: &str,
) -> Vec<NotificationEvent> {
    let value = relevant_value(incident, event_type);
    evaluate_with_value(rules, incident, event_type, &value, now)
}

/// Like [`evaluate`], with an explicit dedupe field value for changes whose
/// identity is not derivable from the incident snapshot (comments).
pub fn evaluate_with_value(
    rules: &[AlertRule],
    incident: &Incident,
    event_type: EventType,
    value: &str,
    now: &str,
) -> Vec<NotificationEvent> {
    // BTreeMap keyed by dedupe key: merging point for colliding rules, and
    // a deterministic output order regardless of rule order.
    let mut events: BTreeMap<String, NotificationEvent> = BTreeMap::new();

    for rule in rules {
        if !rule.matches(incident, event_type) {
            continue;
        }

        let key = dedupe_key(&incident.id, event_type, value);
        let entry = events.entry(key.clone()).or_insert_with(|| NotificationEvent {
            dedupe_key: key,
            incident_id: incident.id.clone(),
            event_type,
            channels: Vec::new(),
            recipients: Vec::new(),
            subject: render_subject(incident, event_type),
            body: render_body(incident, event_type),
            created_at: now.to_string(),
        });

        for &channel in &rule.channels {
            if !entry.channels.contains(&channel) {
                entry.channels.push(channel);
            }
        }
        for recipient in &rule.recipients {
            if !entry.recipients.contains(recipient) {
                entry.recipients.push(recipient.clone());
            }
        }
    }

    // Canonical ordering inside each event so identical inputs yield
    // identical outputs regardless of rule iteration order.
    let mut result: Vec<NotificationEvent> = events.into_values().collect();
    for event in &mut result {
        event.channels.sort();
        event.recipients.sort();
    }
    result
}

fn render_subject(incident: &Incident, event_type: EventType) -> String {
    match event_type {
        EventType::Created => {
            format!("[{}] incident opened: {}", incident.severity, incident.title)
        }
        EventType::StatusChanged => format!(
            "[{}] incident {}: {}",
            incident.severity, incident.status, incident.title
        ),
        EventType::SeverityChanged => format!(
            "[{}] severity changed: {}",
            incident.severity, incident.title
        ),
        EventType::CommentAdded => format!("new comment on: {}", incident.title),
        EventType::Manual => format!("notification: {}", incident.title),
    }
}

fn render_body(incident: &Incident, event_type: EventType) -> String {
    format!(
        "incident {id} ({event_type})\nseverity: {severity}\nstatus: {status}\n\n{description}",
        id = incident.id,
        event_type = event_type,
        severity = incident.severity,
        status = incident.status,
        description = incident.description,
    )
}
