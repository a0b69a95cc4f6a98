// SPDX-FileCopyrightText: 2026 Vigil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incident lifecycle state machine.
//!
//! Enforces the status transition graph and produces the audit entry for
//! every successful transition. The functions here are pure: persistence
//! (including the optimistic-concurrency guard) happens in the store.
//!
//! Allowed edges:
//!
//! ```text
//! open        -> in_progress | resolved
//! in_progress -> resolved | open        (reopen)
//! resolved    -> closed | in_progress   (reopen)
//! closed      -> (terminal)
//! ```

use vigil_core::types::{AuditEntry, Incident, IncidentStatus};
use vigil_core::VigilError;

/// The transitions allowed out of a given status.
pub fn allowed_transitions(from: IncidentStatus) -> &'static [IncidentStatus] {
    match from {
        IncidentStatus::Open => &[IncidentStatus::InProgress, IncidentStatus::Resolved],
        IncidentStatus::InProgress => &[IncidentStatus::Resolved, IncidentStatus::Open],
        IncidentStatus::Resolved => &[IncidentStatus::Closed, IncidentStatus::InProgress],
        IncidentStatus::Closed => &[],
    }
}

/// True when `from -> to` is an edge in the lifecycle graph.
pub fn is_allowed(from: IncidentStatus, to: IncidentStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// True when no transitions leave this status.
pub fn is_terminal(status: IncidentStatus) -> bool {
    allowed_transitions(status).is_empty()
}

/// Validate and apply a status transition to an incident snapshot.
///
/// On success returns the mutated incident (status, `updated_at`, `version`
/// advanced) together with the audit entry to persist alongside it. On a
/// disallowed edge returns [`VigilError::InvalidTransition`] naming both
/// states; the input incident is untouched either way.
///
/// `now` is the RFC 3339 timestamp to stamp on both records; callers pass
/// `chrono::Utc::now().to_rfc3339()` outside tests.
pub fn transition(
    incident: &Incident,
    to: IncidentStatus,
    actor: &str,
    now: &str,
) -> Result<(Incident, AuditEntry), VigilError> {
    let from = incident.status;
    if !is_allowed(from, to) {
        return Err(VigilError::InvalidTransition { from, to });
    }

    let mut updated = incident.clone();
    updated.status = to;
    // updated_at must be monotonically non-decreasing.
    if now > updated.updated_at.as_str() {
        updated.updated_at = now.to_string();
    }
    updated.version += 1;

    let audit = AuditEntry {
        incident_id: incident.id.clone(),
        from,
        to,
        actor: actor.to_string(),
        created_at: updated.updated_at.clone(),
    };

    tracing::debug!(
        incident_id = %incident.id,
        %from,
        %to,
        actor,
        "lifecycle transition validated"
    );

    Ok((updated, audit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::Severity;

    fn make_incident(status: IncidentStatus) -> Incident {
        Incident {
            id: "inc-1".to_string(),
            title: "db down".to_string(),
            description: "primary database unreachable".to_string(),
            severity: Severity::High,
            status,
            assignee: None,
            reported_by: "ops".to_string(),
            tags: vec![],
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            version: 1,
        }
    }

    const ALL: [IncidentStatus; 4] = [
        IncidentStatus::Open,
        IncidentStatus::InProgress,
        IncidentStatus::Resolved,
        IncidentStatus::Closed,
    ];

    #[test]
    fn graph_matches_the_lifecycle() {
        assert!(is_allowed(IncidentStatus::Open, IncidentStatus::InProgress));
        assert!(is_allowed(IncidentStatus::Open, IncidentStatus::Resolved));
        assert!(is_allowed(IncidentStatus::InProgress, IncidentStatus::Resolved));
        assert!(is_allowed(IncidentStatus::InProgress, IncidentStatus::Open));
        assert!(is_allowed(IncidentStatus::Resolved, IncidentStatus::Closed));
        assert!(is_allowed(IncidentStatus::Resolved, IncidentStatus::InProgress));

        assert!(!is_allowed(IncidentStatus::Open, IncidentStatus::Closed));
        assert!(!is_allowed(IncidentStatus::Resolved, IncidentStatus::Open));
        assert!(!is_allowed(IncidentStatus::InProgress, IncidentStatus::Closed));
    }

    #[test]
    fn closed_is_terminal() {
        assert!(is_terminal(IncidentStatus::Closed));
        for to in ALL {
            assert!(!is_allowed(IncidentStatus::Closed, to));
        }
        for status in [
            IncidentStatus::Open,
            IncidentStatus::InProgress,
            IncidentStatus::Resolved,
        ] {
            assert!(!is_terminal(status));
        }
    }

    #[test]
    fn no_self_transitions() {
        for status in ALL {
            assert!(!is_allowed(status, status));
        }
    }

    #[test]
    fn transition_advances_status_version_and_audit() {
        let incident = make_incident(IncidentStatus::Open);
        let (updated, audit) = transition(
            &incident,
            IncidentStatus::InProgress,
            "user-3",
            "2026-01-01T01:00:00.000Z",
        )
        .unwrap();

        assert_eq!(updated.status, IncidentStatus::InProgress);
        assert_eq!(updated.version, 2);
        assert_eq!(updated.updated_at, "2026-01-01T01:00:00.000Z");

        assert_eq!(audit.incident_id, "inc-1");
        assert_eq!(audit.from, IncidentStatus::Open);
        assert_eq!(audit.to, IncidentStatus::InProgress);
        assert_eq!(audit.actor, "user-3");
        assert_eq!(audit.created_at, updated.updated_at);
    }

    #[test]
    fn open_to_closed_is_rejected_and_incident_unchanged() {
        let incident = make_incident(IncidentStatus::Open);
        let err = transition(
            &incident,
            IncidentStatus::Closed,
            "user-3",
            "2026-01-01T01:00:00.000Z",
        )
        .unwrap_err();

        match err {
            VigilError::InvalidTransition { from, to } => {
                assert_eq!(from, IncidentStatus::Open);
                assert_eq!(to, IncidentStatus::Closed);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.version, 1);
    }

    #[test]
    fn reopen_paths_work() {
        let in_progress = make_incident(IncidentStatus::InProgress);
        let (reopened, _) = transition(
            &in_progress,
            IncidentStatus::Open,
            "user-1",
            "2026-01-01T02:00:00.000Z",
        )
        .unwrap();
        assert_eq!(reopened.status, IncidentStatus::Open);

        let resolved = make_incident(IncidentStatus::Resolved);
        let (reworked, _) = transition(
            &resolved,
            IncidentStatus::InProgress,
            "user-1",
            "2026-01-01T02:00:00.000Z",
        )
        .unwrap();
        assert_eq!(reworked.status, IncidentStatus::InProgress);
    }

    #[test]
    fn updated_at_never_moves_backwards() {
        let mut incident = make_incident(IncidentStatus::Open);
        incident.updated_at = "2026-06-01T00:00:00.000Z".to_string();

        // A clock reading earlier than the stored updated_at leaves it alone.
        let (updated, _) = transition(
            &incident,
            IncidentStatus::InProgress,
            "user-1",
            "2026-01-01T00:00:00.000Z",
        )
        .unwrap();
        assert_eq!(updated.updated_at, "2026-06-01T00:00:00.000Z");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = IncidentStatus> {
            prop::sample::select(ALL.to_vec())
        }

        proptest! {
            // Every accepted transition is an edge of the graph; every
            // rejection leaves the incident byte-identical.
            #[test]
            fn only_graph_edges_are_accepted(from in any_status(), to in any_status()) {
                let incident = make_incident(from);
                let result = transition(&incident, to, "prop", "2026-02-01T00:00:00.000Z");
                if is_allowed(from, to) {
                    let (updated, audit) = result.unwrap();
                    prop_assert_eq!(updated.status, to);
                    prop_assert_eq!(audit.from, from);
                    prop_assert_eq!(audit.to, to);
                } else {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(incident.status, from);
                    prop_assert_eq!(incident.version, 1);
                }
            }
        }
    }
}
