//! Domain events emitted onto a turn's audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::metadata::Metadata;

/// The closed set of event kinds a turn can emit over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    TurnCreated,
    PlanningStarted,
    ExecutionStarted,
    PhaseStarted,
    PhaseCompleted,
    PhaseFailed,
    CompensationInitiated,
    CompensationActionCompleted,
    CompensationActionFailed,
    TurnCompleted,
    TurnFailed,
    TurnCompensationCompleted,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TurnCreated => "turn-created",
            Self::PlanningStarted => "planning-started",
            Self::ExecutionStarted => "execution-started",
            Self::PhaseStarted => "phase-started",
            Self::PhaseCompleted => "phase-completed",
            Self::PhaseFailed => "phase-failed",
            Self::CompensationInitiated => "compensation-initiated",
            Self::CompensationActionCompleted => "compensation-action-completed",
            Self::CompensationActionFailed => "compensation-action-failed",
            Self::TurnCompleted => "turn-completed",
            Self::TurnFailed => "turn-failed",
            Self::TurnCompensationCompleted => "turn-compensation-completed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single append-only audit entry recorded against a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub turn_id: Uuid,
    pub kind: EventKind,
    pub recorded_at: DateTime<Utc>,
    pub details: Metadata,
}

impl AuditEntry {
    #[must_use]
    pub fn new(turn_id: Uuid, kind: EventKind, details: Metadata) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            turn_id,
            kind,
            recorded_at: Utc::now(),
            details,
        }
    }
}

/// An outward-facing domain event, distinct from the internal audit entry
/// recorded alongside it: external subscribers read `events`, not
/// `auditTrail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub version: u64,
    pub kind: EventKind,
    pub payload: Metadata,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    #[must_use]
    pub fn new(aggregate_id: Uuid, version: u64, kind: EventKind, payload: Metadata) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            version,
            kind,
            payload,
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_renders_kebab_case() {
        assert_eq!(EventKind::CompensationActionFailed.as_str(), "compensation-action-failed");
    }

    #[test]
    fn domain_event_carries_the_aggregate_id_and_version() {
        let turn_id = Uuid::new_v4();
        let event = DomainEvent::new(turn_id, 3, EventKind::PhaseCompleted, Metadata::new());
        assert_eq!(event.aggregate_id, turn_id);
        assert_eq!(event.version, 3);
    }
}
