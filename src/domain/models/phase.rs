//! Phase enumeration and per-phase status value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::models::metadata::Metadata;

/// The five ordered pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    WorldUpdate,
    SubjectiveBrief,
    InteractionOrchestration,
    EventIntegration,
    NarrativeIntegration,
}

impl PhaseType {
    pub const ALL: [Self; 5] = [
        Self::WorldUpdate,
        Self::SubjectiveBrief,
        Self::InteractionOrchestration,
        Self::EventIntegration,
        Self::NarrativeIntegration,
    ];

    #[must_use]
    pub const fn order(self) -> u8 {
        match self {
            Self::WorldUpdate => 1,
            Self::SubjectiveBrief => 2,
            Self::InteractionOrchestration => 3,
            Self::EventIntegration => 4,
            Self::NarrativeIntegration => 5,
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::WorldUpdate => Some(Self::SubjectiveBrief),
            Self::SubjectiveBrief => Some(Self::InteractionOrchestration),
            Self::InteractionOrchestration => Some(Self::EventIntegration),
            Self::EventIntegration => Some(Self::NarrativeIntegration),
            Self::NarrativeIntegration => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorldUpdate => "world_update",
            Self::SubjectiveBrief => "subjective_brief",
            Self::InteractionOrchestration => "interaction_orchestration",
            Self::EventIntegration => "event_integration",
            Self::NarrativeIntegration => "narrative_integration",
        }
    }

    /// `true` for the phases critical enough that their failure escalates
    /// compensation (world update, event integration).
    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::WorldUpdate | Self::EventIntegration)
    }
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a single phase within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl PhaseState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// Immutable per-phase status. Transitions produce new values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub phase_type: PhaseType,
    pub state: PhaseState,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub progress_pct: f32,
    pub events_processed: u64,
    pub error_message: Option<String>,
    pub metadata: Metadata,
}

impl PhaseStatus {
    #[must_use]
    pub fn pending(phase_type: PhaseType) -> Self {
        Self {
            phase_type,
            state: PhaseState::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            progress_pct: 0.0,
            events_processed: 0,
            error_message: None,
            metadata: Metadata::new(),
        }
    }

    fn transition_to(&self, target: PhaseState) -> Result<Self, DomainError> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{target:?}"),
            });
        }
        if !self.state.can_transition_to(target) {
            return Err(DomainError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{target:?}"),
            });
        }
        let mut next = self.clone();
        next.state = target;
        Ok(next)
    }

    #[must_use]
    pub fn start(&self) -> Result<Self, DomainError> {
        let mut next = self.transition_to(PhaseState::Running)?;
        next.started_at = Some(Utc::now());
        next.progress_pct = 0.0;
        Ok(next)
    }

    pub fn complete(&self, events_processed: u64) -> Result<Self, DomainError> {
        let mut next = self.transition_to(PhaseState::Completed)?;
        next.completed_at = Some(Utc::now());
        next.events_processed = events_processed;
        next.progress_pct = 100.0;
        next.duration_ms = next
            .started_at
            .map(|started| (next.completed_at.unwrap() - started).num_milliseconds().max(0) as u64);
        Ok(next)
    }

    pub fn fail(&self, error_message: impl Into<String>) -> Result<Self, DomainError> {
        let mut next = self.transition_to(PhaseState::Failed)?;
        next.completed_at = Some(Utc::now());
        next.error_message = Some(error_message.into());
        next.duration_ms = next
            .started_at
            .map(|started| (next.completed_at.unwrap() - started).num_milliseconds().max(0) as u64);
        Ok(next)
    }

    #[must_use]
    pub fn skip(&self) -> Self {
        let mut next = self.clone();
        next.state = PhaseState::Skipped;
        next.completed_at = Some(Utc::now());
        next.progress_pct = 100.0;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_to_running_to_completed() {
        let status = PhaseStatus::pending(PhaseType::WorldUpdate);
        let running = status.start().unwrap();
        assert_eq!(running.state, PhaseState::Running);
        let completed = running.complete(3).unwrap();
        assert_eq!(completed.state, PhaseState::Completed);
        assert_eq!(completed.events_processed, 3);
    }

    #[test]
    fn terminal_state_rejects_transitions() {
        let status = PhaseStatus::pending(PhaseType::WorldUpdate)
            .start()
            .unwrap()
            .complete(0)
            .unwrap();
        assert!(status.start().is_err());
    }

    #[test]
    fn phase_order_is_stable() {
        assert_eq!(PhaseType::WorldUpdate.next(), Some(PhaseType::SubjectiveBrief));
        assert_eq!(PhaseType::NarrativeIntegration.next(), None);
    }
}
