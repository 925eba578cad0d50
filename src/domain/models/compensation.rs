//! Compensation type catalogue and compensating-action records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::models::metadata::Metadata;
use crate::domain::models::phase::PhaseType;

/// Severity classification used to derive default priority and escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn default_priority(self) -> u8 {
        match self {
            Self::Critical => 9,
            Self::High => 7,
            Self::Medium => 5,
            Self::Low => 3,
        }
    }
}

/// One of the eight compensating-action kinds the saga coordinator can plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationType {
    RollbackWorldState,
    InvalidateSubjectiveBriefs,
    CancelInteractions,
    RemoveEvents,
    RevertNarrativeChanges,
    NotifyParticipants,
    LogFailure,
    TriggerManualReview,
}

impl CompensationType {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::RollbackWorldState => "Rollback World State",
            Self::InvalidateSubjectiveBriefs => "Invalidate Subjective Briefs",
            Self::CancelInteractions => "Cancel Interactions",
            Self::RemoveEvents => "Remove Events",
            Self::RevertNarrativeChanges => "Revert Narrative Changes",
            Self::NotifyParticipants => "Notify Participants",
            Self::LogFailure => "Log Failure",
            Self::TriggerManualReview => "Trigger Manual Review",
        }
    }

    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::RollbackWorldState | Self::RevertNarrativeChanges => Severity::Critical,
            Self::InvalidateSubjectiveBriefs | Self::CancelInteractions => Severity::High,
            Self::NotifyParticipants | Self::TriggerManualReview => Severity::Medium,
            Self::LogFailure => Severity::Low,
        }
    }

    #[must_use]
    pub const fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::RollbackWorldState | Self::RemoveEvents | Self::CancelInteractions
        )
    }

    #[must_use]
    pub const fn requires_confirmation(self) -> bool {
        matches!(
            self,
            Self::RollbackWorldState | Self::RemoveEvents | Self::TriggerManualReview
        )
    }

    #[must_use]
    pub const fn default_timeout_ms(self) -> u64 {
        match self {
            Self::RollbackWorldState => 15_000,
            Self::InvalidateSubjectiveBriefs => 5_000,
            Self::CancelInteractions => 8_000,
            Self::RemoveEvents => 12_000,
            Self::RevertNarrativeChanges => 10_000,
            Self::NotifyParticipants => 3_000,
            Self::LogFailure => 2_000,
            Self::TriggerManualReview => 1_000,
        }
    }

    /// Base cost (in cents) used to synthesize `actual_cost` when a
    /// compensation handler does not report one of its own.
    #[must_use]
    pub const fn default_base_cost_cents(self) -> u32 {
        match self {
            Self::RollbackWorldState => 50,
            Self::RemoveEvents => 30,
            Self::CancelInteractions => 20,
            Self::RevertNarrativeChanges => 25,
            Self::InvalidateSubjectiveBriefs => 10,
            Self::NotifyParticipants | Self::TriggerManualReview => 5,
            Self::LogFailure => 0,
        }
    }

    /// Compensation types registered for a failed phase, in application order.
    #[must_use]
    pub const fn for_phase(phase: PhaseType) -> &'static [Self] {
        match phase {
            PhaseType::WorldUpdate => &[
                Self::RollbackWorldState,
                Self::LogFailure,
                Self::NotifyParticipants,
            ],
            PhaseType::SubjectiveBrief => {
                &[Self::InvalidateSubjectiveBriefs, Self::LogFailure]
            }
            PhaseType::InteractionOrchestration => &[
                Self::CancelInteractions,
                Self::NotifyParticipants,
                Self::LogFailure,
            ],
            PhaseType::EventIntegration => &[
                Self::RemoveEvents,
                Self::RollbackWorldState,
                Self::LogFailure,
            ],
            PhaseType::NarrativeIntegration => {
                &[Self::RevertNarrativeChanges, Self::LogFailure]
            }
        }
    }
}

/// Lifecycle status of a [`CompensationAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Skipped,
}

/// A single compensating action planned or executed by the saga coordinator.
///
/// Immutable; lifecycle methods return new instances, matching the other
/// value objects in this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationAction {
    pub action_id: Uuid,
    pub compensation_type: CompensationType,
    pub target_phase: PhaseType,
    pub turn_id: Uuid,
    pub triggered_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: CompensationStatus,
    pub execution_parameters: Metadata,
    pub execution_results: Metadata,
    pub rollback_data: Metadata,
    pub affected_entities: Vec<String>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub priority: u8,
    pub requires_manual_approval: bool,
    pub approval_granted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub execution_timeout_ms: u64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_details: Option<String>,
    pub metadata: Metadata,
}

impl CompensationAction {
    /// Build an action for a phase that failed, deriving priority, timeout,
    /// and the manual-approval flag from the compensation type's severity.
    #[must_use]
    pub fn create_for_phase_failure(
        compensation_type: CompensationType,
        target_phase: PhaseType,
        turn_id: Uuid,
        rollback_data: Metadata,
        affected_entities: Vec<String>,
    ) -> Self {
        Self {
            action_id: Uuid::new_v4(),
            compensation_type,
            target_phase,
            turn_id,
            triggered_at: Utc::now(),
            completed_at: None,
            status: CompensationStatus::Pending,
            execution_parameters: Metadata::new(),
            execution_results: Metadata::new(),
            rollback_data,
            affected_entities,
            estimated_cost: None,
            actual_cost: None,
            priority: compensation_type.severity().default_priority(),
            requires_manual_approval: compensation_type.requires_confirmation(),
            approval_granted_at: None,
            approved_by: None,
            execution_timeout_ms: compensation_type.default_timeout_ms(),
            retry_count: 0,
            max_retries: 3,
            error_details: None,
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            CompensationStatus::Completed | CompensationStatus::Failed | CompensationStatus::Skipped
        )
    }

    #[must_use]
    pub fn is_ready_to_execute(&self) -> bool {
        self.status == CompensationStatus::Pending
            && (!self.requires_manual_approval || self.approval_granted_at.is_some())
    }

    pub fn start_execution(&self) -> Result<Self, DomainError> {
        if self.status != CompensationStatus::Pending {
            return Err(DomainError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: "Executing".into(),
            });
        }
        let mut next = self.clone();
        next.status = CompensationStatus::Executing;
        Ok(next)
    }

    pub fn complete_execution(&self, results: Metadata, actual_cost: Option<f64>) -> Result<Self, DomainError> {
        if self.status != CompensationStatus::Executing {
            return Err(DomainError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: "Completed".into(),
            });
        }
        let mut next = self.clone();
        next.status = CompensationStatus::Completed;
        next.completed_at = Some(Utc::now());
        next.execution_results = results;
        next.actual_cost = actual_cost.or(Some(
            f64::from(self.compensation_type.default_base_cost_cents()) / 100.0,
        ));
        Ok(next)
    }

    /// Fail execution; if retryable and under `max_retries`, returns to
    /// `Pending` with `retry_count` incremented, otherwise becomes terminal.
    pub fn fail_execution(&self, error_details: impl Into<String>, can_retry: bool) -> Self {
        let mut next = self.clone();
        next.error_details = Some(error_details.into());
        if can_retry && self.retry_count < self.max_retries {
            next.status = CompensationStatus::Pending;
            next.retry_count += 1;
        } else {
            next.status = CompensationStatus::Failed;
            next.completed_at = Some(Utc::now());
        }
        next
    }

    #[must_use]
    pub fn grant_approval(&self, approved_by: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.approval_granted_at = Some(Utc::now());
        next.approved_by = Some(approved_by.into());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destructive_types_require_confirmation() {
        assert!(CompensationType::RollbackWorldState.requires_confirmation());
        assert!(CompensationType::RollbackWorldState.is_destructive());
        assert!(!CompensationType::LogFailure.requires_confirmation());
    }

    #[test]
    fn phase_compensations_match_registered_table() {
        assert_eq!(
            CompensationType::for_phase(PhaseType::WorldUpdate),
            &[
                CompensationType::RollbackWorldState,
                CompensationType::LogFailure,
                CompensationType::NotifyParticipants
            ]
        );
    }

    #[test]
    fn created_action_inherits_manual_approval_from_type() {
        let action = CompensationAction::create_for_phase_failure(
            CompensationType::RollbackWorldState,
            PhaseType::WorldUpdate,
            Uuid::new_v4(),
            Metadata::new(),
            vec!["alice".into()],
        );
        assert!(action.requires_manual_approval);
        assert_eq!(action.priority, 9);
    }

    #[test]
    fn retry_exhaustion_terminates_in_failed() {
        let mut action = CompensationAction::create_for_phase_failure(
            CompensationType::LogFailure,
            PhaseType::WorldUpdate,
            Uuid::new_v4(),
            Metadata::new(),
            vec![],
        );
        action.max_retries = 1;
        let started = action.start_execution().unwrap();
        let retried = started.fail_execution("transient", true);
        assert_eq!(retried.status, CompensationStatus::Pending);
        let started_again = retried.start_execution().unwrap();
        let terminal = started_again.fail_execution("still failing", true);
        assert_eq!(terminal.status, CompensationStatus::Failed);
    }
}
