//! The `Turn` aggregate: the single stateful entity in this domain.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::models::compensation::{CompensationAction, CompensationStatus, CompensationType};
use crate::domain::models::events::{AuditEntry, DomainEvent, EventKind};
use crate::domain::models::metadata::Metadata;
use crate::metadata;
use crate::domain::models::phase::{PhaseState, PhaseStatus, PhaseType};
use crate::domain::models::turn_configuration::TurnConfiguration;
use crate::domain::models::turn_id::TurnId;

/// Coarse-grained lifecycle state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Created,
    Planning,
    Executing,
    Compensating,
    Completed,
    Failed,
    Cancelled,
}

impl TurnState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Planning)
                | (Self::Created, Self::Cancelled)
                | (Self::Planning, Self::Executing)
                | (Self::Planning, Self::Cancelled)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::Compensating)
                | (Self::Executing, Self::Cancelled)
                | (Self::Compensating, Self::Completed)
                | (Self::Compensating, Self::Failed)
        )
    }
}

/// The turn aggregate: tracks one run of the five-phase pipeline end to end.
///
/// Mutating methods consume `&self` and return a new `Turn`, mirroring the
/// other value objects in this module; the version counter is bumped on
/// every transition to support optimistic concurrency in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: TurnId,
    pub state: TurnState,
    pub configuration: TurnConfiguration,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub phase_statuses: HashMap<PhaseType, PhaseStatus>,
    pub current_phase: Option<PhaseType>,
    pub compensation_actions: Vec<CompensationAction>,
    /// Phases that ran to completion, in the order they committed. Read in
    /// reverse when planning compensation for a later phase's failure.
    pub committed_phases: Vec<PhaseType>,
    /// Rollback data captured from each committed phase's result, keyed by
    /// phase, so compensation can undo a phase after later phases have moved
    /// on and its own `phase_statuses` entry no longer carries it.
    pub rollback_snapshots: HashMap<PhaseType, Metadata>,
    pub audit_trail: Vec<AuditEntry>,
    pub events: Vec<DomainEvent>,
    pub error_history: Vec<String>,
    pub version: u64,
    pub failure_reason: Option<String>,
}

impl Turn {
    /// Create a new turn in `Created` state with a pending status for every
    /// enabled phase.
    pub fn create(configuration: TurnConfiguration) -> Result<Self, DomainError> {
        Self::create_with_id(configuration, TurnId::generate())
    }

    /// Same as [`Self::create`] but with a caller-supplied turn id, for the
    /// HTTP surface's optional `turn_id` request field.
    pub fn create_with_id(configuration: TurnConfiguration, turn_id: TurnId) -> Result<Self, DomainError> {
        if !configuration.is_valid() {
            return Err(DomainError::ValidationFailed(
                configuration.validate_constraints().join("; "),
            ));
        }
        let phase_statuses = PhaseType::ALL
            .iter()
            .map(|phase| {
                let status = if configuration.is_phase_enabled(*phase) {
                    PhaseStatus::pending(*phase)
                } else {
                    PhaseStatus::pending(*phase).skip()
                };
                (*phase, status)
            })
            .collect();
        let created_at = Utc::now();
        let deadline = chrono::Duration::milliseconds(configuration.max_execution_time_ms as i64)
            .checked_add(&chrono::Duration::zero())
            .map(|d| created_at + d);
        let mut turn = Self {
            turn_id,
            state: TurnState::Created,
            configuration,
            created_at,
            updated_at: created_at,
            started_at: None,
            completed_at: None,
            deadline,
            phase_statuses,
            current_phase: None,
            compensation_actions: Vec::new(),
            committed_phases: Vec::new(),
            rollback_snapshots: HashMap::new(),
            audit_trail: Vec::new(),
            events: Vec::new(),
            error_history: Vec::new(),
            version: 1,
            failure_reason: None,
        };
        turn.record(EventKind::TurnCreated, Metadata::new());
        Ok(turn)
    }

    /// Record a transition both internally (`audit_trail`) and outward
    /// (`events`) — the audit entry is this aggregate's private ledger, the
    /// domain event is what external subscribers observe.
    fn record(&mut self, kind: EventKind, details: Metadata) {
        self.updated_at = Utc::now();
        self.audit_trail
            .push(AuditEntry::new(self.turn_id.uuid(), kind, details.clone()));
        self.events
            .push(DomainEvent::new(self.turn_id.uuid(), self.version, kind, details));
    }

    fn transition_to(&self, target: TurnState) -> Result<Self, DomainError> {
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
        next.version += 1;
        Ok(next)
    }

    #[must_use]
    pub fn start_planning(&self) -> Result<Self, DomainError> {
        let mut next = self.transition_to(TurnState::Planning)?;
        next.record(EventKind::PlanningStarted, Metadata::new());
        Ok(next)
    }

    #[must_use]
    pub fn start_execution(&self) -> Result<Self, DomainError> {
        let mut next = self.transition_to(TurnState::Executing)?;
        next.started_at = Some(Utc::now());
        next.record(EventKind::ExecutionStarted, Metadata::new());
        Ok(next)
    }

    /// Transition one phase to `Running`.
    pub fn start_phase(&self, phase: PhaseType) -> Result<Self, DomainError> {
        if self.state != TurnState::Executing {
            return Err(DomainError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("phase {phase} running"),
            });
        }
        let status = self
            .phase_statuses
            .get(&phase)
            .ok_or_else(|| DomainError::Internal(format!("unknown phase {phase}")))?;
        let mut next = self.clone();
        next.phase_statuses.insert(phase, status.start()?);
        next.current_phase = Some(phase);
        next.version += 1;
        next.record(
            EventKind::PhaseStarted,
            metadata! { "phase" => phase.as_str() },
        );
        Ok(next)
    }

    /// Mark a phase `Completed`, recording the events it processed and the
    /// rollback snapshot a later phase's compensation would need to undo it.
    pub fn complete_phase(
        &self,
        phase: PhaseType,
        events_processed: u64,
        rollback_snapshot: Metadata,
    ) -> Result<Self, DomainError> {
        let status = self
            .phase_statuses
            .get(&phase)
            .ok_or_else(|| DomainError::Internal(format!("unknown phase {phase}")))?;
        let mut next = self.clone();
        next.phase_statuses.insert(phase, status.complete(events_processed)?);
        next.current_phase = None;
        next.committed_phases.push(phase);
        next.rollback_snapshots.insert(phase, rollback_snapshot);
        next.version += 1;
        next.record(
            EventKind::PhaseCompleted,
            metadata! { "phase" => phase.as_str(), "events_processed" => events_processed as f64 },
        );

        if phase == PhaseType::NarrativeIntegration || phase.next().is_none() {
            next = next.transition_to(TurnState::Completed)?;
            next.completed_at = Some(Utc::now());
            next.record(EventKind::TurnCompleted, Metadata::new());
        }
        Ok(next)
    }

    /// Mark a phase `Failed` and initiate compensation for it.
    pub fn fail_phase(&self, phase: PhaseType, reason: impl Into<String>) -> Result<Self, DomainError> {
        let reason = reason.into();
        let status = self
            .phase_statuses
            .get(&phase)
            .ok_or_else(|| DomainError::Internal(format!("unknown phase {phase}")))?;
        let mut next = self.clone();
        next.phase_statuses.insert(phase, status.fail(reason.clone())?);
        next.current_phase = None;
        next.version += 1;
        next.record(
            EventKind::PhaseFailed,
            metadata! { "phase" => phase.as_str(), "reason" => reason.as_str() },
        );
        next.failure_reason = Some(reason.clone());
        next.error_history.push(reason);
        next.initiate_compensation(phase)
    }

    /// Plan compensation for a failed phase: every phase that committed
    /// before it is unwound in reverse commit order using the rollback
    /// snapshot it left behind, then a fixed set of global actions is
    /// appended (always log the failure, notify participants if there are
    /// any, and escalate critical-phase failures to manual review).
    fn initiate_compensation(&self, failed_phase: PhaseType) -> Result<Self, DomainError> {
        if !self.configuration.rollback_enabled {
            let mut next = self.transition_to(TurnState::Failed)?;
            next.completed_at = Some(Utc::now());
            next.record(EventKind::TurnFailed, Metadata::new());
            return Ok(next);
        }
        let mut next = self.transition_to(TurnState::Compensating)?;
        next.record(
            EventKind::CompensationInitiated,
            metadata! { "phase" => failed_phase.as_str() },
        );

        for &committed_phase in next.committed_phases.clone().iter().rev() {
            let rollback_data = next
                .rollback_snapshots
                .get(&committed_phase)
                .cloned()
                .unwrap_or_default();
            for compensation_type in CompensationType::for_phase(committed_phase) {
                let action = CompensationAction::create_for_phase_failure(
                    *compensation_type,
                    committed_phase,
                    next.turn_id.uuid(),
                    rollback_data.clone(),
                    next.configuration.participants.clone(),
                );
                next.compensation_actions.push(action);
            }
        }

        next.compensation_actions.push(CompensationAction::create_for_phase_failure(
            CompensationType::LogFailure,
            failed_phase,
            next.turn_id.uuid(),
            Metadata::new(),
            next.configuration.participants.clone(),
        ));
        if !next.configuration.participants.is_empty() {
            next.compensation_actions.push(CompensationAction::create_for_phase_failure(
                CompensationType::NotifyParticipants,
                failed_phase,
                next.turn_id.uuid(),
                Metadata::new(),
                next.configuration.participants.clone(),
            ));
        }
        if failed_phase.is_critical() {
            next.compensation_actions.push(CompensationAction::create_for_phase_failure(
                CompensationType::TriggerManualReview,
                failed_phase,
                next.turn_id.uuid(),
                Metadata::new(),
                next.configuration.participants.clone(),
            ));
        }

        Ok(next)
    }

    /// Mark a planned compensation action `Completed`.
    pub fn complete_compensation_action(&self, action_id: Uuid, results: Metadata) -> Result<Self, DomainError> {
        let mut next = self.clone();
        let idx = next
            .compensation_actions
            .iter()
            .position(|a| a.action_id == action_id)
            .ok_or_else(|| DomainError::Internal(format!("unknown compensation action {action_id}")))?;
        let started = next.compensation_actions[idx].start_execution()?;
        let completed = started.complete_execution(results, None)?;
        next.compensation_actions[idx] = completed;
        next.version += 1;
        next.record(
            EventKind::CompensationActionCompleted,
            metadata! { "action_id" => action_id.to_string().as_str() },
        );
        if next.all_compensations_terminal() {
            next = next.finish_compensation()?;
        }
        Ok(next)
    }

    /// Mark a planned compensation action `Failed` (terminally, no retry path
    /// at the aggregate level — retries are the saga coordinator's concern).
    pub fn fail_compensation_action(&self, action_id: Uuid, reason: impl Into<String>) -> Result<Self, DomainError> {
        let reason = reason.into();
        let mut next = self.clone();
        let idx = next
            .compensation_actions
            .iter()
            .position(|a| a.action_id == action_id)
            .ok_or_else(|| DomainError::Internal(format!("unknown compensation action {action_id}")))?;
        next.compensation_actions[idx] = next.compensation_actions[idx].fail_execution(reason.clone(), false);
        next.version += 1;
        next.record(
            EventKind::CompensationActionFailed,
            metadata! { "action_id" => action_id.to_string().as_str(), "reason" => reason.as_str() },
        );
        next.error_history.push(reason);
        if next.all_compensations_terminal() {
            next = next.finish_compensation()?;
        }
        Ok(next)
    }

    fn all_compensations_terminal(&self) -> bool {
        self.compensation_actions.iter().all(CompensationAction::is_terminal)
    }

    fn finish_compensation(&self) -> Result<Self, DomainError> {
        let any_failed = self
            .compensation_actions
            .iter()
            .any(|a| a.status == CompensationStatus::Failed);
        let mut next = self.clone();
        if any_failed {
            next = next.transition_to(TurnState::Failed)?;
            next.completed_at = Some(Utc::now());
            next.record(EventKind::TurnFailed, Metadata::new());
        } else {
            next = next.transition_to(TurnState::Completed)?;
            next.completed_at = Some(Utc::now());
            next.record(EventKind::TurnCompensationCompleted, Metadata::new());
        }
        Ok(next)
    }

    #[must_use]
    pub fn cancel(&self) -> Result<Self, DomainError> {
        let mut next = self.transition_to(TurnState::Cancelled)?;
        next.completed_at = Some(Utc::now());
        Ok(next)
    }

    #[must_use]
    pub fn completed_phases(&self) -> Vec<PhaseType> {
        self.phase_statuses
            .iter()
            .filter(|(_, s)| s.state == PhaseState::Completed)
            .map(|(p, _)| *p)
            .collect()
    }

    #[must_use]
    pub fn failed_phases(&self) -> Vec<PhaseType> {
        self.phase_statuses
            .iter()
            .filter(|(_, s)| s.state == PhaseState::Failed)
            .map(|(p, _)| *p)
            .collect()
    }

    #[must_use]
    pub fn pending_compensations(&self) -> Vec<&CompensationAction> {
        self.compensation_actions.iter().filter(|a| !a.is_terminal()).collect()
    }

    #[must_use]
    pub fn execution_time(&self) -> Option<chrono::Duration> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some(end - started)
    }

    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.deadline.is_some_and(|deadline| !self.state.is_terminal() && Utc::now() > deadline)
    }

    #[must_use]
    pub fn completion_percentage(&self) -> f32 {
        let completed = self.completed_phases().len() as f32;
        (completed / PhaseType::ALL.len() as f32) * 100.0
    }

    #[must_use]
    pub fn performance_summary(&self) -> Metadata {
        metadata! {
            "completion_percentage" => self.completion_percentage() as f64,
            "compensation_actions" => self.compensation_actions.len() as f64,
            "version" => self.version as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_turn() -> Turn {
        Turn::create(TurnConfiguration::create_default(vec!["alice".into()])).unwrap()
    }

    #[test]
    fn happy_path_runs_through_all_five_phases() {
        let turn = new_turn().start_planning().unwrap().start_execution().unwrap();
        let mut turn = turn;
        for phase in PhaseType::ALL {
            turn = turn.start_phase(phase).unwrap();
            turn = turn.complete_phase(phase, 1, Metadata::new()).unwrap();
        }
        assert_eq!(turn.state, TurnState::Completed);
        assert_eq!(turn.completion_percentage(), 100.0);
        assert_eq!(turn.committed_phases.len(), PhaseType::ALL.len());
    }

    #[test]
    fn compensation_unwinds_committed_phases_in_reverse_then_appends_global_actions() {
        let turn = new_turn()
            .start_planning()
            .unwrap()
            .start_execution()
            .unwrap()
            .start_phase(PhaseType::WorldUpdate)
            .unwrap();
        let turn = turn
            .complete_phase(PhaseType::WorldUpdate, 2, metadata! { "snapshot" => "world-v1" })
            .unwrap();
        let turn = turn.start_phase(PhaseType::SubjectiveBrief).unwrap();
        let turn = turn.fail_phase(PhaseType::SubjectiveBrief, "collaborator unreachable").unwrap();

        // WorldUpdate committed before the failure, so its compensation table
        // runs first, in front of the global actions appended after it.
        let world_update_actions: Vec<_> = turn
            .compensation_actions
            .iter()
            .filter(|a| a.target_phase == PhaseType::WorldUpdate)
            .collect();
        assert!(!world_update_actions.is_empty());
        assert!(world_update_actions
            .iter()
            .any(|a| a.compensation_type == CompensationType::RollbackWorldState));
        assert!(world_update_actions.iter().all(|a| a.rollback_data.get("snapshot").is_some()));

        assert!(turn
            .compensation_actions
            .iter()
            .any(|a| a.target_phase == PhaseType::SubjectiveBrief
                && a.compensation_type == CompensationType::LogFailure));
        assert!(turn
            .compensation_actions
            .iter()
            .any(|a| a.compensation_type == CompensationType::NotifyParticipants
                && a.target_phase == PhaseType::SubjectiveBrief));
        // SubjectiveBrief isn't a critical phase, so no manual-review escalation.
        assert!(!turn
            .compensation_actions
            .iter()
            .any(|a| a.compensation_type == CompensationType::TriggerManualReview));
    }

    #[test]
    fn critical_phase_failure_triggers_manual_review() {
        let turn = new_turn()
            .start_planning()
            .unwrap()
            .start_execution()
            .unwrap()
            .start_phase(PhaseType::WorldUpdate)
            .unwrap();
        let turn = turn.fail_phase(PhaseType::WorldUpdate, "boom").unwrap();
        assert!(turn
            .compensation_actions
            .iter()
            .any(|a| a.compensation_type == CompensationType::TriggerManualReview));
    }

    #[test]
    fn failed_phase_initiates_compensation_and_eventually_completes() {
        let turn = new_turn()
            .start_planning()
            .unwrap()
            .start_execution()
            .unwrap()
            .start_phase(PhaseType::WorldUpdate)
            .unwrap();
        let turn = turn.fail_phase(PhaseType::WorldUpdate, "collaborator unreachable").unwrap();
        assert_eq!(turn.state, TurnState::Compensating);
        assert!(!turn.compensation_actions.is_empty());

        let mut turn = turn;
        let action_ids: Vec<Uuid> = turn.compensation_actions.iter().map(|a| a.action_id).collect();
        for id in action_ids {
            turn = turn.complete_compensation_action(id, Metadata::new()).unwrap();
        }
        assert_eq!(turn.state, TurnState::Completed);
    }

    #[test]
    fn terminal_state_rejects_further_transitions() {
        let turn = new_turn().cancel().unwrap();
        assert!(turn.start_planning().is_err());
    }

    #[test]
    fn rollback_disabled_fails_turn_directly() {
        let mut config = TurnConfiguration::create_default(vec!["alice".into()]);
        config.rollback_enabled = false;
        let turn = Turn::create(config)
            .unwrap()
            .start_planning()
            .unwrap()
            .start_execution()
            .unwrap()
            .start_phase(PhaseType::WorldUpdate)
            .unwrap();
        let turn = turn.fail_phase(PhaseType::WorldUpdate, "boom").unwrap();
        assert_eq!(turn.state, TurnState::Failed);
        assert!(turn.compensation_actions.is_empty());
    }
}
