//! Executes the compensation actions a failed turn has already been planned
//! with (see `Turn::fail_phase` / `Turn::initiate_compensation`): runs
//! non-destructive actions in parallel, destructive ones serially with
//! retries, and folds every outcome back onto the turn.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::models::compensation::CompensationAction;
use crate::domain::models::metadata::Metadata;
use crate::domain::models::turn::Turn;
use crate::domain::ports::collaborator::{CollaboratorBundle, CollaboratorRequest, CollaboratorTarget};

/// Report summarizing a saga compensation run, for the HTTP status surface.
#[derive(Debug, Clone)]
pub struct CompensationReport {
    pub actions_attempted: usize,
    pub actions_succeeded: usize,
    pub actions_failed: usize,
    pub total_duration_ms: u64,
}

fn target_for(compensation: &CompensationAction) -> Option<CollaboratorTarget> {
    use crate::domain::models::compensation::CompensationType;
    match compensation.compensation_type {
        CompensationType::RollbackWorldState => Some(CollaboratorTarget::WorldContext),
        CompensationType::InvalidateSubjectiveBriefs => Some(CollaboratorTarget::AiGateway),
        CompensationType::CancelInteractions => Some(CollaboratorTarget::InteractionContext),
        CompensationType::RemoveEvents => Some(CollaboratorTarget::EventContext),
        CompensationType::RevertNarrativeChanges => Some(CollaboratorTarget::NarrativeContext),
        CompensationType::NotifyParticipants | CompensationType::TriggerManualReview => {
            Some(CollaboratorTarget::AgentContext)
        }
        CompensationType::LogFailure => None,
    }
}

async fn execute_one(
    action: &CompensationAction,
    collaborators: &CollaboratorBundle,
) -> Result<Metadata, String> {
    let Some(target) = target_for(action) else {
        info!(action_id = %action.action_id, "compensation action logged only, no collaborator call");
        return Ok(Metadata::new());
    };

    let request = CollaboratorRequest::new(
        target,
        format!("compensate:{}", action.compensation_type.display_name()),
        action.execution_parameters.clone(),
    );

    let call = collaborators.for_target(target).call(request);
    let timeout = Duration::from_millis(action.execution_timeout_ms);

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(response)) if response.success => Ok(response.data),
        Ok(Ok(response)) => Err(response.error_message.unwrap_or_else(|| "collaborator reported failure".into())),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("timed out after {}ms", action.execution_timeout_ms)),
    }
}

/// Run every pending compensation action on `turn` to completion, applying
/// retries for destructive actions, and return the updated turn plus a
/// summary report.
pub async fn run_compensations(
    turn: &Turn,
    collaborators: &CollaboratorBundle,
) -> Result<(Turn, CompensationReport), DomainError> {
    let started = std::time::Instant::now();
    let pending: Vec<CompensationAction> = turn.pending_compensations().into_iter().cloned().collect();
    let (destructive, non_destructive): (Vec<_>, Vec<_>) =
        pending.into_iter().partition(|a| a.compensation_type.is_destructive());

    let mut turn = turn.clone();

    // Non-destructive actions carry no ordering risk, so they run concurrently.
    let non_destructive_results = join_all(
        non_destructive
            .iter()
            .map(|action| execute_one(action, collaborators)),
    )
    .await;
    for (action, result) in non_destructive.iter().zip(non_destructive_results) {
        turn = apply_result(turn, action, result)?;
    }

    // Destructive actions run serially, in priority order, with retries.
    let mut destructive = destructive;
    destructive.sort_by(|a, b| b.priority.cmp(&a.priority));
    for action in &destructive {
        let mut attempt = action.clone();
        let result = loop {
            let outcome = execute_one(&attempt, collaborators).await;
            match outcome {
                Ok(data) => break Ok(data),
                Err(reason) if attempt.retry_count < attempt.max_retries => {
                    warn!(action_id = %attempt.action_id, reason, "compensation action failed, retrying");
                    attempt.retry_count += 1;
                    continue;
                }
                Err(reason) => break Err(reason),
            }
        };
        turn = apply_result(turn, action, result)?;
    }

    let actions_failed = turn
        .compensation_actions
        .iter()
        .filter(|a| a.status == crate::domain::models::compensation::CompensationStatus::Failed)
        .count();
    let actions_attempted = turn.compensation_actions.len();

    Ok((
        turn,
        CompensationReport {
            actions_attempted,
            actions_succeeded: actions_attempted - actions_failed,
            actions_failed,
            total_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        },
    ))
}

fn apply_result(turn: Turn, action: &CompensationAction, result: Result<Metadata, String>) -> Result<Turn, DomainError> {
    match result {
        Ok(data) => turn.complete_compensation_action(action.action_id, data),
        Err(reason) => turn.fail_compensation_action(action.action_id, reason),
    }
}

/// Post-compensation consistency check: a turn is considered consistent if
/// no planned compensation action is left in a non-terminal state.
#[must_use]
pub fn validate_consistency(turn: &Turn) -> Result<(), Vec<String>> {
    let unresolved: Vec<String> = turn
        .compensation_actions
        .iter()
        .filter(|a| !a.is_terminal())
        .map(|a| format!("{} ({})", a.action_id, a.compensation_type.display_name()))
        .collect();
    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::phase::PhaseType;
    use crate::domain::models::turn_configuration::TurnConfiguration;
    use crate::infrastructure::collaborators::mock::MockCollaboratorContext;
    use std::sync::Arc;

    fn bundle() -> CollaboratorBundle {
        CollaboratorBundle {
            world_context: Arc::new(MockCollaboratorContext::new(0)),
            interaction_context: Arc::new(MockCollaboratorContext::new(0)),
            event_context: Arc::new(MockCollaboratorContext::new(0)),
            ai_gateway: Arc::new(MockCollaboratorContext::new(0)),
            agent_context: Arc::new(MockCollaboratorContext::new(0)),
            narrative_context: Arc::new(MockCollaboratorContext::new(0)),
        }
    }

    #[tokio::test]
    async fn compensations_resolve_and_complete_turn() {
        let turn = Turn::create(TurnConfiguration::create_default(vec!["alice".into()]))
            .unwrap()
            .start_planning()
            .unwrap()
            .start_execution()
            .unwrap()
            .start_phase(PhaseType::WorldUpdate)
            .unwrap()
            .fail_phase(PhaseType::WorldUpdate, "collaborator down")
            .unwrap();

        let (turn, report) = run_compensations(&turn, &bundle()).await.unwrap();
        assert_eq!(report.actions_failed, 0);
        assert!(validate_consistency(&turn).is_ok());
    }
}
