//! Drives one turn through all five phases, handing off to the saga
//! coordinator the moment a phase fails.
//!
//! 1. Create the turn from its configuration.
//! 2. Transition to `Planning`.
//! 3. Transition to `Executing`.
//! 4. For each enabled phase, in order:
//!    a. Start the phase.
//!    b. Run it through the phase executor framework.
//!    c. On success, complete the phase and accumulate its result.
//!    d. On failure, fail the phase (which plans compensation) and stop
//!       iterating further phases.
//! 5. If any phase failed, hand the turn to the saga coordinator.
//! 6. Validate post-compensation consistency.
//! 7. Assemble the final [`PipelineResult`].
//! 8. Return the finished turn alongside its result.

use std::collections::HashMap;

use tracing::{error, info};

use crate::domain::error::DomainError;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::models::pipeline_result::PipelineResult;
use crate::domain::models::turn::{Turn, TurnState};
use crate::domain::models::turn_configuration::TurnConfiguration;
use crate::domain::models::turn_id::TurnId;
use crate::domain::ports::collaborator::CollaboratorBundle;
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};
use crate::services::phase_framework::run_phase;
use crate::services::phases::{
    EventIntegrationExecutor, InteractionOrchestrationExecutor, NarrativeIntegrationExecutor,
    SubjectiveBriefExecutor, WorldUpdateExecutor,
};
use crate::services::saga_coordinator;

/// Registry of phase executors, keyed by phase type. A future phase type
/// only needs an entry here, not a change to the orchestration loop.
fn executor_for(phase: PhaseType) -> Box<dyn PhaseExecutor> {
    match phase {
        PhaseType::WorldUpdate => Box::new(WorldUpdateExecutor),
        PhaseType::SubjectiveBrief => Box::new(SubjectiveBriefExecutor),
        PhaseType::InteractionOrchestration => Box::new(InteractionOrchestrationExecutor),
        PhaseType::EventIntegration => Box::new(EventIntegrationExecutor),
        PhaseType::NarrativeIntegration => Box::new(NarrativeIntegrationExecutor),
    }
}

/// Run a brand new turn through the whole pipeline end to end.
pub async fn run_turn(
    configuration: TurnConfiguration,
    collaborators: &CollaboratorBundle,
) -> Result<(Turn, PipelineResult), DomainError> {
    run_turn_with_id(configuration, None, collaborators).await
}

/// Same as [`run_turn`] but honoring a caller-supplied turn id.
pub async fn run_turn_with_id(
    configuration: TurnConfiguration,
    turn_id: Option<TurnId>,
    collaborators: &CollaboratorBundle,
) -> Result<(Turn, PipelineResult), DomainError> {
    let started = std::time::Instant::now();
    let turn = match turn_id {
        Some(id) => Turn::create_with_id(configuration, id)?,
        None => Turn::create(configuration)?,
    };
    let turn = turn.start_planning()?;
    let mut turn = turn.start_execution()?;

    let mut phase_results: HashMap<PhaseType, PhaseResult> = HashMap::new();
    let mut failure_summary: Option<String> = None;

    for phase in PhaseType::ALL {
        if !turn.configuration.is_phase_enabled(phase) {
            continue;
        }

        turn = turn.start_phase(phase)?;
        let executor = executor_for(phase);
        let ctx = PhaseExecutionContext {
            turn: &turn,
            phase,
            collaborators,
        };

        match run_phase(executor.as_ref(), &ctx).await {
            Ok(result) => {
                info!(phase = %phase, turn_id = %turn.turn_id, "phase completed");
                turn = turn.complete_phase(phase, result.events_processed, result.rollback_data.clone())?;
                phase_results.insert(phase, result);
            }
            Err(err) => {
                error!(phase = %phase, turn_id = %turn.turn_id, error = %err, "phase failed");
                phase_results.insert(phase, PhaseResult::failure(err.to_string()));
                failure_summary = Some(err.to_string());
                turn = turn.fail_phase(phase, err.to_string())?;
                break;
            }
        }
    }

    let total_execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if turn.state == TurnState::Compensating {
        let (compensated_turn, report) = saga_coordinator::run_compensations(&turn, collaborators).await?;
        turn = compensated_turn;
        if let Err(unresolved) = saga_coordinator::validate_consistency(&turn) {
            error!(turn_id = %turn.turn_id, ?unresolved, "turn left in an inconsistent state after compensation");
        }
        info!(
            turn_id = %turn.turn_id,
            succeeded = report.actions_succeeded,
            failed = report.actions_failed,
            "compensation run complete"
        );
    }

    let result = if turn.state == TurnState::Completed && failure_summary.is_none() {
        PipelineResult::completed(phase_results, total_execution_time_ms)
    } else {
        PipelineResult::compensated(
            phase_results,
            total_execution_time_ms,
            turn.compensation_actions.clone(),
            failure_summary.unwrap_or_else(|| "turn did not complete successfully".into()),
        )
    };

    Ok((turn, result))
}
