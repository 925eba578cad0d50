//! Phase 3: schedule and run the turn's participant interactions.

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::metadata::{Metadata, MetadataValue};
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::ports::collaborator::{CollaboratorRequest, CollaboratorTarget};
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};
use crate::metadata;

/// A collaborator that doesn't report `completion_rate` is assumed to have
/// run every session it was asked to: full success, not a free pass on
/// `> 30%`.
fn completion_rate(data: &Metadata) -> f64 {
    match data.get("completion_rate") {
        Some(MetadataValue::Number(n)) => *n,
        _ => 1.0,
    }
}

pub struct InteractionOrchestrationExecutor;

#[async_trait]
impl PhaseExecutor for InteractionOrchestrationExecutor {
    fn phase_type(&self) -> PhaseType {
        PhaseType::InteractionOrchestration
    }

    async fn validate_preconditions(&self, ctx: &PhaseExecutionContext<'_>) -> Result<(), DomainError> {
        let config = &ctx.turn.configuration;
        if config.participants.is_empty() {
            return Err(DomainError::PreconditionFailed {
                phase: PhaseType::InteractionOrchestration.to_string(),
                reason: "interaction orchestration requires at least one participant".into(),
            });
        }
        if config.participants.len() > config.max_participants {
            return Err(DomainError::PreconditionFailed {
                phase: PhaseType::InteractionOrchestration.to_string(),
                reason: format!(
                    "{} participants exceeds configured maximum of {}",
                    config.participants.len(),
                    config.max_participants
                ),
            });
        }
        Ok(())
    }

    async fn execute(&self, ctx: &PhaseExecutionContext<'_>) -> Result<PhaseResult, DomainError> {
        let config = &ctx.turn.configuration;
        let eligible: Vec<&String> = config
            .participants
            .iter()
            .filter(|p| !config.excluded_agents.contains(*p))
            .collect();

        let request = CollaboratorRequest::new(
            CollaboratorTarget::InteractionContext,
            "orchestrate_interactions",
            metadata! {
                "participant_count" => eligible.len() as f64,
            },
        );
        let response = ctx.collaborators.interaction_context.call(request).await?;
        if !response.success {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::InteractionContext.to_string(),
                operation: "orchestrate_interactions".into(),
                reason: response.error_message.unwrap_or_else(|| "unknown error".into()),
            });
        }
        let completion_rate = completion_rate(&response.data);
        if completion_rate <= 0.3 {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::InteractionContext.to_string(),
                operation: "orchestrate_interactions".into(),
                reason: format!("session completion rate {completion_rate:.2} did not exceed 0.3"),
            });
        }

        let participant_names: Vec<String> = eligible.iter().map(|p| (*p).clone()).collect();
        Ok(
            PhaseResult::success(eligible.len() as u64, eligible.len() as u64)
                .with_cross_context_calls(1)
                .with_rollback_data(metadata! {
                    "participants" => participant_names,
                }),
        )
    }
}
