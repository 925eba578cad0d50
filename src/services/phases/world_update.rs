//! Phase 1: advance world state by the turn's configured time step.

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::ports::collaborator::{CollaboratorRequest, CollaboratorTarget};
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};
use crate::metadata;

pub struct WorldUpdateExecutor;

#[async_trait]
impl PhaseExecutor for WorldUpdateExecutor {
    fn phase_type(&self) -> PhaseType {
        PhaseType::WorldUpdate
    }

    async fn validate_preconditions(&self, ctx: &PhaseExecutionContext<'_>) -> Result<(), DomainError> {
        if ctx.turn.configuration.world_time_advance == 0 {
            return Err(DomainError::PreconditionFailed {
                phase: PhaseType::WorldUpdate.to_string(),
                reason: "world_time_advance must be greater than zero".into(),
            });
        }
        Ok(())
    }

    async fn execute(&self, ctx: &PhaseExecutionContext<'_>) -> Result<PhaseResult, DomainError> {
        let request = CollaboratorRequest::new(
            CollaboratorTarget::WorldContext,
            "advance_time",
            metadata! {
                "seconds" => f64::from(ctx.turn.configuration.world_time_advance),
                "turn_id" => ctx.turn.turn_id.to_string().as_str(),
            },
        );

        let response = ctx.collaborators.world_context.call(request).await?;
        if !response.success {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::WorldContext.to_string(),
                operation: "advance_time".into(),
                reason: response.error_message.unwrap_or_else(|| "unknown error".into()),
            });
        }

        Ok(PhaseResult::success(1, 1)
            .with_cross_context_calls(1)
            .with_rollback_data(metadata! {
                "world_time_advance" => f64::from(ctx.turn.configuration.world_time_advance),
            }))
    }
}
