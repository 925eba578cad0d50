//! Phase 2: produce each participant's subjective brief of the updated world.

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::{AiOperation, AiUsage, PhaseResult};
use crate::domain::ports::collaborator::{CollaboratorRequest, CollaboratorTarget};
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};
use crate::metadata;

pub struct SubjectiveBriefExecutor;

#[async_trait]
impl PhaseExecutor for SubjectiveBriefExecutor {
    fn phase_type(&self) -> PhaseType {
        PhaseType::SubjectiveBrief
    }

    async fn validate_preconditions(&self, ctx: &PhaseExecutionContext<'_>) -> Result<(), DomainError> {
        if ctx.turn.configuration.participants.is_empty() {
            return Err(DomainError::PreconditionFailed {
                phase: PhaseType::SubjectiveBrief.to_string(),
                reason: "at least one participant is required".into(),
            });
        }
        Ok(())
    }

    async fn execute(&self, ctx: &PhaseExecutionContext<'_>) -> Result<PhaseResult, DomainError> {
        let config = &ctx.turn.configuration;

        if !config.should_use_ai_for_phase(PhaseType::SubjectiveBrief) {
            let mut result = PhaseResult::success(
                config.participants.len() as u64,
                config.participants.len() as u64,
            );
            result.metadata.insert(
                "ai_integration_disabled".to_string(),
                crate::domain::models::metadata::MetadataValue::Bool(true),
            );
            return Ok(result);
        }

        let max_tokens = config.narrative_analysis_depth.subjective_brief_max_tokens();
        let mut ai_usage = AiUsage::default();
        let mut cross_context_calls = 0u32;
        let mut valid_briefs = 0u64;

        for participant in &config.participants {
            let request = CollaboratorRequest::new(
                CollaboratorTarget::AiGateway,
                "generate_subjective_brief",
                metadata! {
                    "participant" => participant.as_str(),
                    "max_tokens" => f64::from(max_tokens),
                    "temperature" => config.ai_temperature,
                },
            );
            let response = ctx.collaborators.ai_gateway.call(request).await?;
            cross_context_calls += 1;
            if !response.success {
                continue;
            }
            valid_briefs += 1;
            ai_usage = ai_usage.record(AiOperation {
                operation_name: format!("subjective_brief:{participant}"),
                model: "default".into(),
                prompt_tokens: max_tokens as u64 / 2,
                completion_tokens: max_tokens as u64 / 2,
                cost: rust_decimal::Decimal::new(2, 2),
            });
        }

        // More than half of participants must have produced a valid brief.
        let total = config.participants.len() as u64;
        if valid_briefs * 2 <= total {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::AiGateway.to_string(),
                operation: "generate_subjective_brief".into(),
                reason: format!("only {valid_briefs} of {total} participants produced a valid brief"),
            });
        }

        if let Some(max_cost) = config.max_ai_cost {
            if ai_usage.total_cost > max_cost {
                return Err(DomainError::AiBudgetExceeded {
                    estimated: ai_usage.total_cost.to_string(),
                    limit: max_cost.to_string(),
                });
            }
        }

        Ok(PhaseResult::success(valid_briefs, valid_briefs)
            .with_ai_usage(ai_usage)
            .with_cross_context_calls(cross_context_calls))
    }
}
