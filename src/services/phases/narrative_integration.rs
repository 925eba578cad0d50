//! Phase 5: weave integrated events into the narrative, closing out the turn.

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::{AiOperation, AiUsage, PhaseResult};
use crate::domain::ports::collaborator::{CollaboratorRequest, CollaboratorTarget};
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};
use crate::metadata;

pub struct NarrativeIntegrationExecutor;

#[async_trait]
impl PhaseExecutor for NarrativeIntegrationExecutor {
    fn phase_type(&self) -> PhaseType {
        PhaseType::NarrativeIntegration
    }

    async fn validate_preconditions(&self, _ctx: &PhaseExecutionContext<'_>) -> Result<(), DomainError> {
        Ok(())
    }

    async fn execute(&self, ctx: &PhaseExecutionContext<'_>) -> Result<PhaseResult, DomainError> {
        let config = &ctx.turn.configuration;

        if !config.should_use_ai_for_phase(PhaseType::NarrativeIntegration) {
            let mut result = PhaseResult::success(1, 1);
            result.metadata.insert(
                "ai_integration_disabled".to_string(),
                crate::domain::models::metadata::MetadataValue::Bool(true),
            );
            return Ok(result);
        }

        let max_tokens = config.narrative_analysis_depth.narrative_max_tokens();
        let mut ai_usage = AiUsage::default();
        let mut cross_context_calls = 0u32;
        let mut valid_perspectives = 0u64;

        for perspective in &config.narrative_perspectives {
            let request = CollaboratorRequest::new(
                CollaboratorTarget::NarrativeContext,
                "weave_narrative",
                metadata! {
                    "perspective" => perspective.as_str(),
                    "max_tokens" => f64::from(max_tokens),
                    "temperature" => config.ai_temperature,
                    "themes" => config.narrative_themes.clone(),
                },
            );
            let response = ctx.collaborators.narrative_context.call(request).await?;
            cross_context_calls += 1;
            if !response.success {
                continue;
            }
            valid_perspectives += 1;
            ai_usage = ai_usage.record(AiOperation {
                operation_name: format!("narrative_integration:{perspective}"),
                model: "default".into(),
                prompt_tokens: max_tokens as u64 / 2,
                completion_tokens: max_tokens as u64 / 2,
                cost: rust_decimal::Decimal::new(3, 2),
            });
        }

        // More than half of perspectives must have produced valid content.
        let total = config.narrative_perspectives.len() as u64;
        if valid_perspectives * 2 <= total {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::NarrativeContext.to_string(),
                operation: "weave_narrative".into(),
                reason: format!("only {valid_perspectives} of {total} perspectives produced valid content"),
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

        Ok(PhaseResult::success(valid_perspectives, valid_perspectives)
            .with_ai_usage(ai_usage)
            .with_cross_context_calls(cross_context_calls))
    }
}
