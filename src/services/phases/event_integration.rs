//! Phase 4: integrate events generated during interaction orchestration into
//! the durable event ledger. Classified as critical: its failure escalates
//! compensation to also roll back world state.

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::metadata::{Metadata, MetadataValue};
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::ports::collaborator::{CollaboratorRequest, CollaboratorTarget};
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};
use crate::metadata;

/// Absent fields mean the collaborator integrated every event cleanly: full
/// success, no reported conflicts.
fn processing_success_rate(data: &Metadata) -> f64 {
    match data.get("processing_success_rate") {
        Some(MetadataValue::Number(n)) => *n,
        _ => 1.0,
    }
}

fn consistency_violations(data: &Metadata) -> u64 {
    match data.get("consistency_violations") {
        Some(MetadataValue::Number(n)) => *n as u64,
        _ => 0,
    }
}

pub struct EventIntegrationExecutor;

#[async_trait]
impl PhaseExecutor for EventIntegrationExecutor {
    fn phase_type(&self) -> PhaseType {
        PhaseType::EventIntegration
    }

    async fn validate_preconditions(&self, _ctx: &PhaseExecutionContext<'_>) -> Result<(), DomainError> {
        Ok(())
    }

    async fn execute(&self, ctx: &PhaseExecutionContext<'_>) -> Result<PhaseResult, DomainError> {
        let interaction_events = ctx
            .turn
            .phase_statuses
            .get(&PhaseType::InteractionOrchestration)
            .map_or(0, |s| s.events_processed);

        let request = CollaboratorRequest::new(
            CollaboratorTarget::EventContext,
            "integrate_events",
            metadata! {
                "source_event_count" => interaction_events as f64,
            },
        );
        let response = ctx.collaborators.event_context.call(request).await?;
        if !response.success {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::EventContext.to_string(),
                operation: "integrate_events".into(),
                reason: response.error_message.unwrap_or_else(|| "unknown error".into()),
            });
        }
        let success_rate = processing_success_rate(&response.data);
        let violations = consistency_violations(&response.data);
        if success_rate <= 0.7 || violations > 0 {
            return Err(DomainError::CollaboratorFailed {
                target: CollaboratorTarget::EventContext.to_string(),
                operation: "integrate_events".into(),
                reason: format!(
                    "processing success rate {success_rate:.2} (need > 0.7) with {violations} consistency violations (need 0)"
                ),
            });
        }

        Ok(PhaseResult::success(interaction_events, interaction_events)
            .with_cross_context_calls(1)
            .with_rollback_data(metadata! {
                "integrated_event_count" => interaction_events as f64,
            }))
    }
}
