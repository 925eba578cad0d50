//! Wraps a [`PhaseExecutor`] with the behavior every phase needs uniformly:
//! precondition validation, a deadline, and a tracing span. A phase's own
//! `execute` never has to think about timeouts or about turning a
//! collaborator failure into a well-formed [`PhaseResult`] — the framework
//! does that translation once, here.

use std::time::Duration;

use tracing::{info_span, Instrument};

use crate::domain::error::DomainError;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::ports::phase_executor::{PhaseExecutionContext, PhaseExecutor};

/// Run `executor` against `ctx`, honoring the turn's configured timeout for
/// this phase. Precondition failures and timeouts both produce a
/// [`DomainError`]; the caller (the pipeline orchestrator) decides whether
/// that triggers compensation.
pub async fn run_phase(
    executor: &dyn PhaseExecutor,
    ctx: &PhaseExecutionContext<'_>,
) -> Result<PhaseResult, DomainError> {
    let phase = executor.phase_type();
    let span = info_span!("phase_execution", phase = %phase, turn_id = %ctx.turn.turn_id);

    async move {
        executor.validate_preconditions(ctx).await.map_err(|err| {
            DomainError::PreconditionFailed {
                phase: phase.to_string(),
                reason: err.to_string(),
            }
        })?;

        let timeout_ms = ctx.turn.configuration.phase_timeout(phase);
        let timeout = Duration::from_millis(timeout_ms);

        match tokio::time::timeout(timeout, executor.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Timeout {
                phase: phase.to_string(),
                timeout_ms,
            }),
        }
    }
    .instrument(span)
    .await
}
