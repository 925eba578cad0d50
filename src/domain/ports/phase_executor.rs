//! Phase executor framework contract.
//!
//! Each of the five pipeline phases implements [`PhaseExecutor`]; the
//! framework around it (in `services::phase_framework`) is responsible for
//! timeouts, metrics, tracing spans, and turning a panic or collaborator
//! failure into a [`crate::domain::models::PhaseResult::failure`] rather than
//! letting it escape the pipeline.

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::models::turn::Turn;
use crate::domain::ports::collaborator::CollaboratorBundle;

/// Everything a phase needs to validate preconditions and execute, without
/// reaching back into the pipeline orchestrator or saga coordinator.
pub struct PhaseExecutionContext<'a> {
    pub turn: &'a Turn,
    pub phase: PhaseType,
    pub collaborators: &'a CollaboratorBundle,
}

/// A single phase's business logic.
#[async_trait]
pub trait PhaseExecutor: Send + Sync {
    fn phase_type(&self) -> PhaseType;

    /// Cheap, synchronous-feeling checks that must hold before `execute`
    /// runs (e.g. interaction orchestration requires at least one
    /// participant). Returns `Err` with the failing reason.
    async fn validate_preconditions(&self, ctx: &PhaseExecutionContext<'_>) -> Result<(), DomainError>;

    /// Run the phase to completion, returning its result. Collaborator
    /// failures should be surfaced as `Err`, not folded into a "successful"
    /// [`PhaseResult`] — the framework converts them.
    async fn execute(&self, ctx: &PhaseExecutionContext<'_>) -> Result<PhaseResult, DomainError>;
}
