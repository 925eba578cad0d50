//! Domain-level errors for the turn engine.
//!
//! Each variant corresponds to one of the error kinds in the orchestration
//! error-handling design: validation, precondition, timeout, collaborator,
//! AI budget, consistency, compensation failure, and internal.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while planning or executing a turn.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad request shape or semantics. Surfaced as HTTP 400, never retried.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Phase preconditions unmet (e.g. no participants for interaction).
    #[error("precondition failed for phase {phase}: {reason}")]
    PreconditionFailed { phase: String, reason: String },

    /// Phase deadline exceeded.
    #[error("phase {phase} timed out after {timeout_ms}ms")]
    Timeout { phase: String, timeout_ms: u64 },

    /// A collaborator call returned `success=false` or a transport error.
    #[error("collaborator '{target}' call '{operation}' failed: {reason}")]
    CollaboratorFailed {
        target: String,
        operation: String,
        reason: String,
    },

    /// Configured AI cost limit exceeded before or during a phase.
    #[error("AI budget exceeded: estimated {estimated}, limit {limit}")]
    AiBudgetExceeded { estimated: String, limit: String },

    /// Post-phase validation found critical consistency issues.
    #[error("consistency violation in phase {phase}: {reason}")]
    ConsistencyViolation { phase: String, reason: String },

    /// A destructive compensation step failed terminally.
    #[error("compensation action {action_id} failed terminally: {reason}")]
    CompensationFailed { action_id: Uuid, reason: String },

    /// Turn state machine invariant violated.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Referenced turn id has no active registration.
    #[error("turn not found: {0}")]
    TurnNotFound(Uuid),

    /// Unexpected internal error; never crashes the server, logged with context.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Stable machine-readable error type, used in HTTP error envelopes and
    /// `errors_total` metric labels.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_error",
            Self::PreconditionFailed { .. } => "precondition_error",
            Self::Timeout { .. } => "timeout_error",
            Self::CollaboratorFailed { .. } => "collaborator_error",
            Self::AiBudgetExceeded { .. } => "ai_budget_error",
            Self::ConsistencyViolation { .. } => "consistency_error",
            Self::CompensationFailed { .. } => "compensation_failed",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::TurnNotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether a saga retry of the action that produced this error makes sense.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::CollaboratorFailed { .. } | Self::Internal(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization error: {err}"))
    }
}
