//! Uniform interface to the external logical contexts a phase calls into.
//!
//! Every phase talks to the rest of the simulation (world state, interaction
//! scheduling, event ledger, the AI gateway, agent registry, narrative store)
//! through the same `call(target, operation, parameters)` shape rather than a
//! bespoke client per context. This keeps the phase executor framework and
//! the saga coordinator ignorant of how any particular context is reached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::models::metadata::Metadata;

/// Logical target a collaborator call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorTarget {
    WorldContext,
    InteractionContext,
    EventContext,
    AiGateway,
    AgentContext,
    NarrativeContext,
}

impl CollaboratorTarget {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorldContext => "world_context",
            Self::InteractionContext => "interaction_context",
            Self::EventContext => "event_context",
            Self::AiGateway => "ai_gateway",
            Self::AgentContext => "agent_context",
            Self::NarrativeContext => "narrative_context",
        }
    }
}

impl std::fmt::Display for CollaboratorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single cross-context request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorRequest {
    pub target: CollaboratorTarget,
    pub operation: String,
    pub parameters: Metadata,
}

impl CollaboratorRequest {
    #[must_use]
    pub fn new(target: CollaboratorTarget, operation: impl Into<String>, parameters: Metadata) -> Self {
        Self {
            target,
            operation: operation.into(),
            parameters,
        }
    }
}

/// Outcome of a cross-context call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorResponse {
    pub success: bool,
    pub data: Metadata,
    pub error_message: Option<String>,
    pub latency_ms: u64,
}

impl CollaboratorResponse {
    #[must_use]
    pub fn success(data: Metadata, latency_ms: u64) -> Self {
        Self {
            success: true,
            data,
            error_message: None,
            latency_ms,
        }
    }

    #[must_use]
    pub fn failure(error_message: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            success: false,
            data: Metadata::new(),
            error_message: Some(error_message.into()),
            latency_ms,
        }
    }
}

/// Implemented once per external logical context (or once per mock/HTTP
/// transport, dispatching internally on [`CollaboratorTarget`]).
#[async_trait]
pub trait CollaboratorContext: Send + Sync {
    async fn call(&self, request: CollaboratorRequest) -> Result<CollaboratorResponse, DomainError>;
}

/// The full set of collaborators a turn needs, wired once by the pipeline
/// orchestrator and shared by every phase executor and the saga coordinator.
#[derive(Clone)]
pub struct CollaboratorBundle {
    pub world_context: std::sync::Arc<dyn CollaboratorContext>,
    pub interaction_context: std::sync::Arc<dyn CollaboratorContext>,
    pub event_context: std::sync::Arc<dyn CollaboratorContext>,
    pub ai_gateway: std::sync::Arc<dyn CollaboratorContext>,
    pub agent_context: std::sync::Arc<dyn CollaboratorContext>,
    pub narrative_context: std::sync::Arc<dyn CollaboratorContext>,
}

impl CollaboratorBundle {
    #[must_use]
    pub fn for_target(&self, target: CollaboratorTarget) -> std::sync::Arc<dyn CollaboratorContext> {
        match target {
            CollaboratorTarget::WorldContext => self.world_context.clone(),
            CollaboratorTarget::InteractionContext => self.interaction_context.clone(),
            CollaboratorTarget::EventContext => self.event_context.clone(),
            CollaboratorTarget::AiGateway => self.ai_gateway.clone(),
            CollaboratorTarget::AgentContext => self.agent_context.clone(),
            CollaboratorTarget::NarrativeContext => self.narrative_context.clone(),
        }
    }
}
