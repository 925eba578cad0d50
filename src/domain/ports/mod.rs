//! Port traits the domain depends on and infrastructure implements.

pub mod collaborator;
pub mod phase_executor;

pub use collaborator::{CollaboratorBundle, CollaboratorContext, CollaboratorRequest, CollaboratorResponse, CollaboratorTarget};
pub use phase_executor::{PhaseExecutionContext, PhaseExecutor};
