//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod compensation;
pub mod events;
pub mod metadata;
pub mod phase;
pub mod phase_result;
pub mod pipeline_result;
pub mod turn;
pub mod turn_configuration;
pub mod turn_id;

pub use compensation::{CompensationAction, CompensationStatus, CompensationType, Severity};
pub use events::{AuditEntry, EventKind};
pub use metadata::{Metadata, MetadataValue};
pub use phase::{PhaseState, PhaseStatus, PhaseType};
pub use phase_result::{AiOperation, AiUsage, PhaseResult};
pub use pipeline_result::PipelineResult;
pub use turn::{Turn, TurnState};
pub use turn_configuration::{NarrativeDepth, TurnConfiguration};
pub use turn_id::TurnId;
