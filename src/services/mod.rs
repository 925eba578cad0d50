//! Application services: the phase executor framework, the five phase
//! implementations, saga compensation, the pipeline orchestrator, and the
//! in-memory turn registry.

pub mod phase_framework;
pub mod phases;
pub mod pipeline_orchestrator;
pub mod saga_coordinator;
pub mod turn_registry;

pub use pipeline_orchestrator::{run_turn, run_turn_with_id};
pub use turn_registry::TurnRegistry;
