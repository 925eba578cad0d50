//! Infrastructure layer
//!
//! Adapters for everything outside the domain: collaborator transports,
//! configuration loading, and logging/tracing setup.

pub mod collaborators;
pub mod config;
pub mod logging;
