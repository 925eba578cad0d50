//! Turn engine - saga-backed five-phase turn orchestrator
//!
//! A pipeline server that advances one simulated "turn" through five ordered
//! phases (world update, subjective brief, interaction orchestration, event
//! integration, narrative integration), with saga-style compensation on
//! failure, Prometheus metrics, distributed tracing, and an HTTP control
//! surface.

pub mod cli;
pub mod domain;
pub mod http;
pub mod infrastructure;
pub mod observability;
pub mod services;

pub use domain::error::{DomainError, DomainResult};
