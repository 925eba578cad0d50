//! Observability: the Prometheus metrics registry and the tracing/sampling
//! conventions shared across the domain, services, and HTTP layers.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::Metrics;
