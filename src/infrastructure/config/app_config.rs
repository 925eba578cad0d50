//! Top-level application configuration for the turn engine server.

use serde::{Deserialize, Serialize};

use crate::domain::models::turn_configuration::TurnConfiguration;
use crate::infrastructure::logging::config::LogConfig;

/// Distributed-tracing exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TracingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_jaeger_endpoint")]
    pub jaeger_endpoint: String,
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    #[serde(default = "default_sampling_rate")]
    pub default_sampling_rate: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jaeger_endpoint: default_jaeger_endpoint(),
            otlp_endpoint: default_otlp_endpoint(),
            default_sampling_rate: default_sampling_rate(),
        }
    }
}

fn default_jaeger_endpoint() -> String {
    "http://localhost:14268/api/traces".to_string()
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_sampling_rate() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_max_concurrent_turns")]
    pub max_concurrent_turns: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_concurrent_turns: default_max_concurrent_turns(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_concurrent_turns() -> usize {
    50
}

/// The AI gateway collaborator's HTTP endpoint, when running against a real
/// backend instead of the in-memory mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AiGatewayConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for AiGatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Root configuration for the `turn-engine` binary, loaded by
/// [`super::loader::ConfigLoader`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub default_turn_configuration: TurnConfiguration,
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub ai_gateway: AiGatewayConfig,
    #[serde(default)]
    pub logging: LogConfig,
}
