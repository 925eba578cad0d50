//! HTTP-backed AI gateway collaborator.
//!
//! Talks to a single configured AI completion endpoint over `reqwest`. The
//! wire format is intentionally generic (`prompt`/`model`/`max_tokens`/
//! `temperature` in, `completion`/token counts out) since the phases never
//! see a network response directly — only the [`CollaboratorResponse`] this
//! gateway produces from it.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::error::DomainError;
use crate::domain::models::metadata::MetadataValue;
use crate::domain::ports::collaborator::{CollaboratorContext, CollaboratorRequest, CollaboratorResponse};
use crate::metadata;

#[derive(Debug, Serialize)]
struct CompletionRequest {
    operation: String,
    prompt: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    completion: String,
    prompt_tokens: u64,
    completion_tokens: u64,
    cost: f64,
}

/// Collaborator that forwards AI-gateway calls to a real HTTP endpoint.
pub struct ReqwestAiGateway {
    client: Client,
    endpoint: String,
}

impl ReqwestAiGateway {
    /// Build a gateway pointed at `endpoint`, with a request timeout.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|err| DomainError::Internal(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn field_str(request: &CollaboratorRequest, key: &str, default: &str) -> String {
        match request.parameters.get(key) {
            Some(MetadataValue::String(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    fn field_f64(request: &CollaboratorRequest, key: &str, default: f64) -> f64 {
        match request.parameters.get(key) {
            Some(MetadataValue::Number(n)) => *n,
            _ => default,
        }
    }
}

#[async_trait]
impl CollaboratorContext for ReqwestAiGateway {
    async fn call(&self, request: CollaboratorRequest) -> Result<CollaboratorResponse, DomainError> {
        let started = Instant::now();
        let body = CompletionRequest {
            operation: request.operation.clone(),
            prompt: Self::field_str(&request, "prompt", ""),
            model: Self::field_str(&request, "model", "default"),
            max_tokens: Self::field_f64(&request, "max_tokens", 500.0) as u32,
            temperature: Self::field_f64(&request, "temperature", 0.7),
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, endpoint = %self.endpoint, "AI gateway request failed");
                return Ok(CollaboratorResponse::failure(err.to_string(), latency_ms));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            return Ok(CollaboratorResponse::failure(
                format!("AI gateway returned status {status}"),
                latency_ms,
            ));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|err| DomainError::CollaboratorFailed {
                target: "ai_gateway".into(),
                operation: request.operation.clone(),
                reason: format!("failed to parse response: {err}"),
            })?;

        Ok(CollaboratorResponse::success(
            metadata! {
                "completion" => parsed.completion.as_str(),
                "prompt_tokens" => parsed.prompt_tokens as f64,
                "completion_tokens" => parsed.completion_tokens as f64,
                "cost" => parsed.cost,
            },
            latency_ms,
        ))
    }
}
