//! Request/response shapes for the HTTP surface, kept separate from the
//! domain value objects they're built from so the wire format can drift
//! independently of the aggregate's internal representation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::compensation::CompensationAction;
use crate::domain::models::phase::PhaseType;
use crate::domain::models::phase_result::PhaseResult;
use crate::domain::models::pipeline_result::PipelineResult;
use crate::domain::models::turn::{Turn, TurnState};
use crate::domain::models::turn_configuration::TurnConfiguration;

/// `POST /v1/turns:run` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnExecutionRequest {
    pub participants: Vec<String>,
    #[serde(default)]
    pub configuration: Option<TurnConfiguration>,
    #[serde(default)]
    pub turn_id: Option<String>,
    #[serde(default)]
    pub async_execution: bool,
}

/// One phase's outcome, as surfaced over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseResultDto {
    pub phase: String,
    pub success: bool,
    pub execution_time_ms: u64,
    pub events_processed: u64,
    pub events_generated: u64,
    pub artifacts_created: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PhaseResultDto {
    fn from_result(phase: PhaseType, result: &PhaseResult, execution_time_ms: u64) -> Self {
        Self {
            phase: phase.as_str().to_string(),
            success: result.success,
            execution_time_ms,
            events_processed: result.events_processed,
            events_generated: result.events_generated,
            artifacts_created: result.artifacts_created.clone(),
            ai_cost: (!result.ai_usage.total_cost.is_zero()).then(|| result.ai_usage.total_cost.to_string()),
            error_message: result.error_details.clone(),
        }
    }
}

/// A compensation action summarized for the status/result payload.
#[derive(Debug, Clone, Serialize)]
pub struct CompensationActionDto {
    pub action_id: Uuid,
    pub compensation_type: String,
    pub target_phase: String,
    pub triggered_at: DateTime<Utc>,
    pub status: String,
}

impl From<&CompensationAction> for CompensationActionDto {
    fn from(action: &CompensationAction) -> Self {
        Self {
            action_id: action.action_id,
            compensation_type: action.compensation_type.display_name().to_string(),
            target_phase: action.target_phase.as_str().to_string(),
            triggered_at: action.triggered_at,
            status: format!("{:?}", action.status).to_lowercase(),
        }
    }
}

/// `POST /v1/turns:run` response body (both sync and async shape this).
#[derive(Debug, Clone, Serialize)]
pub struct TurnExecutionResponse {
    pub turn_id: Uuid,
    pub success: bool,
    pub execution_time_ms: u64,
    pub phases_completed: Vec<String>,
    pub phase_results: HashMap<String, PhaseResultDto>,
    pub compensation_actions: Vec<CompensationActionDto>,
    pub performance_metrics: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl TurnExecutionResponse {
    #[must_use]
    pub fn from_completed(turn: &Turn, result: &PipelineResult) -> Self {
        let phase_results = result
            .phase_results
            .iter()
            .map(|(phase, phase_result)| {
                let execution_time_ms = turn
                    .phase_statuses
                    .get(phase)
                    .and_then(|status| status.duration_ms)
                    .unwrap_or(0);
                (
                    phase.as_str().to_string(),
                    PhaseResultDto::from_result(*phase, phase_result, execution_time_ms),
                )
            })
            .collect();

        let mut phases_completed: Vec<String> =
            turn.completed_phases().iter().map(|p| p.as_str().to_string()).collect();
        phases_completed.sort();

        Self {
            turn_id: turn.turn_id.uuid(),
            success: result.overall_success,
            execution_time_ms: result.total_execution_time_ms,
            phases_completed,
            phase_results,
            compensation_actions: result.compensation_actions_taken.iter().map(CompensationActionDto::from).collect(),
            performance_metrics: HashMap::from([("completion_percentage".to_string(), f64::from(result.completion_percentage))]),
            error_details: (!result.overall_success).then(|| result.executive_summary.clone()),
            completed_at: turn.completed_at.unwrap_or_else(Utc::now),
        }
    }

    /// Shape returned immediately for `async_execution: true`: accepted, no
    /// phases run yet.
    #[must_use]
    pub fn accepted(turn: &Turn) -> Self {
        Self {
            turn_id: turn.turn_id.uuid(),
            success: true,
            execution_time_ms: 0,
            phases_completed: Vec::new(),
            phase_results: HashMap::new(),
            compensation_actions: Vec::new(),
            performance_metrics: HashMap::new(),
            error_details: None,
            completed_at: Utc::now(),
        }
    }
}

/// `GET /v1/turns/{id}/status` response.
#[derive(Debug, Clone, Serialize)]
pub struct TurnStatusResponse {
    pub turn_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
}

impl TurnStatusResponse {
    #[must_use]
    pub fn not_found(turn_id: Uuid) -> Self {
        Self {
            turn_id,
            status: "not_found".to_string(),
            progress: None,
            execution_time_ms: None,
            current_phase: None,
        }
    }

    #[must_use]
    pub fn from_turn(turn: &Turn) -> Self {
        let status = match turn.state {
            TurnState::Completed => "completed",
            TurnState::Failed | TurnState::Cancelled => "failed",
            _ => "running",
        };
        let current_phase = turn.current_phase.map(|p| p.as_str().to_string());

        Self {
            turn_id: turn.turn_id.uuid(),
            status: status.to_string(),
            progress: Some(turn.completion_percentage()),
            execution_time_ms: turn.execution_time().map(|d| d.num_milliseconds()),
            current_phase,
        }
    }
}

/// `DELETE /v1/turns/{id}` response.
#[derive(Debug, Clone, Serialize)]
pub struct TurnCleanupResponse {
    pub status: &'static str,
    pub turn_id: Uuid,
}

/// `GET /v1/health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_turns: usize,
    pub version: &'static str,
}

/// `GET /v1/metrics/business-kpis` response.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BusinessKpiResponse {
    pub window_seconds: u64,
    pub completions_observed: usize,
    pub llm_cost_per_request_avg: f64,
    pub turn_duration_seconds_avg: f64,
    pub turn_duration_seconds_p95: f64,
    pub success_rate: f64,
    pub total_turns: usize,
    pub total_cost_dollars: f64,
}

/// Error envelope for 4xx/5xx responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub detail: serde_json::Value,
    pub error_type: String,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn single(detail: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            detail: serde_json::Value::String(detail.into()),
            error_type: error_type.into(),
        }
    }

    #[must_use]
    pub fn many(details: Vec<String>, error_type: impl Into<String>) -> Self {
        Self {
            detail: serde_json::Value::Array(details.into_iter().map(serde_json::Value::String).collect()),
            error_type: error_type.into(),
        }
    }
}
