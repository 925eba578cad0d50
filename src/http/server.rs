//! Axum router and handlers for the turn engine's HTTP control surface.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;
use tokio::sync::{RwLock, Semaphore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::error::DomainError;
use crate::domain::models::turn_configuration::TurnConfiguration;
use crate::domain::models::turn_id::TurnId;
use crate::domain::ports::collaborator::CollaboratorBundle;
use crate::http::dto::{
    BusinessKpiResponse, ErrorEnvelope, HealthResponse, TurnCleanupResponse, TurnExecutionRequest,
    TurnExecutionResponse, TurnStatusResponse,
};
use crate::http::middleware::track_metrics;
use crate::infrastructure::config::HttpConfig;
use crate::observability::Metrics;
use crate::services::{run_turn_with_id, TurnRegistry};

const MAX_PARTICIPANTS: usize = 10;
const KPI_WINDOW: Duration = Duration::from_secs(3600);

/// A single finished turn, kept around for the business-KPI rollup.
#[derive(Clone)]
struct CompletionRecord {
    completed_at: DateTime<Utc>,
    duration_seconds: f64,
    cost_dollars: f64,
    success: bool,
}

/// Shared state handed to every handler.
pub struct AppState {
    pub registry: Arc<TurnRegistry>,
    pub collaborators: CollaboratorBundle,
    pub metrics: Arc<Metrics>,
    pub turn_semaphore: Arc<Semaphore>,
    pub default_configuration: TurnConfiguration,
    completions: RwLock<VecDeque<CompletionRecord>>,
}

impl AppState {
    #[must_use]
    pub fn new(
        registry: Arc<TurnRegistry>,
        collaborators: CollaboratorBundle,
        metrics: Arc<Metrics>,
        http_config: &HttpConfig,
        default_configuration: TurnConfiguration,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            collaborators,
            metrics,
            turn_semaphore: Arc::new(Semaphore::new(http_config.max_concurrent_turns)),
            default_configuration,
            completions: RwLock::new(VecDeque::new()),
        })
    }

    async fn record_completion(&self, record: CompletionRecord) {
        let mut completions = self.completions.write().await;
        completions.push_back(record);
        let cutoff = Utc::now() - chrono::Duration::from_std(KPI_WINDOW).unwrap_or_else(|_| chrono::Duration::zero());
        while completions.front().is_some_and(|c| c.completed_at < cutoff) {
            completions.pop_front();
        }
    }
}

/// Build the full router: routes, CORS, tracing, and metrics middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let metrics = state.metrics.clone();
    Router::new()
        .route("/v1/turns:run", post(run_turn_handler))
        .route("/v1/turns/{turn_id}/status", get(turn_status_handler))
        .route("/v1/turns", get(list_turns_handler))
        .route("/v1/turns/{turn_id}", delete(cleanup_turn_handler))
        .route("/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/metrics/business-kpis", get(business_kpis_handler))
        .layer(axum::middleware::from_fn_with_state(metrics, track_metrics))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve forever (or until `shutdown` resolves).
pub async fn serve(
    state: Arc<AppState>,
    bind_address: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080)));
    let router = build_router(state);
    info!(%addr, "turn engine HTTP server listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await
}

fn error_response(status: StatusCode, envelope: ErrorEnvelope) -> Response {
    (status, Json(envelope)).into_response()
}

fn domain_error_response(err: DomainError) -> Response {
    let status = match err {
        DomainError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        DomainError::TurnNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Timeout { .. } | DomainError::CollaboratorFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, ErrorEnvelope::single(err.to_string(), err.error_type().to_string()))
}

/// Validate the request body and build a `TurnConfiguration` plus an
/// optional caller-supplied turn id.
fn build_configuration(req: &TurnExecutionRequest) -> Result<(TurnConfiguration, Option<TurnId>), Response> {
    if req.participants.is_empty() || req.participants.len() > MAX_PARTICIPANTS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            ErrorEnvelope::single(
                format!("participants must contain 1..{MAX_PARTICIPANTS} entries"),
                "validation_error".to_string(),
            ),
        ));
    }
    if req.participants.iter().any(|p| p.trim().is_empty()) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            ErrorEnvelope::single("participants must not be blank", "validation_error"),
        ));
    }
    let unique: std::collections::HashSet<&String> = req.participants.iter().collect();
    if unique.len() != req.participants.len() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            ErrorEnvelope::single("participants must be unique", "validation_error"),
        ));
    }

    let turn_id = match &req.turn_id {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(uuid) => match TurnId::new(uuid, None, None, None) {
                Ok(id) => Some(id),
                Err(err) => return Err(domain_error_response(err)),
            },
            Err(_) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorEnvelope::single(format!("turn_id '{raw}' is not a valid UUID"), "validation_error"),
                ))
            }
        },
        None => None,
    };

    let mut configuration = req.configuration.clone().unwrap_or_default();
    configuration.participants = req.participants.clone();

    let violations = configuration.validate_constraints();
    if !violations.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            ErrorEnvelope::many(violations, "validation_error"),
        ));
    }

    Ok((configuration, turn_id))
}

async fn run_turn_handler(State(state): State<Arc<AppState>>, Json(req): Json<TurnExecutionRequest>) -> Response {
    let (configuration, turn_id) = match build_configuration(&req) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let Ok(permit) = state.turn_semaphore.clone().try_acquire_owned() else {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            ErrorEnvelope::single("too many concurrent turns in flight", "capacity_exceeded"),
        );
    };

    if req.async_execution {
        let placeholder = match crate::domain::models::turn::Turn::create_with_id(
            configuration.clone(),
            turn_id.clone().unwrap_or_else(TurnId::generate),
        ) {
            Ok(turn) => turn,
            Err(err) => return domain_error_response(err),
        };
        let response = TurnExecutionResponse::accepted(&placeholder);
        let async_turn_id = placeholder.turn_id.clone();
        state.registry.insert(placeholder).await;

        let state = state.clone();
        tokio::spawn(async move {
            let _permit = permit;
            run_and_record(&state, configuration, Some(async_turn_id), true).await;
        });

        return (StatusCode::OK, Json(response)).into_response();
    }

    let result = run_and_record(&state, configuration, turn_id, false).await;
    drop(permit);
    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(response) => response,
    }
}

async fn run_and_record(
    state: &AppState,
    configuration: TurnConfiguration,
    turn_id: Option<TurnId>,
    background: bool,
) -> Result<TurnExecutionResponse, Response> {
    state.metrics.turn_started();
    let participant_count = configuration.participants.len();
    let ai_enabled = configuration.ai_integration_enabled;
    let outcome = run_turn_with_id(configuration, turn_id, &state.collaborators).await;
    state.metrics.turn_finished();

    match outcome {
        Ok((turn, result)) => {
            state.registry.insert(turn.clone()).await;
            let duration_seconds = result.total_execution_time_ms as f64 / 1000.0;
            let status_label = if result.overall_success { "success" } else { "error" };
            state
                .metrics
                .record_turn_completed(status_label, participant_count, ai_enabled, duration_seconds);
            let total_cost = result.total_ai_cost();
            state
                .record_completion(CompletionRecord {
                    completed_at: Utc::now(),
                    duration_seconds,
                    cost_dollars: total_cost.to_string().parse().unwrap_or(0.0),
                    success: result.overall_success,
                })
                .await;
            let response = TurnExecutionResponse::from_completed(&turn, &result);
            if background {
                info!(turn_id = %turn.turn_id, success = result.overall_success, "background turn finished");
            }
            Ok(response)
        }
        Err(err) => {
            state.metrics.record_error(err.error_type());
            if background {
                error!(error = %err, "background turn failed before producing a result");
                Ok(TurnExecutionResponse {
                    turn_id: Uuid::nil(),
                    success: false,
                    execution_time_ms: 0,
                    phases_completed: Vec::new(),
                    phase_results: std::collections::HashMap::new(),
                    compensation_actions: Vec::new(),
                    performance_metrics: std::collections::HashMap::new(),
                    error_details: Some(err.to_string()),
                    completed_at: Utc::now(),
                })
            } else {
                Err(domain_error_response(err))
            }
        }
    }
}

async fn turn_status_handler(State(state): State<Arc<AppState>>, Path(turn_id): Path<Uuid>) -> Response {
    match state.registry.get(turn_id).await {
        Ok(turn) => (StatusCode::OK, Json(TurnStatusResponse::from_turn(&turn))).into_response(),
        Err(DomainError::TurnNotFound(_)) => {
            (StatusCode::OK, Json(TurnStatusResponse::not_found(turn_id))).into_response()
        }
        Err(err) => domain_error_response(err),
    }
}

async fn list_turns_handler(State(state): State<Arc<AppState>>) -> Response {
    let turns = state.registry.list().await;
    let active: Vec<TurnStatusResponse> = turns
        .iter()
        .filter(|t| !t.state.is_terminal())
        .map(TurnStatusResponse::from_turn)
        .collect();
    (StatusCode::OK, Json(active)).into_response()
}

async fn cleanup_turn_handler(State(state): State<Arc<AppState>>, Path(turn_id): Path<Uuid>) -> Response {
    state.registry.remove(turn_id).await;
    (StatusCode::OK, Json(TurnCleanupResponse { status: "cleaned_up", turn_id })).into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let active_turns = state.registry.active_count().await;
    (
        StatusCode::OK,
        Json(HealthResponse { status: "healthy", active_turns, version: env!("CARGO_PKG_VERSION") }),
    )
        .into_response()
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "failed to encode metrics");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorEnvelope::single("failed to render metrics", "internal_error"),
        );
    }
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn business_kpis_handler(State(state): State<Arc<AppState>>) -> Response {
    let completions = state.completions.read().await;
    let window = completions.iter().cloned().collect::<Vec<_>>();
    drop(completions);

    if window.is_empty() {
        return (StatusCode::OK, Json(BusinessKpiResponse { window_seconds: KPI_WINDOW.as_secs(), ..Default::default() }))
            .into_response();
    }

    let total_turns = window.len();
    let successes = window.iter().filter(|c| c.success).count();
    let total_cost: f64 = window.iter().map(|c| c.cost_dollars).sum();
    let mut durations: Vec<f64> = window.iter().map(|c| c.duration_seconds).collect();
    durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let avg_duration = durations.iter().sum::<f64>() / total_turns as f64;
    let p95_index = ((total_turns as f64) * 0.95).ceil() as usize;
    let p95_duration = durations[p95_index.saturating_sub(1).min(total_turns - 1)];

    let response = BusinessKpiResponse {
        window_seconds: KPI_WINDOW.as_secs(),
        completions_observed: total_turns,
        llm_cost_per_request_avg: total_cost / total_turns as f64,
        turn_duration_seconds_avg: avg_duration,
        turn_duration_seconds_p95: p95_duration,
        success_rate: successes as f64 / total_turns as f64,
        total_turns,
        total_cost_dollars: total_cost,
    };
    (StatusCode::OK, Json(response)).into_response()
}
