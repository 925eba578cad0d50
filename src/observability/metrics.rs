//! Prometheus metrics registry for the turn engine.
//!
//! One process-wide [`Metrics`] instance, built once at startup and shared
//! (via `Arc`) with the HTTP layer, the pipeline orchestrator, and the saga
//! coordinator. Every recording method takes plain values, not label maps,
//! so callers can't typo a label name past the compiler.

use prometheus::{
    CounterVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry,
};

use crate::domain::models::phase::PhaseType;

const TURN_DURATION_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 60.0, 120.0];
const PHASE_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0];
const CALL_DURATION_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
const COST_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

const PARTICIPANT_BUCKETS: [(usize, &str); 5] = [(1, "1"), (3, "2-3"), (5, "4-5"), (10, "6-10"), (usize::MAX, "10+")];

/// Bucket a raw participant count into the labeled ranges used by the
/// turn-duration and turn-count metrics.
#[must_use]
pub fn participant_bucket(count: usize) -> &'static str {
    PARTICIPANT_BUCKETS
        .iter()
        .find(|(max, _)| count <= *max)
        .map_or("10+", |(_, label)| *label)
}

pub struct Metrics {
    registry: Registry,

    turn_duration_seconds: HistogramVec,
    turns_total: IntCounterVec,
    turns_active: IntGauge,

    phase_duration_seconds: HistogramVec,
    phase_events_processed_total: IntCounterVec,

    ai_requests_total: IntCounterVec,
    ai_token_usage_total: IntCounterVec,
    ai_cost_total_dollars: CounterVec,
    llm_cost_per_request_dollars: Histogram,

    compensations_total: IntCounterVec,
    compensation_duration_seconds: Histogram,

    errors_total: IntCounterVec,
    error_recovery_attempts_total: IntCounter,

    cross_context_calls_total: IntCounterVec,
    cross_context_call_duration_seconds: HistogramVec,

    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_requests_in_progress: IntGauge,
}

impl Metrics {
    /// Build and register every metric series against a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let turn_duration_seconds = HistogramVec::new(
            HistogramOpts::new("turn_duration_seconds", "End-to-end turn execution time")
                .buckets(TURN_DURATION_BUCKETS.to_vec()),
            &["outcome", "participant_bucket", "ai_enabled"],
        )?;
        let turns_total = IntCounterVec::new(
            Opts::new("turns_total", "Turns processed, by final state"),
            &["status", "participants_range", "ai_enabled"],
        )?;
        let turns_active = IntGauge::new("turns_active", "Turns currently executing")?;

        let phase_duration_seconds = HistogramVec::new(
            HistogramOpts::new("phase_duration_seconds", "Per-phase execution time")
                .buckets(PHASE_DURATION_BUCKETS.to_vec()),
            &["phase", "outcome"],
        )?;
        let phase_events_processed_total = IntCounterVec::new(
            Opts::new("phase_events_processed_total", "Events processed per phase"),
            &["phase"],
        )?;

        let ai_requests_total = IntCounterVec::new(
            Opts::new("ai_requests_total", "AI gateway calls, by phase and outcome"),
            &["phase", "outcome"],
        )?;
        let ai_token_usage_total = IntCounterVec::new(
            Opts::new("ai_token_usage_total", "AI tokens consumed, by phase and kind"),
            &["phase", "kind"],
        )?;
        let ai_cost_total_dollars = CounterVec::new(
            Opts::new("ai_cost_total_dollars", "Cumulative AI spend in dollars, by phase"),
            &["phase"],
        )?;
        let llm_cost_per_request_dollars = Histogram::with_opts(
            HistogramOpts::new("llm_cost_per_request_dollars", "Per-request AI cost distribution")
                .buckets(COST_BUCKETS.to_vec()),
        )?;

        let compensations_total = IntCounterVec::new(
            Opts::new("compensations_total", "Compensation actions, by type and outcome"),
            &["compensation_type", "outcome"],
        )?;
        let compensation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("compensation_duration_seconds", "Time to run a compensation action")
                .buckets(PHASE_DURATION_BUCKETS.to_vec()),
        )?;

        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Domain errors, by error_type"),
            &["error_type"],
        )?;
        let error_recovery_attempts_total =
            IntCounter::new("error_recovery_attempts_total", "Retries attempted after a retryable error")?;

        let cross_context_calls_total = IntCounterVec::new(
            Opts::new("cross_context_calls_total", "Collaborator calls, by target and outcome"),
            &["target", "outcome"],
        )?;
        let cross_context_call_duration_seconds = HistogramVec::new(
            HistogramOpts::new("cross_context_call_duration_seconds", "Collaborator call latency")
                .buckets(CALL_DURATION_BUCKETS.to_vec()),
            &["target"],
        )?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests, by route and status"),
            &["route", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency")
                .buckets(CALL_DURATION_BUCKETS.to_vec()),
            &["route"],
        )?;
        let http_requests_in_progress = IntGauge::new("http_requests_in_progress", "In-flight HTTP requests")?;

        registry.register(Box::new(turn_duration_seconds.clone()))?;
        registry.register(Box::new(turns_total.clone()))?;
        registry.register(Box::new(turns_active.clone()))?;
        registry.register(Box::new(phase_duration_seconds.clone()))?;
        registry.register(Box::new(phase_events_processed_total.clone()))?;
        registry.register(Box::new(ai_requests_total.clone()))?;
        registry.register(Box::new(ai_token_usage_total.clone()))?;
        registry.register(Box::new(ai_cost_total_dollars.clone()))?;
        registry.register(Box::new(llm_cost_per_request_dollars.clone()))?;
        registry.register(Box::new(compensations_total.clone()))?;
        registry.register(Box::new(compensation_duration_seconds.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(error_recovery_attempts_total.clone()))?;
        registry.register(Box::new(cross_context_calls_total.clone()))?;
        registry.register(Box::new(cross_context_call_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_progress.clone()))?;

        Ok(Self {
            registry,
            turn_duration_seconds,
            turns_total,
            turns_active,
            phase_duration_seconds,
            phase_events_processed_total,
            ai_requests_total,
            ai_token_usage_total,
            ai_cost_total_dollars,
            llm_cost_per_request_dollars,
            compensations_total,
            compensation_duration_seconds,
            errors_total,
            error_recovery_attempts_total,
            cross_context_calls_total,
            cross_context_call_duration_seconds,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_progress,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// `status` is `"success"` or `"error"`, matching the vocabulary the
    /// business KPI endpoint and alerting rules query on.
    pub fn record_turn_completed(&self, status: &str, participant_count: usize, ai_enabled: bool, duration_seconds: f64) {
        let ai_enabled = if ai_enabled { "true" } else { "false" };
        let participants_range = participant_bucket(participant_count);
        self.turn_duration_seconds
            .with_label_values(&[status, participants_range, ai_enabled])
            .observe(duration_seconds);
        self.turns_total
            .with_label_values(&[status, participants_range, ai_enabled])
            .inc();
    }

    pub fn turn_started(&self) {
        self.turns_active.inc();
    }

    pub fn turn_finished(&self) {
        self.turns_active.dec();
    }

    pub fn record_phase(&self, phase: PhaseType, outcome: &str, duration_seconds: f64, events_processed: u64) {
        self.phase_duration_seconds
            .with_label_values(&[phase.as_str(), outcome])
            .observe(duration_seconds);
        self.phase_events_processed_total
            .with_label_values(&[phase.as_str()])
            .inc_by(events_processed);
    }

    pub fn record_ai_usage(&self, phase: PhaseType, outcome: &str, prompt_tokens: u64, completion_tokens: u64, cost: f64) {
        self.ai_requests_total.with_label_values(&[phase.as_str(), outcome]).inc();
        self.ai_token_usage_total
            .with_label_values(&[phase.as_str(), "prompt"])
            .inc_by(prompt_tokens);
        self.ai_token_usage_total
            .with_label_values(&[phase.as_str(), "completion"])
            .inc_by(completion_tokens);
        self.ai_cost_total_dollars.with_label_values(&[phase.as_str()]).inc_by(cost);
        self.llm_cost_per_request_dollars.observe(cost);
    }

    pub fn record_compensation(&self, compensation_type: &str, outcome: &str, duration_seconds: f64) {
        self.compensations_total
            .with_label_values(&[compensation_type, outcome])
            .inc();
        self.compensation_duration_seconds.observe(duration_seconds);
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total.with_label_values(&[error_type]).inc();
    }

    pub fn record_recovery_attempt(&self) {
        self.error_recovery_attempts_total.inc();
    }

    pub fn record_cross_context_call(&self, target: &str, outcome: &str, duration_seconds: f64) {
        self.cross_context_calls_total.with_label_values(&[target, outcome]).inc();
        self.cross_context_call_duration_seconds
            .with_label_values(&[target])
            .observe(duration_seconds);
    }

    /// Routes excluded from HTTP metrics: the metrics endpoint itself, the
    /// health probe, and the doc/favicon routes an API gateway probes.
    #[must_use]
    pub fn is_excluded_route(route: &str) -> bool {
        matches!(
            route,
            "/metrics" | "/health" | "/v1/health" | "/docs" | "/redoc" | "/openapi.json" | "/favicon.ico"
        )
    }

    pub fn record_http_request(&self, route: &str, status: u16, duration_seconds: f64) {
        if Self::is_excluded_route(route) {
            return;
        }
        self.http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[route])
            .observe(duration_seconds);
    }

    pub fn http_request_started(&self) {
        self.http_requests_in_progress.inc();
    }

    pub fn http_request_finished(&self) {
        self.http_requests_in_progress.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_buckets_match_expected_ranges() {
        assert_eq!(participant_bucket(1), "1");
        assert_eq!(participant_bucket(3), "2-3");
        assert_eq!(participant_bucket(5), "4-5");
        assert_eq!(participant_bucket(10), "6-10");
        assert_eq!(participant_bucket(11), "10+");
    }

    #[test]
    fn metrics_registry_builds_without_duplicate_registration() {
        let metrics = Metrics::new().unwrap();
        metrics.record_turn_completed("success", 2, true, 1.5);
        metrics.record_phase(PhaseType::WorldUpdate, "completed", 0.2, 1);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn turns_total_carries_status_and_participants_range_labels() {
        let metrics = Metrics::new().unwrap();
        metrics.record_turn_completed("success", 3, false, 2.0);
        let family = metrics
            .registry()
            .gather()
            .into_iter()
            .find(|f| f.name() == "turns_total")
            .expect("turns_total registered");
        let metric = &family.get_metric()[0];
        let label_names: Vec<&str> = metric.get_label().iter().map(|l| l.name()).collect();
        assert!(label_names.contains(&"status"));
        assert!(label_names.contains(&"participants_range"));
        assert!(label_names.contains(&"ai_enabled"));
    }
}
