//! Axum middleware: per-request Prometheus instrumentation.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::observability::Metrics;

/// Record `http_requests_total`/`http_request_duration_seconds`/
/// `http_requests_in_progress` for every request, keyed by the matched
/// route template rather than the raw path (so `/v1/turns/{id}/status`
/// doesn't explode into one label per turn id).
pub async fn track_metrics(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());

    metrics.http_request_started();
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed = started.elapsed().as_secs_f64();
    metrics.http_request_finished();
    metrics.record_http_request(&route, response.status().as_u16(), elapsed);

    response
}
