//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "signpose_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "signpose_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "signpose_http_requests_in_flight";

    pub const CACHE_LOOKUPS_TOTAL: &str = "signpose_cache_lookups_total";
    pub const RENDERS_IN_FLIGHT: &str = "signpose_renders_in_flight";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];
    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(names::CACHE_LOOKUPS_TOTAL, "result" => result).increment(1);
}

pub fn render_started() {
    gauge!(names::RENDERS_IN_FLIGHT).increment(1.0);
}

pub fn render_finished() {
    gauge!(names::RENDERS_IN_FLIGHT).decrement(1.0);
}

/// Collapse per-artifact paths so labels stay bounded.
fn sanitize_path(path: &str) -> String {
    if path.starts_with("/output/") {
        "/output/:file".to_string()
    } else {
        path.to_string()
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
