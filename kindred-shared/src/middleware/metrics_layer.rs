use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Buckets for every `*_duration_seconds` histogram. Image work can take up to the ingest timeout.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0];

/// Records `http_requests_total` and `http_request_duration_seconds` per route template.
pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = route_label(matched_path.as_ref().map(MatchedPath::as_str));

    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("route", route),
        ("status", response.status().as_u16().to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());

    response
}

/// Route template for labels. Wildcard tails collapse onto their prefix so
/// every served file shares one series.
fn route_label(matched: Option<&str>) -> String {
    match matched {
        Some(path) => match path.find("/*") {
            Some(idx) => path[..idx].to_string(),
            None => path.to_string(),
        },
        None => "unmatched".to_string(),
    }
}

fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_duration_seconds".into()), DURATION_BUCKETS)
}

/// Install the global Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = prometheus_builder()?.install_recorder()?;

    describe_counter!("http_requests_total", "HTTP requests by method, route and status");
    describe_histogram!("http_request_duration_seconds", Unit::Seconds, "HTTP request latency");
    describe_counter!("images_normalized_total", "Photo uploads by normalization outcome");
    describe_histogram!("image_normalize_duration_seconds", Unit::Seconds, "Time spent normalizing one photo");
    describe_counter!("likes_recorded_total", "Like requests, split by whether a new edge was created");

    Ok(handle)
}
