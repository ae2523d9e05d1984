#[cfg(feature = "server")]
use axum::{http::StatusCode, response::IntoResponse};
#[cfg(feature = "server")]
use metrics::{counter, histogram};
#[cfg(feature = "server")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "server")]
use std::sync::OnceLock;

#[cfg(feature = "server")]
const OTHER_SUFFIX: &str = "other";

#[cfg(feature = "server")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[cfg(feature = "server")]
pub fn init_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Metrics recorder already installed");
                return;
            }

            counter!("whois_requests_total", "suffix" => OTHER_SUFFIX).absolute(0);
            counter!("whois_errors_total", "error_type" => "unknown").absolute(0);
            histogram!("whois_request_duration_seconds").record(0.0);
        }
        Err(e) => {
            tracing::warn!("Failed to install metrics recorder: {}", e);
        }
    }
}

/// Count one request under its resolved suffix; `None` is counted as `other`.
#[cfg(feature = "server")]
pub fn increment_requests(resolved_suffix: Option<&str>) {
    counter!("whois_requests_total", "suffix" => suffix_label(resolved_suffix)).increment(1);
}

#[cfg(feature = "server")]
pub fn increment_errors(error_type: &'static str) {
    counter!("whois_errors_total", "error_type" => error_type).increment(1);
}

#[cfg(feature = "server")]
pub fn increment_negotiated(media_type: &'static str) {
    counter!("whois_negotiated_total", "media_type" => media_type).increment(1);
}

#[cfg(feature = "server")]
pub fn increment_passthrough(status: u16) {
    counter!("whois_passthrough_total", "status" => status.to_string()).increment(1);
}

#[cfg(feature = "server")]
pub fn record_query_time(duration_ms: u64) {
    let duration_seconds = duration_ms as f64 / 1000.0;
    histogram!("whois_request_duration_seconds").record(duration_seconds);
}

#[cfg(feature = "server")]
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized".to_string()),
    }
}

// Callers pass only suffixes the registry has confirmed, which keeps the
// label set within the root zone. Everything else shares one bucket.
#[cfg(feature = "server")]
fn suffix_label(resolved_suffix: Option<&str>) -> String {
    resolved_suffix
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| OTHER_SUFFIX.to_string())
}
