//! Prometheus metrics recorder and metric names.

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use tracing::info;

use crate::TelemetryError;

/// HTTP requests total (counter, labels: method, path).
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
/// HTTP request duration seconds (histogram, labels: method, path).
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
/// Events currently held by the store (gauge).
pub const EVENTS_STORED: &str = "calendar_events_stored";

/// Upper bounds of the request latency histogram buckets.
const LATENCY_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static INSTALLED: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

fn builder() -> Result<PrometheusBuilder, TelemetryError> {
    Ok(PrometheusBuilder::new().set_buckets(&LATENCY_BUCKETS)?)
}

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Only the first call installs; later calls return a handle to the same
/// recorder.
pub fn install_recorder() -> Result<PrometheusHandle, TelemetryError> {
    let mut installed = INSTALLED.lock();
    if let Some(handle) = installed.as_ref() {
        return Ok(handle.clone());
    }

    let handle = builder()?.install_recorder()?;
    describe_metrics();
    info!("prometheus metrics recorder installed");
    *installed = Some(handle.clone());
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Number of HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of HTTP requests"
    );
    describe_gauge!(EVENTS_STORED, "Number of events held in memory");
}
