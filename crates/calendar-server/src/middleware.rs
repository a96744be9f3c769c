//! Per-request logging and metrics.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use calendar_telemetry::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use metrics::{counter, histogram};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Metric label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

/// Log request start/completion and record count and latency per route.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_PATH, |p| p.as_str())
        .to_owned();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => route.clone()).increment(1);

    let span = info_span!(
        "request",
        request_id = %Uuid::now_v7(),
        method = %method,
        path = %req.uri().path(),
    );
    let response = async {
        info!("started");
        let response = next.run(req).await;
        info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "completed"
        );
        response
    }
    .instrument(span)
    .await;

    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => route)
        .record(start.elapsed().as_secs_f64());
    response
}
