use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use calendar_store::EventStore;
use calendar_telemetry::PrometheusHandle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::handlers::{self, AppState};
use crate::middleware::track_requests;

/// How often histogram samples are drained into their buckets.
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/create_event", post(handlers::create_event))
        .route("/update_event", post(handlers::update_event))
        .route("/delete_event", post(handlers::delete_event))
        .route("/events_for_day", get(handlers::events_for_day))
        .route("/events_for_week", get(handlers::events_for_week))
        .route("/events_for_month", get(handlers::events_for_month))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health));
    with_layers(routes, config).with_state(state)
}

/// Request timeout (408 on expiry) inside the logging and metrics middleware.
fn with_layers<S>(routes: Router<S>, config: &ServerConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.timeout,
        ))
        .layer(axum::middleware::from_fn(track_requests))
}

fn spawn_metrics_upkeep(metrics: PrometheusHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            metrics.run_upkeep();
        }
    })
}

/// Bind and start serving. Returns a handle to shut it down.
pub async fn start(
    config: &ServerConfig,
    store: EventStore,
    metrics: PrometheusHandle,
) -> Result<ServerHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;
    let upkeep = spawn_metrics_upkeep(metrics.clone());
    let router = build_router(AppState::new(store, metrics), config);

    tracing::info!(addr = %local_addr, timeout = ?config.timeout, "calendar server started");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
            })
            .await
    });

    Ok(ServerHandle {
        addr: local_addr,
        shutdown_tx,
        server,
        upkeep,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<Result<(), std::io::Error>>,
    upkeep: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) -> Result<(), std::io::Error> {
        let _ = self.shutdown_tx.send(());
        let result = self.server.await.map_err(std::io::Error::other)?;
        self.upkeep.abort();
        result
    }
}
