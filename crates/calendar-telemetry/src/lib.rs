mod recorder;

pub use recorder::{
    install_recorder, EVENTS_STORED, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS,
};
pub use metrics_exporter_prometheus::PrometheusHandle;

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "calendar_store" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Optional file that receives a plain-text copy of every log line.
    pub log_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            log_file: None,
        }
    }
}

impl TelemetryConfig {
    fn filter_directive(&self) -> String {
        let mut filter_str = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter_str
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("log file path has no file name: {0}")]
    InvalidLogPath(PathBuf),

    #[error("failed to open log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Keeps the file writer flushing and holds the Prometheus handle.
pub struct TelemetryGuard {
    metrics: PrometheusHandle,
    _file_guard: Option<WorkerGuard>,
}

impl TelemetryGuard {
    /// Handle for rendering the `/metrics` endpoint.
    pub fn metrics(&self) -> PrometheusHandle {
        self.metrics.clone()
    }
}

/// Initialize logging and metrics. Call once at startup.
///
/// Logs go to stdout as JSON and, when `log_file` is set, to that file as
/// plain text through a non-blocking writer. The Prometheus recorder is
/// installed as the global `metrics` recorder.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_span_list(true);

    let (file_layer, file_guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(TelemetryGuard {
        metrics: install_recorder()?,
        _file_guard: file_guard,
    })
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, TelemetryError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TelemetryError::InvalidLogPath(path.to_owned()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    Ok(RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)?)
}
