//! Operational helpers: logging, telemetry, session export.

use std::{
    collections::VecDeque,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use chrono::Utc;
use frames_types::{
    config::OpsConfig,
    events::KioskEvent,
    telemetry::{LatencySample, SessionSummary, TickCounters},
    FramesError, Result,
};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const MAX_STORED_EVENTS: usize = 1_000;

/// Where developer-facing logs go.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stdout,
    /// Used while the dashboard owns the terminal.
    File(PathBuf),
}

pub fn init_tracing(config: &OpsConfig, target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| FramesError::Ops(format!("failed to create log filter: {err}")))?;

    let result = match target {
        LogTarget::Stdout => fmt().with_env_filter(filter).try_init(),
        LogTarget::File(path) => {
            let file = File::create(&path).map_err(|err| {
                FramesError::Ops(format!("failed to open log file {}: {err}", path.display()))
            })?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
    };
    result.map_err(|err| FramesError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

#[derive(Default)]
struct TelemetryState {
    events: VecDeque<KioskEvent>,
    counters: TickCounters,
    last_latency: Option<LatencySample>,
}

/// In-memory telemetry for the running session.
#[derive(Clone, Default)]
pub struct TelemetryStore {
    inner: Arc<Mutex<TelemetryState>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_event(&self, event: KioskEvent) -> Result<()> {
        let mut state = self.inner.lock().await;
        if state.events.len() == MAX_STORED_EVENTS {
            state.events.pop_front();
        }
        state.events.push_back(event);
        Ok(())
    }

    pub async fn record_tick(&self, counters: TickCounters, latency: Option<LatencySample>) {
        let mut state = self.inner.lock().await;
        state.counters = counters;
        if latency.is_some() {
            state.last_latency = latency;
        }
    }

    pub async fn counters(&self) -> TickCounters {
        self.inner.lock().await.counters.clone()
    }

    pub async fn last_latency(&self) -> Option<LatencySample> {
        self.inner.lock().await.last_latency.clone()
    }

    pub async fn snapshot_events(&self) -> Vec<KioskEvent> {
        self.inner.lock().await.events.iter().cloned().collect()
    }
}

pub fn ensure_telemetry_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| FramesError::Ops(format!("failed to create telemetry dir: {err}")))?;
    info!("Telemetry directory ready at {:?}", dir);
    Ok(dir)
}

/// Write the session summary as pretty JSON; returns the file path.
pub fn export_session(dir: &Path, summary: &SessionSummary) -> Result<PathBuf> {
    let name = format!(
        "session_{}.json",
        summary.stopped_at.format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(name);
    let doc = serde_json::to_string_pretty(summary).context("failed to serialize session")?;
    std::fs::write(&path, doc).with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        "Exported {} recorded attendees to {:?}",
        summary.recorded.len(),
        path
    );
    Ok(path)
}

pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("kiosk_{}.log", Utc::now().format("%Y%m%d_%H%M%S")))
}
