mod ui;

use std::{
    env,
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
};

use anyhow::{Context, Result};
use clap::Parser;
use frames_camera::{Camera, CommandCamera, DirectoryCamera, MockCamera};
use frames_kiosk::KioskDriver;
use frames_network::{EventPublisher, HttpRecognitionClient, LocalBus};
use frames_ops::{
    ensure_telemetry_dir, export_session, init_tracing, log_file_path, LogTarget, TelemetryStore,
};
use frames_types::{
    attendance::AttendanceEventType,
    capture::ScheduleContext,
    config::{CameraSource, FramesConfig},
    events::{EventPayload, KioskEvent},
};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ui::{DashboardState, UiExit, UiMessage};

const DEFAULT_CONFIG_PATH: &str = "configs/kiosk.toml";

#[derive(Parser, Debug)]
#[command(name = "frames-kiosk", version, about = "Face recognition attendance kiosk")]
struct Args {
    /// TOML configuration file (falls back to FRAMES_CONFIG, then configs/kiosk.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Schedule the captures are recorded against.
    #[arg(long)]
    schedule_id: Option<String>,
    #[arg(long)]
    class_name: Option<String>,
    #[arg(long)]
    class_code: Option<String>,
    /// attendance_in, attendance_out, break_in or break_out.
    #[arg(long)]
    event_type: Option<AttendanceEventType>,
    /// Log events to stdout instead of drawing the dashboard.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut config, config_warning) = load_config(args.config.as_deref());
    apply_overrides(&mut config, &args);

    let telemetry_dir = ensure_telemetry_dir(&config.ops.telemetry_dir)?;
    let log_target = if args.headless {
        LogTarget::Stdout
    } else {
        LogTarget::File(log_file_path(&telemetry_dir))
    };
    init_tracing(&config.ops, log_target)?;
    if let Some(warning) = config_warning {
        warn!("{warning}");
    }
    info!("Starting FRAMES kiosk: {}", config.summary());

    match config.camera.source {
        CameraSource::Mock => {
            let camera = MockCamera::new(&config.camera);
            run(config, camera, args.headless, telemetry_dir).await
        }
        CameraSource::Command => {
            let camera = CommandCamera::new(&config.camera)?;
            run(config, camera, args.headless, telemetry_dir).await
        }
        CameraSource::Directory => {
            let camera = DirectoryCamera::new(&config.camera)?;
            run(config, camera, args.headless, telemetry_dir).await
        }
    }
}

async fn run<C>(config: FramesConfig, camera: C, headless: bool, telemetry_dir: PathBuf) -> Result<()>
where
    C: Camera,
    C::Stream: 'static,
{
    let client = HttpRecognitionClient::new(&config.recognition)?;
    let bus = Arc::new(LocalBus::new(256));
    let badge = config
        .kiosk
        .schedule
        .as_ref()
        .map(ScheduleContext::badge)
        .unwrap_or_else(|| "General Attendance".into());
    let badge = format!("{badge} · {}", config.recognition.event_type.label());
    let mut dashboard = (!headless).then(|| Dashboard::spawn(bus.as_ref(), badge));
    let logger = headless.then(|| spawn_event_logger(bus.as_ref()));

    let driver = KioskDriver::new(
        config.clone(),
        camera,
        client,
        Arc::clone(&bus),
        TelemetryStore::new(),
    );
    let handle = match driver.start().await {
        Ok(handle) => handle,
        Err(err) => {
            if let Some(dashboard) = dashboard {
                dashboard.close().await;
            }
            return Err(err).context("kiosk failed to start");
        }
    };

    let ui_finished = match dashboard.as_mut() {
        Some(dashboard) => tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                info!("Ctrl-C received, shutting down");
                false
            }
            exit = &mut dashboard.join => {
                info!("Dashboard closed ({exit:?}), shutting down");
                true
            }
        },
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
            false
        }
    };

    let summary = handle.stop().await?;
    match dashboard {
        Some(dashboard) if ui_finished => dashboard.forwarder.abort(),
        Some(dashboard) => dashboard.close().await,
        None => {}
    }
    if let Some(logger) = logger {
        logger.abort();
    }

    info!(
        "Session ended: {} recorded over {} ticks ({} no match, {} errors)",
        summary.total_recorded,
        summary.counters.ticks,
        summary.counters.no_match,
        summary.counters.rejected + summary.counters.transport_errors + summary.counters.timeouts
    );
    if config.ops.export_session {
        let path = export_session(&telemetry_dir, &summary)?;
        println!("Session saved to {}", path.display());
    }
    Ok(())
}

/// Terminal screen running on a blocking thread, fed from the event bus.
struct Dashboard {
    tx: mpsc::Sender<UiMessage>,
    forwarder: JoinHandle<()>,
    join: JoinHandle<Result<UiExit>>,
}

impl Dashboard {
    fn spawn(bus: &LocalBus, badge: String) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut events = bus.subscribe();
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if forward_tx.send(UiMessage::Event(event)).is_err() {
                    break;
                }
            }
        });
        let join = tokio::task::spawn_blocking(move || ui::run(rx, DashboardState::new(badge)));
        Self {
            tx,
            forwarder,
            join,
        }
    }

    async fn close(self) {
        self.forwarder.abort();
        let _ = self.tx.send(UiMessage::Shutdown);
        match self.join.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!("Dashboard error: {err}"),
            Err(err) => warn!("Dashboard task failed: {err}"),
        }
    }
}

fn spawn_event_logger(bus: &LocalBus) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            log_event(&event);
        }
    })
}

fn log_event(event: &KioskEvent) {
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => info!(
            "Lifecycle {:?} {}",
            lifecycle.phase,
            lifecycle.details.clone().unwrap_or_default()
        ),
        EventPayload::Recorded(recorded) => info!(
            "Attendance recorded: {} (ID: {}) at {}",
            recorded.display_name,
            recorded.subject_id,
            recorded.time_label()
        ),
        EventPayload::Banner(banner) => info!("Banner {:?}", banner),
        EventPayload::Highlight(highlight) => info!("Highlight {:?}", highlight.region),
        EventPayload::Telemetry(_) => {}
    }
}

fn load_config(explicit: Option<&Path>) -> (FramesConfig, Option<String>) {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("FRAMES_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    match FramesConfig::from_file(&path) {
        Ok(cfg) => match cfg.validate() {
            Ok(()) => (cfg, None),
            Err(err) => (
                FramesConfig::default(),
                Some(format!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                )),
            ),
        },
        Err(err) => (
            FramesConfig::default(),
            Some(format!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            )),
        ),
    }
}

fn apply_overrides(config: &mut FramesConfig, args: &Args) {
    if let Some(schedule_id) = &args.schedule_id {
        config.kiosk.schedule = Some(ScheduleContext::new(schedule_id.clone()));
    }
    if let Some(schedule) = config.kiosk.schedule.as_mut() {
        if let Some(name) = &args.class_name {
            schedule.class_name = Some(name.clone());
        }
        if let Some(code) = &args.class_code {
            schedule.class_code = Some(code.clone());
        }
    }
    if let Some(event_type) = args.event_type {
        config.recognition.event_type = event_type;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let (config, warning) = load_config(Some(Path::new("/nonexistent/frames.toml")));
        assert!(warning.is_some());
        assert_eq!(config.kiosk.tick_interval_ms, 1_000);
        assert_eq!(config.kiosk.cooldown_ms, 10_000);
    }

    #[test]
    fn flags_override_schedule_and_event_type() {
        let args = Args::parse_from([
            "frames-kiosk",
            "--schedule-id",
            "17",
            "--class-code",
            "CS201",
            "--event-type",
            "break_out",
        ]);
        let mut config = FramesConfig::default();
        apply_overrides(&mut config, &args);
        let schedule = config.kiosk.schedule.expect("schedule");
        assert_eq!(schedule.schedule_id, "17");
        assert_eq!(schedule.class_code.as_deref(), Some("CS201"));
        assert_eq!(config.recognition.event_type, AttendanceEventType::BreakOut);
    }
}
