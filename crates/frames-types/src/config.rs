use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{attendance::AttendanceEventType, capture::ScheduleContext};
use crate::{FramesError, Result};

/// Slowest cadence the recognition backend is sized for.
pub const MIN_TICK_INTERVAL_MS: u64 = 1_000;
/// One day.
pub const MAX_COOLDOWN_MS: u64 = 86_400_000;
pub const MAX_BANNER_MS: u64 = 60_000;
pub const MAX_LEDGER_RETENTION_FACTOR: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    #[default]
    Mock,
    Command,
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub source: CameraSource,
    /// Program that writes one encoded frame to stdout (command source).
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Folder of still images replayed in order (directory source).
    pub directory: Option<String>,
    /// Synthetic frame size (mock source).
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: CameraSource::Mock,
            command: None,
            args: Vec::new(),
            directory: None,
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub jpeg_quality: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { jpeg_quality: 80 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub base_url: String,
    pub record_path: String,
    pub health_path: String,
    pub request_timeout_ms: u64,
    pub event_type: AttendanceEventType,
    /// Send `event_type` and `timestamp` alongside the capture.
    pub kiosk_fields: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            record_path: "/api/attendance/record".into(),
            health_path: "/health".into(),
            request_timeout_ms: 5_000,
            event_type: AttendanceEventType::AttendanceIn,
            kiosk_fields: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub tick_interval_ms: u64,
    pub cooldown_ms: u64,
    pub banner_ms: u64,
    /// Entries kept in the on-screen record list; 0 keeps everything.
    pub max_recorded: usize,
    /// Ledger entries older than this many cooldown windows are dropped.
    pub ledger_retention_factor: u32,
    pub schedule: Option<ScheduleContext>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: MIN_TICK_INTERVAL_MS,
            cooldown_ms: 10_000,
            banner_ms: 3_000,
            max_recorded: 200,
            ledger_retention_factor: 6,
            schedule: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    pub telemetry_dir: String,
    pub export_session: bool,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            telemetry_dir: "telemetry".into(),
            export_session: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FramesConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub kiosk: KioskConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub ops: OpsConfig,
}

impl FramesConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            FramesError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            FramesError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.kiosk.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(FramesError::Configuration(format!(
                "kiosk.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )));
        }
        if !(1..=MAX_COOLDOWN_MS).contains(&self.kiosk.cooldown_ms) {
            return Err(FramesError::Configuration(format!(
                "kiosk.cooldown_ms must be between 1 and {MAX_COOLDOWN_MS}"
            )));
        }
        if !(1..=MAX_BANNER_MS).contains(&self.kiosk.banner_ms) {
            return Err(FramesError::Configuration(format!(
                "kiosk.banner_ms must be between 1 and {MAX_BANNER_MS}"
            )));
        }
        if !(1..=MAX_LEDGER_RETENTION_FACTOR).contains(&self.kiosk.ledger_retention_factor) {
            return Err(FramesError::Configuration(format!(
                "kiosk.ledger_retention_factor must be between 1 and {MAX_LEDGER_RETENTION_FACTOR}"
            )));
        }
        if !(1..=100).contains(&self.sampler.jpeg_quality) {
            return Err(FramesError::Configuration(
                "sampler.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        let url = self.recognition.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FramesError::Configuration(
                "recognition.base_url must start with http:// or https://".into(),
            ));
        }
        if self.recognition.request_timeout_ms == 0 {
            return Err(FramesError::Configuration(
                "recognition.request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.highlight.enabled && self.highlight.interval_ms == 0 {
            return Err(FramesError::Configuration(
                "highlight.interval_ms must be greater than zero".into(),
            ));
        }
        match self.camera.source {
            CameraSource::Command if self.camera.command.is_none() => {
                return Err(FramesError::Configuration(
                    "camera.command is required for the command source".into(),
                ));
            }
            CameraSource::Directory if self.camera.directory.is_none() => {
                return Err(FramesError::Configuration(
                    "camera.directory is required for the directory source".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        let schedule = self
            .kiosk
            .schedule
            .as_ref()
            .map(|ctx| ctx.badge())
            .unwrap_or_else(|| "General Attendance".into());
        format!(
            "{} · {:?} camera · every {}ms → {}",
            schedule, self.camera.source, self.kiosk.tick_interval_ms, self.recognition.base_url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_frames_config_from_file() {
        let temp_path = std::env::temp_dir().join("frames-config-test.toml");
        let mut config = FramesConfig::default();
        config.camera.source = CameraSource::Command;
        config.camera.command = Some("ffmpeg".into());
        config.camera.args = vec!["-f".into(), "v4l2".into()];
        config.recognition.base_url = "http://10.0.0.5:5001".into();
        config.recognition.event_type = AttendanceEventType::BreakIn;
        config.kiosk.tick_interval_ms = 2_000;
        config.kiosk.schedule = Some(ScheduleContext {
            schedule_id: "12".into(),
            class_name: Some("Operating Systems".into()),
            class_code: None,
        });

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = FramesConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.camera.source, CameraSource::Command);
        assert_eq!(loaded.kiosk.tick_interval_ms, 2_000);
        assert_eq!(loaded.recognition.event_type, AttendanceEventType::BreakIn);
        assert_eq!(loaded.kiosk.schedule, config.kiosk.schedule);
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn partial_file_falls_back_to_section_defaults() {
        let loaded: FramesConfig = toml::from_str(
            r#"
            [recognition]
            base_url = "http://kiosk-api:5001"

            [kiosk]
            tick_interval_ms = 2000
            "#,
        )
        .expect("parse partial config");
        assert_eq!(loaded.recognition.record_path, "/api/attendance/record");
        assert_eq!(loaded.kiosk.cooldown_ms, 10_000);
        assert_eq!(loaded.kiosk.banner_ms, 3_000);
        assert_eq!(loaded.sampler.jpeg_quality, 80);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = FramesConfig::default();
        assert!(config.validate().is_ok());

        config.kiosk.tick_interval_ms = 500;
        assert!(config.validate().is_err());
        config.kiosk.tick_interval_ms = 1_000;
        config.kiosk.cooldown_ms = 0;
        assert!(config.validate().is_err());
        config.kiosk.cooldown_ms = u64::MAX;
        assert!(config.validate().is_err());
        config.kiosk.cooldown_ms = 10_000;
        config.kiosk.ledger_retention_factor = u32::MAX;
        assert!(config.validate().is_err());
        config.kiosk.ledger_retention_factor = 6;
        config.kiosk.banner_ms = 120_000;
        assert!(config.validate().is_err());
        config.kiosk.banner_ms = 3_000;
        config.sampler.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.sampler.jpeg_quality = 80;
        config.recognition.base_url = "localhost:5000".into();
        assert!(config.validate().is_err());
        config.recognition.base_url = "http://localhost:5000".into();
        config.camera.source = CameraSource::Directory;
        assert!(config.validate().is_err());
        config.camera.directory = Some("samples".into());
        config.highlight.enabled = true;
        config.highlight.interval_ms = 0;
        assert!(config.validate().is_err());
        config.highlight.interval_ms = 100;
        assert!(config.validate().is_ok());
    }
}
