//! Acceptance decisions for recognition results.

mod banner;
mod cooldown;
mod record_log;

use chrono::{DateTime, Duration, Utc};
use frames_types::{
    attendance::{RecognitionResult, RecordedEvent},
    config::{KioskConfig, MAX_BANNER_MS, MAX_COOLDOWN_MS, MAX_LEDGER_RETENTION_FACTOR},
};
use tracing::{debug, info};

pub use banner::{SuccessBanner, DEFAULT_BANNER_MS};
pub use cooldown::{CooldownLedger, DEFAULT_COOLDOWN_MS};
pub use record_log::RecordLog;

fn millis(ms: u64) -> Duration {
    i64::try_from(ms)
        .map(Duration::milliseconds)
        .unwrap_or_else(|_| Duration::milliseconds(i64::MAX))
}

/// Outcome of offering one recognition to the desk.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accepted { event: RecordedEvent, banner: String },
    Suppressed { remaining: Duration },
}

/// Cooldown ledger, record list and success banner for one capture session.
///
/// Owned by a single task; every mutation goes through `&mut self`.
#[derive(Debug, Clone)]
pub struct AttendanceDesk {
    ledger: CooldownLedger,
    log: RecordLog,
    banner: SuccessBanner,
    banner_ttl: Duration,
    retention: Duration,
}

impl Default for AttendanceDesk {
    fn default() -> Self {
        Self::from_config(&KioskConfig::default())
    }
}

impl AttendanceDesk {
    pub fn new(cooldown: Duration, banner_ttl: Duration, max_recorded: usize) -> Self {
        Self {
            ledger: CooldownLedger::new(cooldown),
            log: RecordLog::new(max_recorded),
            banner: SuccessBanner::default(),
            banner_ttl,
            retention: cooldown * 6,
        }
    }

    /// Out-of-range values are clamped to the limits `FramesConfig::validate` enforces.
    pub fn from_config(config: &KioskConfig) -> Self {
        let cooldown_ms = config.cooldown_ms.min(MAX_COOLDOWN_MS);
        let factor = config
            .ledger_retention_factor
            .clamp(1, MAX_LEDGER_RETENTION_FACTOR);
        let retention_ms = cooldown_ms.saturating_mul(u64::from(factor));
        let mut desk = Self::new(
            millis(cooldown_ms),
            millis(config.banner_ms.min(MAX_BANNER_MS)),
            config.max_recorded,
        );
        desk.retention = millis(retention_ms);
        desk
    }

    /// Cooldown check and ledger update as one step.
    pub fn on_recognized(&mut self, result: &RecognitionResult, now: DateTime<Utc>) -> Decision {
        if !self.ledger.should_accept(&result.subject_id, now) {
            let remaining = self
                .ledger
                .remaining(&result.subject_id, now)
                .unwrap_or_else(Duration::zero);
            debug!(
                "Suppressing {} ({}), {}ms of cooldown left",
                result.display_name,
                result.subject_id,
                remaining.num_milliseconds()
            );
            return Decision::Suppressed { remaining };
        }

        self.ledger.record_accepted(result.subject_id.clone(), now);
        let event = RecordedEvent::from_result(result, now);
        let banner = format!("✅ {} recorded at {}", event.display_name, event.time_label());
        self.banner.show(banner.clone(), now, self.banner_ttl);
        self.log.push(event.clone());
        info!(
            "Recorded {} (ID: {}) at {}",
            event.display_name,
            event.subject_id,
            event.time_label()
        );
        Decision::Accepted { event, banner }
    }

    pub fn expire_banner(&mut self, now: DateTime<Utc>) -> bool {
        self.banner.expire(now)
    }

    pub fn banner_deadline(&self) -> Option<DateTime<Utc>> {
        self.banner.deadline()
    }

    pub fn banner_text(&self, now: DateTime<Utc>) -> Option<&str> {
        self.banner.visible(now)
    }

    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let evicted = self.ledger.prune(now, self.retention);
        if evicted > 0 {
            debug!("Evicted {} cooldown entries", evicted);
        }
        evicted
    }

    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    pub fn records(&self) -> &RecordLog {
        &self.log
    }
}
