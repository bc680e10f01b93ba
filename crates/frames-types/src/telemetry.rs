use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::RecordedEvent;

/// Timing of one capture-and-submit tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySample {
    pub capture_ms: u64,
    pub encode_ms: u64,
    pub submit_ms: u64,
    pub total_ms: u64,
    pub captured_at: DateTime<Utc>,
}

/// Running tallies of tick outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TickCounters {
    pub ticks: u64,
    /// No active track or zero-dimension frame.
    pub skipped: u64,
    pub submissions: u64,
    pub recognized: u64,
    pub accepted: u64,
    pub suppressed: u64,
    pub no_match: u64,
    pub rejected: u64,
    pub transport_errors: u64,
    pub timeouts: u64,
    pub sampler_errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// Newest first, as shown on the dashboard.
    pub recorded: Vec<RecordedEvent>,
    pub total_recorded: u64,
    /// Cooldown ledger size when the loop stopped.
    pub ledger_entries: usize,
    pub counters: TickCounters,
}
