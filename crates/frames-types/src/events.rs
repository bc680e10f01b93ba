use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    attendance::RecordedEvent,
    capture::HighlightBox,
    telemetry::{LatencySample, TickCounters},
};

/// High-level event bus message kinds moving through the kiosk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Lifecycle,
    Recorded,
    Banner,
    Highlight,
    Telemetry,
}

/// Immutable event envelope for the dashboard, logging and session export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KioskEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Lifecycle(LifecycleEvent),
    Recorded(RecordedEvent),
    Banner(BannerEvent),
    Highlight(HighlightEvent),
    Telemetry(TelemetryEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub phase: LifecyclePhase,
    pub details: Option<String>,
}

/// Loop driver states. `Fault` marks an initialization failure; the loop never starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Armed,
    Sampling,
    Stopped,
    Fault,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BannerEvent {
    Shown { text: String },
    Cleared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightEvent {
    pub region: Option<HighlightBox>,
    pub zoom: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub counters: TickCounters,
    pub latency: Option<LatencySample>,
}

impl KioskEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn lifecycle(phase: LifecyclePhase, details: Option<String>) -> Self {
        Self::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent { phase, details }),
        )
    }

    pub fn recorded(event: RecordedEvent) -> Self {
        Self::new(EventKind::Recorded, EventPayload::Recorded(event))
    }

    pub fn banner(event: BannerEvent) -> Self {
        Self::new(EventKind::Banner, EventPayload::Banner(event))
    }
}
