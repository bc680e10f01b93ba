use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the camera feed at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Raw RGBA pixel buffer, row-major.
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl VideoFrame {
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    /// A stream that is still negotiating reports zero natural dimensions.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Class/schedule the kiosk is capturing for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleContext {
    pub schedule_id: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub class_code: Option<String>,
}

impl ScheduleContext {
    pub fn new(schedule_id: impl Into<String>) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            class_name: None,
            class_code: None,
        }
    }

    pub fn badge(&self) -> String {
        match (&self.class_code, &self.class_name) {
            (Some(code), Some(name)) => format!("{code} · {name}"),
            (None, Some(name)) => name.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => format!("Schedule {}", self.schedule_id),
        }
    }
}

/// Cosmetic bounding box around the skin-toned region of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// JPEG data URL ready for submission, owned by exactly one request.
#[derive(Debug, Clone)]
pub struct EncodedSample {
    pub data_url: String,
    pub captured_at: DateTime<Utc>,
    pub schedule: Option<ScheduleContext>,
}
