use std::{fmt, str::FromStr};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const UNKNOWN_PERSON: &str = "Unknown Person";

/// Identity key assigned by the recognition backend (`user_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for SubjectId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The backend emits integer primary keys; string keys are accepted as-is.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(value) => Ok(Self::from(value)),
            Raw::Text(value) => Ok(Self(value.trim().to_string())),
        }
    }
}

/// Attendance event kinds understood by the recording endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceEventType {
    #[default]
    AttendanceIn,
    AttendanceOut,
    BreakIn,
    BreakOut,
}

impl AttendanceEventType {
    pub fn as_wire(self) -> &'static str {
        match self {
            AttendanceEventType::AttendanceIn => "attendance_in",
            AttendanceEventType::AttendanceOut => "attendance_out",
            AttendanceEventType::BreakIn => "break_in",
            AttendanceEventType::BreakOut => "break_out",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceEventType::AttendanceIn => "Check In",
            AttendanceEventType::AttendanceOut => "Check Out",
            AttendanceEventType::BreakIn => "Break Start",
            AttendanceEventType::BreakOut => "Break End",
        }
    }
}

impl FromStr for AttendanceEventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "attendance_in" => Ok(AttendanceEventType::AttendanceIn),
            "attendance_out" => Ok(AttendanceEventType::AttendanceOut),
            "break_in" => Ok(AttendanceEventType::BreakIn),
            "break_out" => Ok(AttendanceEventType::BreakOut),
            other => Err(format!("unknown attendance event type '{other}'")),
        }
    }
}

/// Identity match returned by the recognition backend for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub subject_id: SubjectId,
    pub display_name: String,
    pub message: Option<String>,
    pub event_type: Option<AttendanceEventType>,
    pub course_code: Option<String>,
    pub room_name: Option<String>,
    pub confidence_score: Option<f32>,
    pub server_timestamp: Option<String>,
}

impl RecognitionResult {
    pub fn new(subject_id: impl Into<SubjectId>, display_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_name: display_name.into(),
            message: None,
            event_type: None,
            course_code: None,
            room_name: None,
            confidence_score: None,
            server_timestamp: None,
        }
    }
}

/// Accepted recognition shown in the kiosk's record list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub subject_id: SubjectId,
    pub display_name: String,
    pub recorded_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl RecordedEvent {
    pub fn from_result(result: &RecognitionResult, recorded_at: DateTime<Utc>) -> Self {
        let display_name = if result.display_name.trim().is_empty() {
            UNKNOWN_PERSON.to_string()
        } else {
            result.display_name.clone()
        };
        Self {
            subject_id: result.subject_id.clone(),
            display_name,
            recorded_at,
            message: result.message.clone(),
        }
    }

    pub fn time_label(&self) -> String {
        self.recorded_at
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }
}
