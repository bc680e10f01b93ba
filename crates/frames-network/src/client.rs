use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use frames_types::{
    attendance::{AttendanceEventType, RecognitionResult, SubjectId, UNKNOWN_PERSON},
    capture::EncodedSample,
    config::RecognitionConfig,
    Result,
};
use reqwest::{multipart::Form, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::network_error;

const MAX_DETAIL_CHARS: usize = 200;

/// Error texts the record endpoint sends with a 400 when the frame holds no usable face.
const NO_FACE_DETAILS: [&str; 1] = ["Could not process face"];

/// How the backend answered one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Recognized(RecognitionResult),
    /// No known face in the sample. Expected on most ticks.
    NoMatch { status: u16, detail: String },
    /// The backend refused the request (validation or server fault).
    Rejected { status: u16, detail: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[async_trait]
pub trait RecognitionClient: Send + Sync {
    /// Transport faults are `Err`; every HTTP answer is an outcome.
    async fn submit(&self, sample: &EncodedSample) -> Result<SubmissionOutcome>;
    async fn health(&self) -> Result<BackendHealth>;
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    #[serde(default)]
    user_id: Option<SubjectId>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    course_code: Option<String>,
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    confidence_score: Option<f32>,
    #[serde(default)]
    timestamp: Option<String>,
}

impl RecordResponse {
    fn into_result(self) -> Option<RecognitionResult> {
        let subject_id = self.user_id.filter(|id| !id.as_str().is_empty())?;
        let display_name = self
            .user_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_PERSON.to_string());
        Some(RecognitionResult {
            subject_id,
            display_name,
            message: self.message,
            event_type: self.event_type.and_then(|raw| raw.parse().ok()),
            course_code: self.course_code,
            room_name: self.room_name,
            confidence_score: self.confidence_score,
            server_timestamp: self.timestamp,
        })
    }
}

/// Pull a human-readable reason out of an error body.
fn response_detail(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "No message".to_string()
    } else {
        trimmed.chars().take(MAX_DETAIL_CHARS).collect()
    }
}

/// Classify an HTTP answer from the record endpoint.
pub fn interpret_response(status: u16, body: &str) -> SubmissionOutcome {
    if (200..300).contains(&status) {
        let parsed = serde_json::from_str::<RecordResponse>(body)
            .ok()
            .and_then(RecordResponse::into_result);
        return match parsed {
            Some(result) => SubmissionOutcome::Recognized(result),
            None => SubmissionOutcome::NoMatch {
                status,
                detail: response_detail(body),
            },
        };
    }
    let detail = response_detail(body);
    let no_face =
        status == StatusCode::BAD_REQUEST.as_u16() && NO_FACE_DETAILS.contains(&detail.as_str());
    if no_face || status == StatusCode::NOT_FOUND.as_u16() {
        return SubmissionOutcome::NoMatch { status, detail };
    }
    SubmissionOutcome::Rejected { status, detail }
}

/// Multipart client for the attendance record endpoint.
#[derive(Clone)]
pub struct HttpRecognitionClient {
    http: Client,
    record_url: String,
    health_url: String,
    /// Set when the kiosk variant fields are sent.
    event_type: Option<AttendanceEventType>,
}

impl HttpRecognitionClient {
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| network_error(format!("failed to build HTTP client: {err}")))?;
        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            http,
            record_url: format!("{base}{}", config.record_path),
            health_url: format!("{base}{}", config.health_path),
            event_type: config.kiosk_fields.then_some(config.event_type),
        })
    }

    pub fn record_url(&self) -> &str {
        &self.record_url
    }

    fn build_form(&self, sample: &EncodedSample) -> Form {
        let mut form = Form::new().text("face_capture", sample.data_url.clone());
        if let Some(event_type) = self.event_type {
            form = form.text("event_type", event_type.as_wire()).text(
                "timestamp",
                sample
                    .captured_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            );
        }
        if let Some(schedule) = &sample.schedule {
            form = form.text("schedule_id", schedule.schedule_id.clone());
        }
        form
    }
}

#[async_trait]
impl RecognitionClient for HttpRecognitionClient {
    async fn submit(&self, sample: &EncodedSample) -> Result<SubmissionOutcome> {
        debug!("Sending face for recognition to {}", self.record_url);
        let response = self
            .http
            .post(&self.record_url)
            .multipart(self.build_form(sample))
            .send()
            .await
            .map_err(|err| network_error(format!("no response from backend: {err}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| network_error(format!("failed to read backend response: {err}")))?;
        Ok(interpret_response(status, &body))
    }

    async fn health(&self) -> Result<BackendHealth> {
        let response = self
            .http
            .get(&self.health_url)
            .send()
            .await
            .map_err(|err| network_error(format!("health check failed: {err}")))?;
        if !response.status().is_success() {
            return Err(network_error(format!(
                "health check returned {}",
                response.status()
            )));
        }
        response
            .json::<BackendHealth>()
            .await
            .map_err(|err| network_error(format!("malformed health response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use frames_types::{capture::ScheduleContext, FramesError};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn sample(schedule: Option<ScheduleContext>) -> EncodedSample {
        EncodedSample {
            data_url: "data:image/jpeg;base64,/9j/AA==".into(),
            captured_at: Utc::now(),
            schedule,
        }
    }

    #[test]
    fn success_with_identity_is_recognized() {
        let outcome = interpret_response(
            200,
            r#"{"message":"✅ Attendance recorded for Jane Doe","user_id":42,"user_name":"Jane Doe","event_type":"attendance_in","confidence_score":95.0}"#,
        );
        let SubmissionOutcome::Recognized(result) = outcome else {
            panic!("expected recognition, got {outcome:?}");
        };
        assert_eq!(result.subject_id, SubjectId::from(42_i64));
        assert_eq!(result.display_name, "Jane Doe");
        assert_eq!(result.event_type, Some(AttendanceEventType::AttendanceIn));
        assert_eq!(result.confidence_score, Some(95.0));
    }

    #[test]
    fn success_without_name_uses_placeholder() {
        let outcome = interpret_response(200, r#"{"user_id":"s-17"}"#);
        let SubmissionOutcome::Recognized(result) = outcome else {
            panic!("expected recognition");
        };
        assert_eq!(result.display_name, UNKNOWN_PERSON);
    }

    #[test]
    fn success_without_identity_is_no_match() {
        assert_eq!(
            interpret_response(200, r#"{"message":"No face detected"}"#),
            SubmissionOutcome::NoMatch {
                status: 200,
                detail: "No face detected".into()
            }
        );
    }

    #[test]
    fn not_found_is_no_match() {
        assert_eq!(
            interpret_response(404, r#"{"error":"Face not recognized. Please register first."}"#),
            SubmissionOutcome::NoMatch {
                status: 404,
                detail: "Face not recognized. Please register first.".into()
            }
        );
    }

    #[test]
    fn empty_frame_is_no_match() {
        assert_eq!(
            interpret_response(400, r#"{"error":"Could not process face"}"#),
            SubmissionOutcome::NoMatch {
                status: 400,
                detail: "Could not process face".into()
            }
        );
    }

    #[test]
    fn validation_and_server_errors_are_rejections() {
        assert_eq!(
            interpret_response(400, r#"{"error":"Missing face_capture"}"#),
            SubmissionOutcome::Rejected {
                status: 400,
                detail: "Missing face_capture".into()
            }
        );
        assert_eq!(
            interpret_response(500, ""),
            SubmissionOutcome::Rejected {
                status: 500,
                detail: "No message".into()
            }
        );
        let long_body = "x".repeat(1_000);
        let SubmissionOutcome::Rejected { detail, .. } = interpret_response(502, &long_body) else {
            panic!("expected rejection");
        };
        assert_eq!(detail.len(), MAX_DETAIL_CHARS);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let config = RecognitionConfig {
            base_url: format!("http://{addr}"),
            request_timeout_ms: 1_000,
            ..RecognitionConfig::default()
        };
        let client = HttpRecognitionClient::new(&config).expect("client");
        let err = client.submit(&sample(None)).await.unwrap_err();
        assert!(matches!(err, FramesError::Network(_)));
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.expect("read request");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn submit_posts_multipart_fields() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut stream).await;
            let body = r#"{"user_id":42,"user_name":"Jane Doe"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .await
                .expect("write response");
            request
        });

        let config = RecognitionConfig {
            base_url: format!("http://{addr}/"),
            ..RecognitionConfig::default()
        };
        let client = HttpRecognitionClient::new(&config).expect("client");
        let outcome = client
            .submit(&sample(Some(ScheduleContext::new("31"))))
            .await
            .expect("submit");
        assert!(matches!(outcome, SubmissionOutcome::Recognized(_)));

        let request = server.await.expect("server task");
        assert!(request.starts_with("POST /api/attendance/record "));
        assert!(request.contains("multipart/form-data"));
        for field in ["face_capture", "event_type", "timestamp", "schedule_id"] {
            assert!(
                request.contains(&format!("name=\"{field}\"")),
                "missing multipart field {field}"
            );
        }
        assert!(request.contains("attendance_in"));
        assert!(request.contains("data:image/jpeg;base64,/9j/AA=="));
    }

    #[test]
    fn kiosk_fields_can_be_disabled() {
        let config = RecognitionConfig {
            kiosk_fields: false,
            ..RecognitionConfig::default()
        };
        let client = HttpRecognitionClient::new(&config).expect("client");
        assert_eq!(client.event_type, None);
        assert_eq!(client.record_url(), "http://localhost:5000/api/attendance/record");
    }
}
