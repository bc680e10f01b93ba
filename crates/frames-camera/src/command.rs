use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use frames_types::{capture::VideoFrame, config::CameraConfig, Result};
use tokio::{process::Command, time::Instant};
use tracing::{debug, info};

use crate::{camera_error, Camera, CameraMetrics, CameraStream};

/// Captures one frame per grab by running an external program, e.g.
/// `ffmpeg -f v4l2 -i /dev/video0 -frames:v 1 -f image2pipe -vcodec png -`.
pub struct CommandCamera {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Result<Self> {
        let program = config
            .command
            .as_ref()
            .map(PathBuf::from)
            .ok_or_else(|| camera_error("camera.command is not configured"))?;
        Ok(Self {
            program,
            args: config.args.clone(),
        })
    }
}

#[async_trait]
impl Camera for CommandCamera {
    type Stream = CommandStream;

    async fn open(&mut self) -> Result<CommandStream> {
        info!("Probing capture command {:?}", self.program);
        let mut stream = CommandStream {
            program: self.program.clone(),
            args: self.args.clone(),
            active: true,
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        };
        // A device that cannot deliver a single frame is treated as unavailable.
        let first = stream.capture().await;
        match first {
            Ok(frame) => {
                info!(
                    "Capture command ready ({}x{})",
                    frame.width, frame.height
                );
                Ok(stream)
            }
            Err(err) => {
                stream.stop();
                Err(err)
            }
        }
    }
}

pub struct CommandStream {
    program: PathBuf,
    args: Vec<String>,
    active: bool,
    metrics: Arc<Mutex<CameraMetrics>>,
}

impl CommandStream {
    async fn run_capture(&self) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        let output = command.output().await.map_err(|err| {
            camera_error(format!(
                "capture command {:?} failed to start: {err}",
                self.program
            ))
        })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(camera_error(format!(
                "capture command {:?} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn capture(&mut self) -> Result<VideoFrame> {
        let start = Instant::now();
        let result = self.run_capture().await.and_then(|raw| decode_frame(&raw));
        if let Ok(mut guard) = self.metrics.lock() {
            match &result {
                Ok(_) => {
                    guard.frames_grabbed += 1;
                    guard.last_grab_ms = Some(start.elapsed().as_millis() as u64);
                }
                Err(_) => guard.failed_grabs += 1,
            }
        }
        result
    }
}

#[async_trait]
impl CameraStream for CommandStream {
    async fn grab(&mut self) -> Result<Option<VideoFrame>> {
        if !self.active {
            return Ok(None);
        }
        self.capture().await.map(Some)
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            debug!("Capture command {:?} released", self.program);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Drop for CommandStream {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) fn decode_frame(raw: &[u8]) -> Result<VideoFrame> {
    if raw.is_empty() {
        return Err(camera_error("capture produced no image bytes"));
    }
    let img = image::load_from_memory(raw)
        .map_err(|err| camera_error(format!("frame decoding failed: {err}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(VideoFrame::from_rgba(width, height, rgba.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use frames_types::config::CameraSource;
    use image::{ImageBuffer, ImageOutputFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn decode_png_into_rgba_frame() {
        let frame = decode_frame(&png_bytes(3, 2)).expect("decode");
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(decode_frame(&[]).is_err());
        assert!(decode_frame(b"not an image").is_err());
    }

    #[test]
    fn command_camera_requires_program() {
        let config = CameraConfig {
            source: CameraSource::Command,
            ..CameraConfig::default()
        };
        assert!(CommandCamera::new(&config).is_err());
    }

    #[tokio::test]
    async fn missing_program_is_an_initialization_fault() {
        let config = CameraConfig {
            source: CameraSource::Command,
            command: Some("/nonexistent/frames-capture-missing".into()),
            ..CameraConfig::default()
        };
        let mut camera = CommandCamera::new(&config).expect("camera");
        assert!(camera.open().await.is_err());
    }
}
