use std::path::{Path, PathBuf};

use async_trait::async_trait;
use frames_types::{capture::VideoFrame, config::CameraConfig, Result};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{camera_error, command::decode_frame, Camera, CameraMetrics, CameraStream};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays still images from a folder in name order, looping forever.
pub struct DirectoryCamera {
    dir: PathBuf,
}

impl DirectoryCamera {
    pub fn new(config: &CameraConfig) -> Result<Self> {
        let dir = config
            .directory
            .as_ref()
            .map(PathBuf::from)
            .ok_or_else(|| camera_error("camera.directory is not configured"))?;
        Ok(Self { dir })
    }

    pub fn from_path(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl Camera for DirectoryCamera {
    type Stream = DirectoryStream;

    async fn open(&mut self) -> Result<DirectoryStream> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|err| {
            camera_error(format!("unable to read frame directory {:?}: {err}", self.dir))
        })?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| camera_error(format!("directory scan failed: {err}")))?
        {
            let path = entry.path();
            if is_image(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(camera_error(format!(
                "frame directory {:?} contains no images",
                self.dir
            )));
        }
        files.sort();
        info!("Replaying {} frames from {:?}", files.len(), self.dir);
        Ok(DirectoryStream {
            files,
            cursor: 0,
            active: true,
            metrics: CameraMetrics::default(),
        })
    }
}

pub struct DirectoryStream {
    files: Vec<PathBuf>,
    cursor: usize,
    active: bool,
    metrics: CameraMetrics,
}

#[async_trait]
impl CameraStream for DirectoryStream {
    async fn grab(&mut self) -> Result<Option<VideoFrame>> {
        if !self.active {
            return Ok(None);
        }
        let start = Instant::now();
        let path = &self.files[self.cursor % self.files.len()];
        self.cursor = (self.cursor + 1) % self.files.len();

        let decoded = match tokio::fs::read(path).await {
            Ok(raw) => decode_frame(&raw),
            Err(err) => Err(camera_error(format!("unable to read {:?}: {err}", path))),
        };
        match decoded {
            Ok(frame) => {
                self.metrics.frames_grabbed += 1;
                self.metrics.last_grab_ms = Some(start.elapsed().as_millis() as u64);
                Ok(Some(frame))
            }
            Err(err) => {
                warn!("Skipping unreadable frame {:?}", path);
                self.metrics.failed_grabs += 1;
                Err(err)
            }
        }
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.clone()
    }
}

impl Drop for DirectoryStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("frames-dir-camera-{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[tokio::test]
    async fn replays_images_in_name_order() {
        let dir = scratch_dir("order");
        for (name, width) in [("b.png", 2u32), ("a.png", 1u32)] {
            let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_pixel(width, 1, Rgba([0, 0, 0, 255]));
            img.save(dir.join(name)).expect("save frame");
        }
        std::fs::write(dir.join("notes.txt"), "ignored").expect("write note");

        let mut camera = DirectoryCamera::from_path(&dir);
        let mut stream = camera.open().await.expect("open");
        let widths: Vec<u32> = {
            let mut out = Vec::new();
            for _ in 0..3 {
                out.push(stream.grab().await.expect("grab").expect("frame").width);
            }
            out
        };
        assert_eq!(widths, vec![1, 2, 1]);
        stream.stop();
        assert!(stream.grab().await.expect("grab").is_none());
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[tokio::test]
    async fn empty_directory_cannot_open() {
        let dir = scratch_dir("empty");
        let mut camera = DirectoryCamera::from_path(&dir);
        assert!(camera.open().await.is_err());
        std::fs::remove_dir_all(&dir).expect("cleanup");
    }
}
