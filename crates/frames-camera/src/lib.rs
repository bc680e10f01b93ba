//! Camera sources and the scoped stream contract.
//!
//! Opening a [`Camera`] acquires its device; the returned [`CameraStream`]
//! owns the tracks and stops them on [`CameraStream::stop`] or when dropped,
//! whichever comes first.

mod command;
mod directory;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use frames_types::{config::CameraConfig, capture::VideoFrame, FramesError, Result};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

pub use command::CommandCamera;
pub use directory::DirectoryCamera;

/// Aggregated capture counters.
#[derive(Debug, Default, Clone)]
pub struct CameraMetrics {
    pub frames_grabbed: u64,
    pub failed_grabs: u64,
    pub last_grab_ms: Option<u64>,
}

#[async_trait]
pub trait Camera: Send {
    type Stream: CameraStream;

    /// Acquire the device. Failure here is an initialization fault.
    async fn open(&mut self) -> Result<Self::Stream>;
}

#[async_trait]
pub trait CameraStream: Send + Sync {
    /// Current frame, or `None` when no track is active.
    async fn grab(&mut self) -> Result<Option<VideoFrame>>;
    fn stop(&mut self);
    fn is_active(&self) -> bool;
    fn metrics(&self) -> CameraMetrics;
}

/// Counts live tracks so callers can verify release after teardown.
#[derive(Debug, Clone, Default)]
pub struct TrackMonitor {
    live: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl TrackMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_tracks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn opened_tracks(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn track_started(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
    }

    fn track_stopped(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Synthetic camera used for demos and tests.
pub struct MockCamera {
    width: u32,
    height: u32,
    fill: [u8; 4],
    fail_open: bool,
    monitor: TrackMonitor,
}

impl MockCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self::with_dimensions(config.width, config.height)
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fill: [200, 140, 110, 255],
            fail_open: false,
            monitor: TrackMonitor::new(),
        }
    }

    /// Behave like a device whose permission was denied.
    pub fn denied() -> Self {
        Self {
            fail_open: true,
            ..Self::with_dimensions(0, 0)
        }
    }

    pub fn with_fill(mut self, fill: [u8; 4]) -> Self {
        self.fill = fill;
        self
    }

    pub fn monitor(&self) -> TrackMonitor {
        self.monitor.clone()
    }
}

#[async_trait]
impl Camera for MockCamera {
    type Stream = MockStream;

    async fn open(&mut self) -> Result<MockStream> {
        if self.fail_open {
            return Err(camera_error("camera access denied"));
        }
        info!(
            "Opening mock camera {}x{}",
            self.width, self.height
        );
        sleep(Duration::from_millis(5)).await;
        self.monitor.track_started();
        Ok(MockStream {
            width: self.width,
            height: self.height,
            fill: self.fill,
            active: true,
            monitor: self.monitor.clone(),
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        })
    }
}

pub struct MockStream {
    width: u32,
    height: u32,
    fill: [u8; 4],
    active: bool,
    monitor: TrackMonitor,
    metrics: Arc<Mutex<CameraMetrics>>,
}

#[async_trait]
impl CameraStream for MockStream {
    async fn grab(&mut self) -> Result<Option<VideoFrame>> {
        if !self.active {
            return Ok(None);
        }
        let start = Instant::now();
        let pixels = (self.width as usize) * (self.height as usize);
        let data = self.fill.repeat(pixels);
        let frame = VideoFrame::from_rgba(self.width, self.height, data);
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| camera_error("failed to lock metrics"))?;
        metrics.frames_grabbed += 1;
        metrics.last_grab_ms = Some(start.elapsed().as_millis() as u64);
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.monitor.track_stopped();
            debug!("Mock camera track stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generate an error aligned with camera semantics.
pub fn camera_error(message: impl Into<String>) -> FramesError {
    FramesError::Camera(message.into())
}
