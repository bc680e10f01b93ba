//! Capture-and-submit loop coordinating camera, sampler, backend and desk.

mod clock;
mod worker;

use std::sync::Arc;

use frames_camera::Camera;
use frames_ledger::AttendanceDesk;
use frames_network::{EventPublisher, RecognitionClient};
use frames_ops::TelemetryStore;
use frames_types::{
    config::FramesConfig,
    events::{KioskEvent, LifecyclePhase},
    telemetry::{SessionSummary, TickCounters},
    FramesError, Result,
};
use frames_vision::FrameSampler;
use futures::stream::BoxStream;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use clock::KioskClock;

use worker::{LoopSettings, LoopWorker};

const MIN_TICK_TIMEOUT: Duration = Duration::from_secs(1);

/// Wires a camera and a recognition backend into the kiosk loop.
pub struct KioskDriver<C, R, P>
where
    C: Camera,
    R: RecognitionClient,
    P: EventPublisher,
{
    config: FramesConfig,
    camera: C,
    client: Arc<R>,
    publisher: Arc<P>,
    telemetry: TelemetryStore,
}

impl<C, R, P> KioskDriver<C, R, P>
where
    C: Camera,
    C::Stream: 'static,
    R: RecognitionClient + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(
        config: FramesConfig,
        camera: C,
        client: R,
        publisher: Arc<P>,
        telemetry: TelemetryStore,
    ) -> Self {
        Self {
            config,
            camera,
            client: Arc::new(client),
            publisher,
            telemetry,
        }
    }

    /// Open the camera and start ticking.
    ///
    /// A camera that cannot be opened is reported once as a `Fault` and the
    /// loop is never started.
    pub async fn start(mut self) -> Result<KioskHandle<P>> {
        let (state_tx, state_rx) = watch::channel(LifecyclePhase::Idle);
        self.publish(KioskEvent::lifecycle(LifecyclePhase::Idle, None))
            .await;

        let stream = match self.camera.open().await {
            Ok(stream) => stream,
            Err(err) => {
                error!("Camera unavailable: {err}");
                state_tx.send_replace(LifecyclePhase::Fault);
                self.publish(KioskEvent::lifecycle(
                    LifecyclePhase::Fault,
                    Some(format!("camera access failed: {err}")),
                ))
                .await;
                return Err(err);
            }
        };

        match self.client.health().await {
            Ok(health) => info!(
                "Recognition backend {}: {}",
                health.status,
                health.message.unwrap_or_default()
            ),
            Err(err) => warn!("Recognition backend health check failed: {err}"),
        }

        let kiosk = &self.config.kiosk;
        let tick_interval = Duration::from_millis(kiosk.tick_interval_ms);
        let settings = LoopSettings {
            tick_interval,
            tick_timeout: tick_timeout(&self.config),
            highlight_interval: self
                .config
                .highlight
                .enabled
                .then(|| Duration::from_millis(self.config.highlight.interval_ms)),
            schedule: kiosk.schedule.clone(),
        };
        let desk = AttendanceDesk::from_config(kiosk);
        let sampler = FrameSampler::new(self.config.sampler.jpeg_quality);

        state_tx.send_replace(LifecyclePhase::Armed);
        self.publish(KioskEvent::lifecycle(
            LifecyclePhase::Armed,
            Some(format!(
                "capturing every {}ms, cooldown {}ms",
                kiosk.tick_interval_ms, kiosk.cooldown_ms
            )),
        ))
        .await;

        let worker = LoopWorker {
            stream,
            client: Arc::clone(&self.client),
            publisher: Arc::clone(&self.publisher),
            telemetry: self.telemetry.clone(),
            desk,
            sampler,
            clock: KioskClock::start(),
            settings,
            state: state_tx,
            counters: TickCounters::default(),
            last_highlight: None,
        };
        let cancel = CancellationToken::new();
        let join = tokio::spawn(worker.run(cancel.clone()));

        Ok(KioskHandle {
            cancel,
            join: Some(join),
            state: state_rx,
            publisher: self.publisher,
        })
    }

    async fn publish(&self, event: KioskEvent) {
        if let Err(err) = self.publisher.publish(event.clone()).await {
            warn!("Event publication failed: {err}");
        }
        if let Err(err) = self.telemetry.record_event(event).await {
            warn!("Telemetry recording failed: {err}");
        }
    }
}

/// Running capture session. Dropping the handle cancels the loop.
pub struct KioskHandle<P: EventPublisher> {
    cancel: CancellationToken,
    join: Option<JoinHandle<SessionSummary>>,
    state: watch::Receiver<LifecyclePhase>,
    publisher: Arc<P>,
}

impl<P: EventPublisher> KioskHandle<P> {
    pub fn state(&self) -> LifecyclePhase {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LifecyclePhase> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> BoxStream<'static, KioskEvent> {
        self.publisher.subscribe()
    }

    /// Token that stops the loop when cancelled, e.g. from a signal handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop, wait for it to release the camera and return the session.
    pub async fn stop(mut self) -> Result<SessionSummary> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the loop to end without cancelling it.
    pub async fn wait(&mut self) -> Result<SessionSummary> {
        let join = self
            .join
            .take()
            .ok_or_else(|| kiosk_error("capture loop already joined"))?;
        join.await
            .map_err(|err| kiosk_error(format!("capture loop task failed: {err}")))
    }
}

impl<P: EventPublisher> Drop for KioskHandle<P> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Budget for one whole tick: the backend request timeout plus one period for
/// capture and encoding, and never less than two periods.
pub fn tick_timeout(config: &FramesConfig) -> Duration {
    let interval = Duration::from_millis(config.kiosk.tick_interval_ms);
    let request = Duration::from_millis(config.recognition.request_timeout_ms);
    (request + interval)
        .max(interval * 2)
        .max(MIN_TICK_TIMEOUT)
}

pub fn kiosk_error(message: impl Into<String>) -> FramesError {
    FramesError::Kiosk(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_timeout_outlasts_request_timeout() {
        let mut config = FramesConfig::default();
        assert_eq!(tick_timeout(&config), Duration::from_millis(6_000));

        config.recognition.request_timeout_ms = 500;
        config.kiosk.tick_interval_ms = 2_000;
        assert_eq!(tick_timeout(&config), Duration::from_millis(4_000));

        config.recognition.request_timeout_ms = 30_000;
        assert!(tick_timeout(&config) > Duration::from_millis(30_000));
    }
}
