use std::sync::Arc;

use chrono::Utc;
use frames_camera::CameraStream;
use frames_ledger::{AttendanceDesk, Decision};
use frames_network::{EventPublisher, RecognitionClient, SubmissionOutcome};
use frames_ops::TelemetryStore;
use frames_types::{
    capture::{HighlightBox, ScheduleContext, VideoFrame},
    events::{
        BannerEvent, EventKind, EventPayload, HighlightEvent, KioskEvent, LifecyclePhase,
        TelemetryEvent,
    },
    telemetry::{LatencySample, SessionSummary, TickCounters},
};
use frames_vision::{skin_tone_highlight, FrameSampler};
use tokio::{
    sync::watch,
    time::{interval, interval_at, sleep_until, timeout, Duration, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::KioskClock;

pub(crate) struct LoopSettings {
    pub tick_interval: Duration,
    pub tick_timeout: Duration,
    pub highlight_interval: Option<Duration>,
    pub schedule: Option<ScheduleContext>,
}

/// Owns the camera stream and the attendance desk for one running session.
pub(crate) struct LoopWorker<S, R, P> {
    pub stream: S,
    pub client: Arc<R>,
    pub publisher: Arc<P>,
    pub telemetry: TelemetryStore,
    pub desk: AttendanceDesk,
    pub sampler: FrameSampler,
    pub clock: KioskClock,
    pub settings: LoopSettings,
    pub state: watch::Sender<LifecyclePhase>,
    pub counters: TickCounters,
    pub last_highlight: Option<HighlightBox>,
}

/// Ticks on `ticker` when present, otherwise never resolves.
async fn optional_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<S, R, P> LoopWorker<S, R, P>
where
    S: CameraStream,
    R: RecognitionClient,
    P: EventPublisher,
{
    pub async fn run(mut self, cancel: CancellationToken) -> SessionSummary {
        let started_at = Utc::now();
        // First capture one period after arming, like a browser interval timer.
        let period = self.settings.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut highlight_ticker = self.settings.highlight_interval.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        loop {
            let banner_deadline = self
                .desk
                .banner_deadline()
                .map(|at| self.clock.instant_at(at));

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = until(banner_deadline) => {
                    if self.desk.expire_banner(self.clock.now()) {
                        self.publish(KioskEvent::banner(BannerEvent::Cleared)).await;
                    }
                }
                _ = ticker.tick() => {
                    self.set_phase(LifecyclePhase::Sampling);
                    let tick_timeout = self.settings.tick_timeout;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        finished = timeout(tick_timeout, self.tick()) => {
                            if finished.is_err() {
                                self.counters.timeouts += 1;
                                warn!("Capture tick exceeded {}ms, abandoning it", tick_timeout.as_millis());
                            }
                        }
                    }
                    self.set_phase(LifecyclePhase::Armed);
                }
                _ = optional_tick(&mut highlight_ticker) => {
                    self.refresh_highlight().await;
                }
            }
        }

        let metrics = self.stream.metrics();
        self.stream.stop();
        debug!(
            "Camera released after {} frames ({} failed grabs)",
            metrics.frames_grabbed, metrics.failed_grabs
        );
        self.set_phase(LifecyclePhase::Stopped);
        self.publish(KioskEvent::lifecycle(
            LifecyclePhase::Stopped,
            Some("capture stopped, camera released".into()),
        ))
        .await;
        info!(
            "Capture loop stopped after {} ticks ({} recorded)",
            self.counters.ticks,
            self.desk.records().total_recorded()
        );

        SessionSummary {
            started_at,
            stopped_at: Utc::now(),
            recorded: self.desk.records().to_vec(),
            total_recorded: self.desk.records().total_recorded(),
            ledger_entries: self.desk.ledger().len(),
            counters: self.counters.clone(),
        }
    }

    async fn tick(&mut self) {
        self.counters.ticks += 1;
        let start = Instant::now();

        let Some(frame) = self.grab_frame().await else {
            self.counters.skipped += 1;
            return;
        };
        let capture_ms = start.elapsed().as_millis() as u64;

        let encode_start = Instant::now();
        let sampler = self.sampler;
        let schedule = self.settings.schedule.clone();
        let sampled =
            tokio::task::spawn_blocking(move || sampler.sample(&frame, schedule.as_ref())).await;
        let sample = match sampled {
            Ok(Ok(Some(sample))) => sample,
            Ok(Ok(None)) => {
                self.counters.skipped += 1;
                return;
            }
            Ok(Err(err)) => {
                self.counters.sampler_errors += 1;
                warn!("Frame sampling failed: {err}");
                return;
            }
            Err(err) => {
                self.counters.sampler_errors += 1;
                warn!("Frame sampling worker join failed: {err}");
                return;
            }
        };
        let encode_ms = encode_start.elapsed().as_millis() as u64;

        let submit_start = Instant::now();
        self.counters.submissions += 1;
        let outcome = self.client.submit(&sample).await;
        let submit_ms = submit_start.elapsed().as_millis() as u64;
        drop(sample);

        let now = self.clock.now();
        match outcome {
            Ok(SubmissionOutcome::Recognized(result)) => {
                self.counters.recognized += 1;
                match self.desk.on_recognized(&result, now) {
                    Decision::Accepted { event, banner } => {
                        self.counters.accepted += 1;
                        self.publish(KioskEvent::recorded(event)).await;
                        self.publish(KioskEvent::banner(BannerEvent::Shown { text: banner }))
                            .await;
                    }
                    Decision::Suppressed { .. } => {
                        self.counters.suppressed += 1;
                    }
                }
            }
            Ok(SubmissionOutcome::NoMatch { status, detail }) => {
                self.counters.no_match += 1;
                debug!("Backend response: {status} - {detail}");
            }
            Ok(SubmissionOutcome::Rejected { status, detail }) => {
                self.counters.rejected += 1;
                warn!("Backend rejected capture: {status} - {detail}");
            }
            Err(err) => {
                self.counters.transport_errors += 1;
                warn!("No response from recognition backend: {err}");
            }
        }
        self.desk.prune(now);

        let latency = LatencySample {
            capture_ms,
            encode_ms,
            submit_ms,
            total_ms: start.elapsed().as_millis() as u64,
            captured_at: Utc::now(),
        };
        self.telemetry
            .record_tick(self.counters.clone(), Some(latency.clone()))
            .await;
        self.publish(KioskEvent::new(
            EventKind::Telemetry,
            EventPayload::Telemetry(TelemetryEvent {
                counters: self.counters.clone(),
                latency: Some(latency),
            }),
        ))
        .await;
    }

    /// Frame with usable dimensions, or `None` to skip this tick.
    async fn grab_frame(&mut self) -> Option<VideoFrame> {
        match self.stream.grab().await {
            Ok(Some(frame)) if frame.has_dimensions() => Some(frame),
            Ok(Some(_)) => {
                debug!("Video source not ready (zero dimensions), skipping tick");
                None
            }
            Ok(None) => {
                debug!("No active video track, skipping tick");
                None
            }
            Err(err) => {
                warn!("Frame capture failed: {err}");
                None
            }
        }
    }

    async fn refresh_highlight(&mut self) {
        let Some(frame) = self.grab_frame().await else {
            return;
        };
        let highlight = skin_tone_highlight(&frame);
        if highlight.region == self.last_highlight {
            return;
        }
        self.last_highlight = highlight.region;
        self.publish(KioskEvent::new(
            EventKind::Highlight,
            EventPayload::Highlight(HighlightEvent {
                region: highlight.region,
                zoom: highlight.zoom,
            }),
        ))
        .await;
    }

    fn set_phase(&self, phase: LifecyclePhase) {
        self.state.send_replace(phase);
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
