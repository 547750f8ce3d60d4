//! The camera service: tick loop plus the front-end boundary.
//!
//! One tokio task runs the ticks. Each tick is strictly sequential:
//! capture, detect, analyze, publish the snapshot, append history, and save
//! the frame when a session is active. Front-ends read the latest snapshot
//! through a `watch` channel and the history through a mutex, so they never
//! observe a half-updated frame.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use camguide_common::{AppConfig, GuideError, GuideResult};
use camguide_detection_model::{
    write_csv, DetectionExport, ExportDataType, FrameAnalysis, GuidanceResult, HistoryEvent,
};
use camguide_processing_core::{analyze_frame, FrameRate, HistoryBuffer, RenderMode};

use crate::backend::FrameSource;
use crate::detectors::{DetectionStatus, DetectorSet};
use crate::session::{CaptureSession, CapturedImage, SessionInfo, SessionSummary};

/// The most recent processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// 1-based count of processed frames; 0 before the first tick.
    pub frame_index: u64,
    pub captured_at: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub analysis: FrameAnalysis,
}

/// Service state for status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub detection: DetectionStatus,
    pub camera_running: bool,
    pub session_active: bool,
    pub session_id: Option<String>,
    pub frame_rate: FrameRate,
    pub frames_processed: u64,
    pub capture_failures: u64,
    pub history_len: usize,
}

struct Engine {
    source: Box<dyn FrameSource>,
    detectors: DetectorSet,
    session: CaptureSession,
    frames_processed: u64,
    capture_failures: u64,
}

struct Shared {
    config: Arc<AppConfig>,
    engine: tokio::sync::Mutex<Engine>,
    history: Mutex<HistoryBuffer>,
    snapshot: watch::Sender<Arc<FrameSnapshot>>,
}

impl Shared {
    fn history(&self) -> MutexGuard<'_, HistoryBuffer> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn process_tick(&self) {
        let mut engine = self.engine.lock().await;

        let frame = match engine.source.read_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                engine.capture_failures += 1;
                tracing::warn!(error = %e, "Frame capture failed, skipping tick");
                return;
            }
        };

        let (materials, faces) = engine.detectors.run(&frame);
        let analysis = analyze_frame(
            &materials,
            &faces,
            frame.width,
            frame.height,
            self.config.camera.center_threshold_percent,
        );
        engine.frames_processed += 1;

        tracing::debug!(
            frame = engine.frames_processed,
            materials = analysis.reading_materials.len(),
            faces = analysis.faces.len(),
            command = ?analysis.robot_guidance.map(|g| g.robot_command),
            "Processed frame"
        );

        self.snapshot.send_replace(Arc::new(FrameSnapshot {
            frame_index: engine.frames_processed,
            captured_at: frame.captured_at,
            frame_width: frame.width,
            frame_height: frame.height,
            analysis: analysis.clone(),
        }));

        if let Some(event) = HistoryEvent::from_analysis(frame.captured_at, &analysis) {
            self.history().append(event);
        }

        if let Err(e) = engine.session.record(&frame, &analysis) {
            tracing::warn!(error = %e, "Failed to record session frame");
        }
    }
}

fn ticker(rate: FrameRate, delay_first: bool) -> Interval {
    let period = rate.interval();
    let start = if delay_first {
        Instant::now() + period
    } else {
        Instant::now()
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn tick_loop(
    shared: Arc<Shared>,
    mut running: watch::Receiver<bool>,
    mut rate: watch::Receiver<FrameRate>,
) {
    let mut interval = ticker(*rate.borrow_and_update(), false);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                shared.process_tick().await;
            }
            changed = rate.changed() => {
                if changed.is_err() {
                    break;
                }
                let new_rate = *rate.borrow_and_update();
                interval = ticker(new_rate, true);
                tracing::debug!(rate = %new_rate, "Tick interval reset");
            }
            changed = running.changed() => {
                if changed.is_err() || !*running.borrow_and_update() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Tick loop exited");
}

/// Front-end boundary over one camera.
pub struct CameraService {
    shared: Arc<Shared>,
    running: watch::Sender<bool>,
    rate: watch::Sender<FrameRate>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CameraService {
    pub fn new(
        config: Arc<AppConfig>,
        source: Box<dyn FrameSource>,
        detectors: DetectorSet,
    ) -> GuideResult<Self> {
        config.camera.validate_ranges()?;
        let history = HistoryBuffer::with_capacity(config.camera.history_capacity)?;
        let rate = FrameRate::from_interval_secs(config.camera.capture_interval);
        let session = CaptureSession::new(
            config.camera.image_dir.clone(),
            config.camera.center_threshold_percent,
        );

        let (snapshot, _) = watch::channel(Arc::new(FrameSnapshot::default()));
        let (running, _) = watch::channel(false);
        let (rate, _) = watch::channel(rate);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                engine: tokio::sync::Mutex::new(Engine {
                    source,
                    detectors,
                    session,
                    frames_processed: 0,
                    capture_failures: 0,
                }),
                history: Mutex::new(history),
                snapshot,
            }),
            running,
            rate,
            task: tokio::sync::Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.shared.config
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Open the camera and start ticking. Starting twice is a no-op.
    pub async fn start_camera(&self) -> GuideResult<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            tracing::debug!("Camera already running");
            return Ok(());
        }

        {
            let mut engine = self.shared.engine.lock().await;
            let (width, height) = engine.source.open().await?;
            tracing::info!(
                device = engine.source.name(),
                width,
                height,
                rate = %self.frame_rate(),
                "Camera started"
            );
        }

        self.running.send_replace(true);
        *task = Some(tokio::spawn(tick_loop(
            Arc::clone(&self.shared),
            self.running.subscribe(),
            self.rate.subscribe(),
        )));
        Ok(())
    }

    /// Stop ticking and release the camera.
    ///
    /// An active session is ended first and its summary returned. The tick
    /// in flight, if any, completes before this returns.
    pub async fn stop_camera(&self) -> GuideResult<Option<SessionSummary>> {
        let summary = if self.session_active().await {
            Some(self.end_session().await?)
        } else {
            None
        };

        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return Ok(summary);
        };

        self.running.send_replace(false);
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Tick loop ended abnormally");
        }

        let mut engine = self.shared.engine.lock().await;
        engine.source.close().await?;
        tracing::info!(frames = engine.frames_processed, "Camera stopped");
        Ok(summary)
    }

    /// Start saving frames, starting the camera if needed.
    ///
    /// A camera started here is stopped again when the session fails to start.
    pub async fn start_session(&self, session_id: Option<String>) -> GuideResult<SessionInfo> {
        if self.session_active().await {
            return Err(GuideError::session(
                "A session is already active. End it first.",
            ));
        }
        let was_running = self.is_running();
        self.start_camera().await?;

        let started = self.shared.engine.lock().await.session.start(session_id);
        if started.is_err() && !was_running {
            if let Err(e) = self.stop_camera().await {
                tracing::warn!(error = %e, "Failed to stop camera after session error");
            }
        }
        started
    }

    /// End the active session and clear the history; the camera keeps running.
    pub async fn end_session(&self) -> GuideResult<SessionSummary> {
        let mut engine = self.shared.engine.lock().await;
        let status = engine.detectors.status();
        let summary = engine.session.end(&status)?;
        self.shared.history().clear();
        Ok(summary)
    }

    pub async fn session_active(&self) -> bool {
        self.shared.engine.lock().await.session.is_active()
    }

    /// Switch the capture interval. Unknown labels keep the current rate.
    pub fn set_frame_rate(&self, label: &str) -> GuideResult<FrameRate> {
        let rate = FrameRate::from_label(label).map_err(|e| {
            tracing::warn!(label, current = %self.frame_rate(), "Rejected frame rate");
            e
        })?;
        let mut previous = rate;
        let changed = self.rate.send_if_modified(|current| {
            previous = std::mem::replace(current, rate);
            previous != rate
        });
        if changed {
            tracing::info!(from = %previous, to = %rate, "Frame rate changed");
        }
        Ok(rate)
    }

    pub fn frame_rate(&self) -> FrameRate {
        *self.rate.borrow()
    }

    pub fn current_snapshot(&self) -> Arc<FrameSnapshot> {
        Arc::clone(&self.shared.snapshot.borrow())
    }

    /// Receiver notified on every processed frame.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FrameSnapshot>> {
        self.shared.snapshot.subscribe()
    }

    pub fn current_detections(&self) -> FrameAnalysis {
        self.current_snapshot().analysis.clone()
    }

    pub fn current_guidance(&self) -> Option<GuidanceResult> {
        self.current_snapshot().analysis.robot_guidance
    }

    pub fn render_history(&self, mode: RenderMode) -> Vec<String> {
        self.shared.history().render(mode)
    }

    pub fn history_events(&self) -> Vec<HistoryEvent> {
        self.shared.history().iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.shared.history().len()
    }

    pub fn clear_history(&self) {
        self.shared.history().clear();
        tracing::info!("History cleared");
    }

    pub async fn detection_status(&self) -> DetectionStatus {
        self.shared.engine.lock().await.detectors.status()
    }

    pub async fn status(&self) -> ServiceStatus {
        let engine = self.shared.engine.lock().await;
        ServiceStatus {
            detection: engine.detectors.status(),
            camera_running: self.is_running(),
            session_active: engine.session.is_active(),
            session_id: engine.session.session_id().map(str::to_string),
            frame_rate: self.frame_rate(),
            frames_processed: engine.frames_processed,
            capture_failures: engine.capture_failures,
            history_len: self.history_len(),
        }
    }

    /// Images of the current or last session.
    pub async fn captured_images(&self) -> Vec<CapturedImage> {
        self.shared.engine.lock().await.session.images().to_vec()
    }

    async fn export_envelope(&self, data_type: ExportDataType) -> GuideResult<DetectionExport> {
        let snapshot = self.current_snapshot();
        if snapshot.frame_index == 0 {
            return Err(GuideError::export("No detection data to export"));
        }
        Ok(DetectionExport {
            timestamp: Local::now().to_rfc3339(),
            data_type,
            detection_data: snapshot.analysis.clone(),
            session_active: self.session_active().await,
            camera_running: self.is_running(),
        })
    }

    pub async fn export_json(&self, data_type: ExportDataType, path: &Path) -> GuideResult<()> {
        let export = self.export_envelope(data_type).await?;
        export
            .write_file(path)
            .map_err(|e| GuideError::export(e.to_string()))?;
        tracing::info!(path = %path.display(), %data_type, "Exported JSON");
        Ok(())
    }

    pub async fn export_csv(&self, data_type: ExportDataType, path: &Path) -> GuideResult<()> {
        let export = self.export_envelope(data_type).await?;
        write_csv(&export.detection_data, data_type, path)
            .map_err(|e| GuideError::export(e.to_string()))?;
        tracing::info!(path = %path.display(), %data_type, "Exported CSV");
        Ok(())
    }

    /// Export by file extension: `.csv` writes a table, anything else JSON.
    pub async fn export_to(&self, path: &Path, data_type: ExportDataType) -> GuideResult<()> {
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            self.export_csv(data_type, path).await
        } else {
            self.export_json(data_type, path).await
        }
    }
}
