//! Capture session management.
//!
//! While a session is active every processed frame is saved, unannotated,
//! under `<image_dir>/<session_id>/`, and its analysis is appended to the
//! session's detection log. Ending a session writes `session_info.txt`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use camguide_common::{capture_stamp, now_epoch_secs, session_stamp, to_datetime, GuideError, GuideResult};
use camguide_detection_model::{FrameAnalysis, HistoryEvent};

use crate::backend::Frame;
use crate::detectors::DetectionStatus;
use crate::writer::{DetectionLogHeader, EventWriter, DETECTIONS_FILE};

pub const SESSION_INFO_FILE: &str = "session_info.txt";

/// State of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session has been started.
    Idle,
    /// Frames are being saved.
    Active,
    /// The last session ended; its images remain listed.
    Ended,
}

/// Detection counts recorded with a saved frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDetections {
    pub faces: usize,
    pub reading_materials: usize,
}

/// A frame saved during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub filename: PathBuf,
    pub timestamp: f64,
    /// `YYYYmmdd_HHMMSS_mmm`, also the file stem.
    pub datetime: String,
    pub session_id: String,
    pub detections: ImageDetections,
}

/// Identity of a started session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub session_dir: PathBuf,
}

/// Result of ending a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub session_dir: PathBuf,
    pub images: Vec<CapturedImage>,
    pub events_logged: u64,
    pub summary_path: PathBuf,
}

/// Lifecycle of the current (or most recent) capture session.
pub struct CaptureSession {
    image_dir: PathBuf,
    center_threshold_percent: f64,
    state: SessionState,
    info: Option<SessionInfo>,
    images: Vec<CapturedImage>,
    log: Option<EventWriter>,
}

impl CaptureSession {
    pub fn new(image_dir: impl Into<PathBuf>, center_threshold_percent: f64) -> Self {
        Self {
            image_dir: image_dir.into(),
            center_threshold_percent,
            state: SessionState::Idle,
            info: None,
            images: Vec::new(),
            log: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Current or last session.
    pub fn info(&self) -> Option<&SessionInfo> {
        self.info.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.info.as_ref().map(|i| i.session_id.as_str())
    }

    /// Images of the current or last session.
    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    /// Start saving frames. The id defaults to the local `YYYYmmdd_HHMMSS`.
    pub fn start(&mut self, session_id: Option<String>) -> GuideResult<SessionInfo> {
        if self.is_active() {
            return Err(GuideError::session(
                "A session is already active. End it first.",
            ));
        }

        let now = now_epoch_secs();
        let session_id = match session_id.map(|s| s.trim().to_string()) {
            Some(id) if !id.is_empty() => validate_session_id(id)?,
            _ => session_stamp(now),
        };
        let session_dir = self.image_dir.join(&session_id);
        std::fs::create_dir_all(&session_dir).map_err(|e| {
            GuideError::session(format!(
                "Failed to create session directory {}: {e}",
                session_dir.display()
            ))
        })?;

        let header = DetectionLogHeader {
            session_id: session_id.clone(),
            started_at: to_datetime(now, &Local).to_rfc3339(),
            center_threshold_percent: self.center_threshold_percent,
        };
        let log = EventWriter::create(session_dir.join(DETECTIONS_FILE), &header)?;

        tracing::info!(session_id = %session_id, dir = %session_dir.display(), "Session started");

        let info = SessionInfo {
            session_id,
            session_dir,
        };
        self.info = Some(info.clone());
        self.images.clear();
        self.log = Some(log);
        self.state = SessionState::Active;
        Ok(info)
    }

    /// Save a processed frame and log its analysis. No-op when inactive.
    pub fn record(
        &mut self,
        frame: &Frame,
        analysis: &FrameAnalysis,
    ) -> GuideResult<Option<CapturedImage>> {
        if !self.is_active() {
            return Ok(None);
        }
        let Some(info) = self.info.as_ref() else {
            return Ok(None);
        };

        let datetime = capture_stamp(frame.captured_at);
        let path = info.session_dir.join(format!("{datetime}.jpg"));
        std::fs::write(&path, &frame.data).map_err(|e| {
            GuideError::session(format!("Failed to save {}: {e}", path.display()))
        })?;

        let image = CapturedImage {
            filename: path,
            timestamp: frame.captured_at,
            datetime,
            session_id: info.session_id.clone(),
            detections: ImageDetections {
                faces: analysis.faces.len(),
                reading_materials: analysis.reading_materials.len(),
            },
        };
        tracing::debug!(file = %image.filename.display(), "Saved session frame");
        // A saved file stays listed even if logging it fails.
        self.images.push(image.clone());

        if let (Some(log), Some(event)) = (
            self.log.as_mut(),
            HistoryEvent::from_analysis(frame.captured_at, analysis),
        ) {
            log.write_event(&event)?;
        }

        Ok(Some(image))
    }

    /// Stop saving frames and write the session summary.
    pub fn end(&mut self, status: &DetectionStatus) -> GuideResult<SessionSummary> {
        if !self.is_active() {
            return Err(GuideError::session("No active session to end"));
        }
        let info = self
            .info
            .clone()
            .ok_or_else(|| GuideError::session("Active session has no identity"))?;

        let events_logged = match self.log.take() {
            Some(mut log) => {
                log.flush()?;
                log.events_written()
            }
            None => 0,
        };

        self.state = SessionState::Ended;

        let summary_path = info.session_dir.join(SESSION_INFO_FILE);
        let text = render_summary(&info.session_id, &self.images, status);
        std::fs::write(&summary_path, text)?;

        tracing::info!(
            session_id = %info.session_id,
            images = self.images.len(),
            events_logged,
            "Session ended"
        );

        Ok(SessionSummary {
            session_id: info.session_id,
            session_dir: info.session_dir,
            images: self.images.clone(),
            events_logged,
            summary_path,
        })
    }
}

/// Session ids become directory names; reject anything that could escape
/// the image directory.
fn validate_session_id(id: String) -> GuideResult<String> {
    let bad = id == "."
        || id == ".."
        || id.contains(['/', '\\'])
        || Path::new(&id).is_absolute();
    if bad {
        return Err(GuideError::invalid_input(format!("invalid session id '{id}'")));
    }
    Ok(id)
}

fn render_summary(session_id: &str, images: &[CapturedImage], status: &DetectionStatus) -> String {
    let recorded_on = Local::now().format("%Y-%m-%d %H:%M:%S");
    let mut out = String::new();
    let _ = writeln!(out, "Session ID: {session_id}");
    let _ = writeln!(out, "Recorded on: {recorded_on}");
    let _ = writeln!(out, "Total images: {}", images.len());
    out.push('\n');
    out.push_str("Detection Models:\n");
    for line in status.summary_lines() {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
    for (i, image) in images.iter().enumerate() {
        let name = image
            .filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "Image {}: {} - {}", i + 1, name, image.datetime);
    }
    out
}
