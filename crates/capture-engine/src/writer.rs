//! Append-only detection log for capture sessions.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use camguide_common::{GuideError, GuideResult};
use camguide_detection_model::HistoryEvent;

/// File name of the per-session detection log.
pub const DETECTIONS_FILE: &str = "detections.jsonl";

/// Metadata written as the first (comment) line of a detection log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionLogHeader {
    pub session_id: String,
    /// Wall-clock session start (RFC 3339).
    pub started_at: String,
    pub center_threshold_percent: f64,
}

/// Writes history events to a JSONL file in append-only mode.
pub struct EventWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    events_written: u64,
}

impl EventWriter {
    /// Create the log, writing the header as a `#` comment line.
    pub fn create(path: PathBuf, header: &DetectionLogHeader) -> GuideResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut writer = BufWriter::new(file);
        let header_json = serde_json::to_string(header)?;
        writeln!(writer, "# {header_json}")
            .map_err(|e| GuideError::session(format!("Failed to write log header: {e}")))?;

        Ok(Self {
            writer,
            path,
            events_written: 0,
        })
    }

    /// Append one event and flush, so the log survives a crash mid-session.
    pub fn write_event(&mut self, event: &HistoryEvent) -> GuideResult<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| GuideError::session(format!("Failed to write event: {e}")))?;
        self.events_written += 1;
        self.flush()
    }

    pub fn flush(&mut self) -> GuideResult<()> {
        self.writer
            .flush()
            .map_err(|e| GuideError::session(format!("Failed to flush events: {e}")))
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
