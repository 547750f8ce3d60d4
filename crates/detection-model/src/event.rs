//! Detection history events.
//!
//! One [`HistoryEvent`] is recorded per processed frame that produced at
//! least one detection or a guidance vector. Sessions persist them as
//! append-only JSONL, one event per line.

use serde::{Deserialize, Serialize};

use crate::analysis::{FaceReport, FrameAnalysis, FramePositioning, GuidanceResult, MaterialReport};

/// Wall-clock time in fractional seconds since the Unix epoch.
pub type EpochSecs = f64;

/// A timestamped snapshot of one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    #[serde(rename = "t")]
    pub timestamp: EpochSecs,

    #[serde(default)]
    pub materials: Vec<MaterialReport>,

    #[serde(default)]
    pub faces: Vec<FaceReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<GuidanceResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioning: Option<FramePositioning>,
}

impl HistoryEvent {
    /// Snapshot an analysis, or `None` when the frame had nothing to record.
    pub fn from_analysis(timestamp: EpochSecs, analysis: &FrameAnalysis) -> Option<Self> {
        if !analysis.has_content() {
            return None;
        }
        Some(Self {
            timestamp,
            materials: analysis.reading_materials.clone(),
            faces: analysis.faces.clone(),
            guidance: analysis.robot_guidance,
            positioning: analysis.positioning,
        })
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Parse events from JSONL content. Blank lines and `#` comments are skipped.
pub fn parse_events(jsonl: &str) -> Result<Vec<HistoryEvent>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize events to JSONL.
pub fn serialize_events(events: &[HistoryEvent]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for event in events {
        output.push_str(&serde_json::to_string(event)?);
        output.push('\n');
    }
    Ok(output)
}
