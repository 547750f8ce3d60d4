//! Scripted backend used by the CLI and tests.
//!
//! A replay script is JSONL: an optional `# {"width":..,"height":..}` header
//! comment followed by one object per frame:
//!
//! ```text
//! # {"width": 640, "height": 480}
//! {"faces": [[40, 30, 80, 80]], "materials": [{"box": [170, 110, 100, 100], "confidence": 0.91}]}
//! {"capture_error": true}
//! {"materials": [{"box": [270, 190, 100, 100], "confidence": 0.66}], "material_error": false}
//! ```
//!
//! The script cycles once exhausted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use camguide_common::{now_epoch_secs, GuideError, GuideResult};
use camguide_detection_model::{BoundingBox, Detection, DetectionLabel};

use super::{Detector, Frame, FrameSource};

/// Smallest well-formed JPEG stream: SOI followed by EOI.
const PLACEHOLDER_JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// Frame source producing blank frames of a fixed size.
pub struct ScriptedSource {
    name: String,
    width: u32,
    height: u32,
    /// Cycled per read; `true` fails that read.
    failures: Vec<bool>,
    open_error: Option<String>,
    opened: bool,
    reads: u64,
}

impl ScriptedSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            name: format!("scripted {width}x{height}"),
            width,
            height,
            failures: Vec::new(),
            open_error: None,
            opened: false,
            reads: 0,
        }
    }

    /// Fail reads according to a repeating pattern.
    pub fn with_failures(mut self, pattern: Vec<bool>) -> Self {
        self.failures = pattern;
        self
    }

    /// Make `open` fail, simulating a missing device.
    pub fn with_open_error(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn open(&mut self) -> GuideResult<(u32, u32)> {
        if let Some(message) = &self.open_error {
            return Err(GuideError::capture(message.clone()));
        }
        self.opened = true;
        Ok((self.width, self.height))
    }

    async fn read_frame(&mut self) -> GuideResult<Frame> {
        if !self.opened {
            return Err(GuideError::capture(format!("{} is not open", self.name)));
        }
        let index = self.reads;
        self.reads += 1;

        if !self.failures.is_empty() && self.failures[(index as usize) % self.failures.len()] {
            return Err(GuideError::capture(format!(
                "failed to read frame {index} from {}",
                self.name
            )));
        }

        Ok(Frame {
            width: self.width,
            height: self.height,
            captured_at: now_epoch_secs(),
            data: PLACEHOLDER_JPEG.to_vec(),
        })
    }

    async fn close(&mut self) -> GuideResult<()> {
        self.opened = false;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Detector replaying a fixed list of per-frame results.
pub struct ScriptedDetector {
    label: DetectionLabel,
    name: String,
    model_type: Option<String>,
    /// `None` entries simulate an inference failure.
    script: Vec<Option<Vec<Detection>>>,
    cursor: usize,
}

impl ScriptedDetector {
    pub fn new(label: DetectionLabel, script: Vec<Option<Vec<Detection>>>) -> Self {
        Self {
            label,
            name: format!("scripted {label}"),
            model_type: None,
            script,
            cursor: 0,
        }
    }

    /// Same detections on every frame.
    pub fn constant(label: DetectionLabel, detections: Vec<Detection>) -> Self {
        Self::new(label, vec![Some(detections)])
    }

    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = Some(model_type.into());
        self
    }
}

impl Detector for ScriptedDetector {
    fn label(&self) -> DetectionLabel {
        self.label
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_type(&self) -> Option<&str> {
        self.model_type.as_deref()
    }

    fn detect(&mut self, _frame: &Frame, min_confidence: f64) -> GuideResult<Vec<Detection>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let entry = &self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        match entry {
            Some(detections) => Ok(detections
                .iter()
                .filter(|d| d.confidence >= min_confidence)
                .copied()
                .collect()),
            None => Err(GuideError::inference(
                self.name.clone(),
                format!("scripted failure at step {}", self.cursor - 1),
            )),
        }
    }
}

/// Frame size declared in a replay header comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayHeader {
    pub width: u32,
    pub height: u32,
}

impl Default for ReplayHeader {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedMaterial {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// One line of a replay script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(default)]
    pub faces: Vec<BoundingBox>,
    #[serde(default)]
    pub materials: Vec<ScriptedMaterial>,
    /// The camera read for this step fails.
    #[serde(default)]
    pub capture_error: bool,
    /// The reading material model fails on this frame.
    #[serde(default)]
    pub material_error: bool,
}

/// A parsed replay script.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayScript {
    pub header: ReplayHeader,
    pub frames: Vec<ReplayFrame>,
}

impl ReplayScript {
    pub fn parse(content: &str) -> GuideResult<Self> {
        let mut header = ReplayHeader::default();
        let mut frames = Vec::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if frames.is_empty() {
                    if let Ok(parsed) = serde_json::from_str::<ReplayHeader>(comment.trim()) {
                        header = parsed;
                    }
                }
                continue;
            }
            let frame: ReplayFrame = serde_json::from_str(line).map_err(|e| {
                GuideError::invalid_input(format!("replay line {}: {e}", number + 1))
            })?;
            frames.push(frame);
        }

        if header.width == 0 || header.height == 0 {
            return Err(GuideError::invalid_input(format!(
                "replay frame size must be positive, got {}x{}",
                header.width, header.height
            )));
        }

        Ok(Self { header, frames })
    }

    pub fn load(path: &Path) -> GuideResult<Self> {
        if !path.exists() {
            return Err(GuideError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Split into a source and one detector per label.
    ///
    /// Detector scripts only contain steps whose capture succeeds, so they
    /// stay aligned with the frames the service actually analyzes.
    pub fn into_backends(self) -> (ScriptedSource, ScriptedDetector, ScriptedDetector) {
        let failures: Vec<bool> = self.frames.iter().map(|f| f.capture_error).collect();
        let captured = || self.frames.iter().filter(|f| !f.capture_error);

        let faces = captured()
            .map(|f| Some(f.faces.iter().copied().map(Detection::face).collect()))
            .collect();
        let materials = captured()
            .map(|f| {
                (!f.material_error).then(|| {
                    f.materials
                        .iter()
                        .map(|m| Detection::reading_material(m.bbox, m.confidence))
                        .collect()
                })
            })
            .collect();

        (
            ScriptedSource::new(self.header.width, self.header.height).with_failures(failures),
            ScriptedDetector::new(DetectionLabel::Face, faces).with_model_type("cascade"),
            ScriptedDetector::new(DetectionLabel::ReadingMaterial, materials)
                .with_model_type("pytorch"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"# {"width": 320, "height": 240}

{"faces": [[1, 2, 30, 40]], "materials": [{"box": [10, 10, 50, 50], "confidence": 0.75}]}
{"capture_error": true}
{"materials": [{"box": [0, 0, 20, 20], "confidence": 0.25}], "material_error": true}
"#;

    fn frame() -> Frame {
        Frame {
            width: 320,
            height: 240,
            captured_at: 0.0,
            data: Vec::new(),
        }
    }

    #[test]
    fn test_parse_header_and_frames() {
        let script = ReplayScript::parse(SCRIPT).unwrap();
        assert_eq!(script.header, ReplayHeader { width: 320, height: 240 });
        assert_eq!(script.frames.len(), 3);
        assert!(script.frames[1].capture_error);
        assert!(script.frames[2].material_error);
    }

    #[test]
    fn test_parse_without_header_uses_defaults() {
        let script = ReplayScript::parse("{}\n").unwrap();
        assert_eq!(script.header, ReplayHeader::default());
        assert_eq!(script.frames, vec![ReplayFrame::default()]);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = ReplayScript::parse("{}\n{not json}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReplayScript::load(Path::new("/nonexistent/replay.jsonl")).unwrap_err();
        assert!(matches!(err, GuideError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_source_cycles_failures() {
        let (mut source, _, _) = ReplayScript::parse(SCRIPT).unwrap().into_backends();
        assert!(source.read_frame().await.is_err());

        assert_eq!(source.open().await.unwrap(), (320, 240));
        let results: Vec<bool> = {
            let mut out = Vec::new();
            for _ in 0..6 {
                out.push(source.read_frame().await.is_ok());
            }
            out
        };
        assert_eq!(results, vec![true, false, true, true, false, true]);
        assert_eq!(source.reads(), 6);
    }

    #[test]
    fn test_detectors_skip_failed_captures() {
        let (_, mut faces, mut materials) = ReplayScript::parse(SCRIPT).unwrap().into_backends();

        let first = faces.detect(&frame(), 0.5).unwrap();
        assert_eq!(first, vec![Detection::face(BoundingBox::new(1, 2, 30, 40))]);
        assert!(faces.detect(&frame(), 0.5).unwrap().is_empty());

        let first = materials.detect(&frame(), 0.5).unwrap();
        assert_eq!(first.len(), 1);
        let err = materials.detect(&frame(), 0.5).unwrap_err();
        assert!(matches!(err, GuideError::Inference { .. }));
        // Cycles back to the first captured step.
        assert_eq!(materials.detect(&frame(), 0.5).unwrap().len(), 1);
    }

    #[test]
    fn test_confidence_filter() {
        let mut detector = ScriptedDetector::constant(
            DetectionLabel::ReadingMaterial,
            vec![
                Detection::reading_material(BoundingBox::new(0, 0, 5, 5), 0.4),
                Detection::reading_material(BoundingBox::new(0, 0, 5, 5), 0.6),
            ],
        );
        assert_eq!(detector.detect(&frame(), 0.5).unwrap().len(), 1);
        assert_eq!(detector.detect(&frame(), 0.0).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_open_error() {
        let mut source = ScriptedSource::new(640, 480).with_open_error("no camera at index 3");
        let err = source.open().await.unwrap_err();
        assert!(matches!(err, GuideError::Capture { .. }));
        assert!(!source.is_open());
    }
}
