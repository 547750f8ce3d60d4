use camguide_common::GuideResult;
use camguide_detection_model::{Detection, DetectionLabel};

pub mod synthetic;

pub use synthetic::{ReplayFrame, ReplayScript, ScriptedDetector, ScriptedSource};

/// One captured camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Capture time in epoch seconds.
    pub captured_at: f64,
    /// Encoded image bytes (JPEG), written as-is when a session saves it.
    pub data: Vec<u8>,
}

/// Abstract interface for a camera device.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// Open the device. Returns the negotiated frame size.
    async fn open(&mut self) -> GuideResult<(u32, u32)>;

    /// Capture the next frame.
    async fn read_frame(&mut self) -> GuideResult<Frame>;

    /// Release the device.
    async fn close(&mut self) -> GuideResult<()>;

    /// Human-readable device name for logs.
    fn name(&self) -> &str;
}

/// A pre-trained model that finds one kind of object in a frame.
pub trait Detector: Send {
    fn label(&self) -> DetectionLabel;

    fn name(&self) -> &str;

    /// Model format, e.g. `pytorch` or `ncnn`.
    fn model_type(&self) -> Option<&str> {
        None
    }

    /// Run inference, keeping detections at or above `min_confidence`.
    fn detect(&mut self, frame: &Frame, min_confidence: f64) -> GuideResult<Vec<Detection>>;
}
