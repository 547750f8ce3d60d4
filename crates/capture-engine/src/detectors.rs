//! The face and reading material detectors configured for a camera.

use serde::{Deserialize, Serialize};

use camguide_common::CameraConfig;
use camguide_detection_model::{Detection, DetectionLabel};

use crate::backend::{Detector, Frame};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceDetectorStatus {
    pub enabled: bool,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDetectorStatus {
    pub enabled: bool,
    pub model_loaded: bool,
    pub model_type: Option<String>,
    pub use_ncnn: bool,
}

/// Which detectors are enabled and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStatus {
    pub face_detection: FaceDetectorStatus,
    pub reading_material_detection: MaterialDetectorStatus,
}

impl DetectionStatus {
    /// Lines for the `Detection Models:` block of a session summary.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "  Face Detection: {}",
                enabled_text(self.face_detection.enabled)
            ),
            format!(
                "  Reading Material Detection: {}",
                enabled_text(self.reading_material_detection.enabled)
            ),
        ];
        let material = &self.reading_material_detection;
        if material.enabled {
            if let Some(model_type) = &material.model_type {
                let ncnn = if material.use_ncnn { " (NCNN)" } else { "" };
                lines.push(format!("  Model Type: {}{ncnn}", model_type.to_uppercase()));
            }
        }
        lines
    }
}

fn enabled_text(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

/// Optional face and material detectors plus their confidence floor.
pub struct DetectorSet {
    face: Option<Box<dyn Detector>>,
    material: Option<Box<dyn Detector>>,
    face_enabled: bool,
    material_enabled: bool,
    use_ncnn: bool,
    min_confidence: f64,
}

impl DetectorSet {
    /// An empty set carrying the enable flags and threshold from `config`.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            face: None,
            material: None,
            face_enabled: config.face_detection_enabled,
            material_enabled: config.reading_material_detection_enabled,
            use_ncnn: config.use_ncnn,
            min_confidence: config.detection_confidence as f64,
        }
    }

    /// Install a detector in the slot matching its label.
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        match detector.label() {
            DetectionLabel::Face => self.face = Some(detector),
            DetectionLabel::ReadingMaterial => self.material = Some(detector),
        }
        self
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Run the enabled detectors. A failing detector contributes nothing.
    pub fn run(&mut self, frame: &Frame) -> (Vec<Detection>, Vec<Detection>) {
        let min_confidence = self.min_confidence;
        let faces = run_one(self.face_enabled, self.face.as_deref_mut(), frame, min_confidence);
        let materials = run_one(
            self.material_enabled,
            self.material.as_deref_mut(),
            frame,
            min_confidence,
        );
        (materials, faces)
    }

    pub fn status(&self) -> DetectionStatus {
        let model_type = self
            .material
            .as_ref()
            .and_then(|d| d.model_type())
            .map(str::to_string);
        let use_ncnn = self.use_ncnn && model_type.as_deref() == Some("ncnn");
        DetectionStatus {
            face_detection: FaceDetectorStatus {
                enabled: self.face_enabled,
                model_loaded: self.face.is_some(),
            },
            reading_material_detection: MaterialDetectorStatus {
                enabled: self.material_enabled,
                model_loaded: self.material.is_some(),
                model_type,
                use_ncnn,
            },
        }
    }
}

fn run_one(
    enabled: bool,
    detector: Option<&mut (dyn Detector + 'static)>,
    frame: &Frame,
    min_confidence: f64,
) -> Vec<Detection> {
    let Some(detector) = detector.filter(|_| enabled) else {
        return Vec::new();
    };
    match detector.detect(frame, min_confidence) {
        Ok(detections) => detections,
        Err(e) => {
            tracing::warn!(detector = detector.name(), error = %e, "Detection failed");
            Vec::new()
        }
    }
}
