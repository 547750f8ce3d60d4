//! Detector output types.
//!
//! A detector turns one frame into zero or more [`Detection`]s. Boxes are
//! serialized as `[x, y, width, height]` arrays, matching the export schema.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32, u32, u32)", into = "(i32, i32, u32, u32)")]
pub struct BoundingBox {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates, truncating to whole pixels the way
    /// detector outputs are reported.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));
        Self {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        }
    }

    /// Exact center point using integer halving.
    ///
    /// Computed in `i64`, so any box is representable.
    pub fn center_wide(&self) -> (i64, i64) {
        (
            self.x as i64 + (self.width / 2) as i64,
            self.y as i64 + (self.height / 2) as i64,
        )
    }

    /// Center point, or `None` when it falls outside the `i32` range.
    pub fn checked_center(&self) -> Option<(i32, i32)> {
        let (cx, cy) = self.center_wide();
        Some((i32::try_from(cx).ok()?, i32::try_from(cy).ok()?))
    }

    /// Center point clamped to the `i32` range.
    pub fn center(&self) -> (i32, i32) {
        let (cx, cy) = self.center_wide();
        (clamp_i32(cx), clamp_i32(cy))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the box has a positive width and height.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl From<(i32, i32, u32, u32)> for BoundingBox {
    fn from((x, y, width, height): (i32, i32, u32, u32)) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for (i32, i32, u32, u32) {
    fn from(b: BoundingBox) -> Self {
        (b.x, b.y, b.width, b.height)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pos=({},{}) size=({}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Which detector produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionLabel {
    Face,
    ReadingMaterial,
}

impl DetectionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Face => "face",
            Self::ReadingMaterial => "reading_material",
        }
    }
}

impl fmt::Display for DetectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detector hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,

    /// Detector confidence in `[0.0, 1.0]`. Cascade detectors report 1.0.
    pub confidence: f64,

    pub label: DetectionLabel,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64, label: DetectionLabel) -> Self {
        Self {
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
            label,
        }
    }

    pub fn face(bbox: BoundingBox) -> Self {
        Self::new(bbox, 1.0, DetectionLabel::Face)
    }

    pub fn reading_material(bbox: BoundingBox, confidence: f64) -> Self {
        Self::new(bbox, confidence, DetectionLabel::ReadingMaterial)
    }
}
