//! Arrow geometry for the preview and guidance panels.
//!
//! Front-ends draw these; this module only computes endpoints.

use serde::{Deserialize, Serialize};

use camguide_detection_model::{FramePositioning, MaterialReport};

/// Longest preview arrow, in frame pixels.
pub const MAX_PREVIEW_ARROW_PX: f64 = 50.0;

/// Fraction of the smaller canvas side used by the movement indicator.
const INDICATOR_SCALE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrow {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

/// Arrow from a non-centered material toward the frame center.
///
/// Length is half the distance, capped at [`MAX_PREVIEW_ARROW_PX`]. `None`
/// when the material is centered or sits exactly on the center.
pub fn preview_arrow(material: &MaterialReport, positioning: &FramePositioning) -> Option<Arrow> {
    if material.is_centered {
        return None;
    }
    let dx = positioning.img_center_x as f64 - material.bbox_center_x as f64;
    let dy = positioning.img_center_y as f64 - material.bbox_center_y as f64;
    let length = dx.hypot(dy);
    if length == 0.0 {
        return None;
    }
    let scale = MAX_PREVIEW_ARROW_PX.min(length / 2.0);
    let step_x = (dx / length * scale) as i32;
    let step_y = (dy / length * scale) as i32;
    let start = (material.bbox_center_x, material.bbox_center_y);
    Some(Arrow {
        start,
        end: (start.0.saturating_add(step_x), start.1.saturating_add(step_y)),
    })
}

/// Scaled guidance arrow drawn from the canvas center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementIndicator {
    pub center: (i32, i32),
    /// Arrow tip; absent when centered.
    pub tip: Option<(f64, f64)>,
    /// `LEFT`/`RIGHT` followed by `UP`/`DOWN`, or `CENTERED`.
    pub direction: String,
}

impl MovementIndicator {
    pub fn is_centered(&self) -> bool {
        self.tip.is_none()
    }
}

pub fn movement_indicator(dx: i32, dy: i32, canvas_width: u32, canvas_height: u32) -> MovementIndicator {
    let center = ((canvas_width / 2) as i32, (canvas_height / 2) as i32);
    if dx == 0 && dy == 0 {
        return MovementIndicator {
            center,
            tip: None,
            direction: "CENTERED".to_string(),
        };
    }

    let longest = dx.unsigned_abs().max(dy.unsigned_abs()).max(1) as f64;
    let scale = canvas_width.min(canvas_height) as f64 * INDICATOR_SCALE / longest;
    let tip = (
        center.0 as f64 + dx as f64 * scale,
        center.1 as f64 + dy as f64 * scale,
    );

    let horizontal = match dx.signum() {
        1 => Some("RIGHT"),
        -1 => Some("LEFT"),
        _ => None,
    };
    let vertical = match dy.signum() {
        1 => Some("DOWN"),
        -1 => Some("UP"),
        _ => None,
    };
    let direction = [horizontal, vertical]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    MovementIndicator {
        center,
        tip: Some(tip),
        direction,
    }
}

#[cfg(test)]
mod tests {
    use camguide_detection_model::BoundingBox;

    use super::*;

    fn positioning() -> FramePositioning {
        FramePositioning {
            img_center_x: 320,
            img_center_y: 240,
            frame_width: 640,
            frame_height: 480,
            center_threshold_px: 72.0,
            center_threshold_percent: 15.0,
            distance_from_center: None,
        }
    }

    fn material(cx: i32, cy: i32, is_centered: bool) -> MaterialReport {
        MaterialReport {
            bbox: BoundingBox::new(cx - 50, cy - 50, 100, 100),
            confidence: 0.8,
            bbox_center_x: cx,
            bbox_center_y: cy,
            is_centered,
        }
    }

    #[test]
    fn test_preview_arrow_capped_at_fifty() {
        // Offset (300, 400) has length 500; the arrow is capped at 50.
        let arrow = preview_arrow(&material(20, -160, false), &positioning()).unwrap();
        assert_eq!(arrow.start, (20, -160));
        assert_eq!(arrow.end, (20 + 30, -160 + 40));
    }

    #[test]
    fn test_short_preview_arrow_is_half_distance() {
        // 60 px left of center: arrow of 30 px pointing right.
        let arrow = preview_arrow(&material(260, 240, false), &positioning()).unwrap();
        assert_eq!(arrow.end, (290, 240));
    }

    #[test]
    fn test_no_preview_arrow_when_centered() {
        assert!(preview_arrow(&material(300, 240, true), &positioning()).is_none());
        assert!(preview_arrow(&material(320, 240, false), &positioning()).is_none());
    }

    #[test]
    fn test_indicator_scaling_and_text() {
        let indicator = movement_indicator(-100, -50, 300, 150);
        assert_eq!(indicator.center, (150, 75));
        // scale = 150 * 0.3 / 100 = 0.45
        let (tx, ty) = indicator.tip.unwrap();
        assert!((tx - 105.0).abs() < 1e-9);
        assert!((ty - 52.5).abs() < 1e-9);
        assert_eq!(indicator.direction, "LEFT UP");

        assert_eq!(movement_indicator(0, 30, 300, 150).direction, "DOWN");
        assert_eq!(movement_indicator(5, 0, 300, 150).direction, "RIGHT");
    }

    #[test]
    fn test_indicator_centered() {
        let indicator = movement_indicator(0, 0, 300, 150);
        assert!(indicator.is_centered());
        assert_eq!(indicator.direction, "CENTERED");
    }
}
