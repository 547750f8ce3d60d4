//! Robot guidance from the primary reading material.
//!
//! The guidance vector points from the frame center to the center of the
//! primary detection. Centers use integer halving, so the vector is whole
//! pixels and a zero component is exact.

use camguide_common::{GuideError, GuideResult};
use camguide_detection_model::{BoundingBox, Detection, DetectionLabel, GuidanceResult, RobotCommand};

/// Integer center of a `width` x `height` frame.
pub fn frame_center(frame_width: u32, frame_height: u32) -> (i32, i32) {
    ((frame_width / 2) as i32, (frame_height / 2) as i32)
}

/// Centering radius in pixels: a percentage of the smaller frame dimension.
pub fn threshold_px(frame_width: u32, frame_height: u32, center_threshold_percent: f64) -> f64 {
    frame_width.min(frame_height) as f64 * center_threshold_percent / 100.0
}

/// Offset from the frame center to the box center, computed without
/// overflow for any box.
pub fn offset_from_center(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> (i64, i64) {
    let (cx, cy) = bbox.center_wide();
    let (fx, fy) = frame_center(frame_width, frame_height);
    (cx - fx as i64, cy - fy as i64)
}

/// Reject geometry that cannot produce a meaningful vector.
pub fn validate_geometry(
    frame_width: u32,
    frame_height: u32,
    center_threshold_percent: f64,
) -> GuideResult<()> {
    if frame_width == 0 || frame_height == 0 {
        return Err(GuideError::invalid_input(format!(
            "frame dimensions must be positive, got {frame_width}x{frame_height}"
        )));
    }
    if !center_threshold_percent.is_finite()
        || center_threshold_percent <= 0.0
        || center_threshold_percent > 100.0
    {
        return Err(GuideError::invalid_input(format!(
            "center threshold must be in (0, 100], got {center_threshold_percent}"
        )));
    }
    Ok(())
}

/// Compute the guidance vector and command for `primary`.
pub fn compute_guidance(
    primary: &BoundingBox,
    frame_width: u32,
    frame_height: u32,
    center_threshold_percent: f64,
) -> GuideResult<GuidanceResult> {
    validate_geometry(frame_width, frame_height, center_threshold_percent)?;
    if primary.is_empty() {
        return Err(GuideError::invalid_input(format!(
            "primary box must have a positive size, got {}x{}",
            primary.width, primary.height
        )));
    }

    let (arrow_dx, arrow_dy) = offset_from_center(primary, frame_width, frame_height);
    let (Ok(arrow_dx), Ok(arrow_dy)) = (i32::try_from(arrow_dx), i32::try_from(arrow_dy)) else {
        return Err(GuideError::invalid_input(format!(
            "offset ({arrow_dx}, {arrow_dy}) of box {primary} is out of range"
        )));
    };
    let movement_magnitude = (arrow_dx as f64).hypot(arrow_dy as f64);

    let threshold = threshold_px(frame_width, frame_height, center_threshold_percent);
    let robot_command = if movement_magnitude <= threshold {
        RobotCommand::Hold
    } else {
        RobotCommand::from_offset(arrow_dx, arrow_dy)
    };

    Ok(GuidanceResult {
        arrow_dx,
        arrow_dy,
        movement_magnitude,
        robot_command,
    })
}

/// Highest-confidence reading material; ties keep the earliest.
pub fn select_primary(detections: &[Detection]) -> Option<&Detection> {
    detections
        .iter()
        .filter(|d| d.label == DetectionLabel::ReadingMaterial)
        .fold(None, |best: Option<&Detection>, d| match best {
            Some(b) if d.confidence <= b.confidence => Some(b),
            _ => Some(d),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_left_object_moves_left_up() {
        let g = compute_guidance(&BoundingBox::new(170, 110, 100, 100), 640, 480, 15.0).unwrap();
        assert_eq!((g.arrow_dx, g.arrow_dy), (-100, -80));
        assert!((g.movement_magnitude - 128.0625).abs() < 0.01);
        assert_eq!(g.robot_command, RobotCommand::MoveLeftUp);
    }

    #[test]
    fn test_centered_object_holds() {
        let g = compute_guidance(&BoundingBox::new(270, 190, 100, 100), 640, 480, 15.0).unwrap();
        assert_eq!((g.arrow_dx, g.arrow_dy), (0, 0));
        assert_eq!(g.movement_magnitude, 0.0);
        assert!(g.is_centered());
    }

    #[test]
    fn test_magnitude_equal_to_threshold_is_centered() {
        // threshold = 480 * 15 / 100 = 72; center (392, 240) is exactly 72 px right.
        let g = compute_guidance(&BoundingBox::new(342, 190, 100, 100), 640, 480, 15.0).unwrap();
        assert_eq!(g.arrow_dx, 72);
        assert_eq!(g.robot_command, RobotCommand::Hold);

        let g = compute_guidance(&BoundingBox::new(343, 190, 100, 100), 640, 480, 15.0).unwrap();
        assert_eq!(g.robot_command, RobotCommand::MoveRight);
    }

    #[test]
    fn test_single_axis_offsets() {
        let down = compute_guidance(&BoundingBox::new(270, 380, 100, 100), 640, 480, 10.0).unwrap();
        assert_eq!(down.arrow_dx, 0);
        assert_eq!(down.robot_command, RobotCommand::MoveDown);

        let left = compute_guidance(&BoundingBox::new(0, 190, 100, 100), 640, 480, 10.0).unwrap();
        assert_eq!(left.arrow_dy, 0);
        assert_eq!(left.robot_command, RobotCommand::MoveLeft);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let b = BoundingBox::new(0, 0, 10, 10);
        assert!(compute_guidance(&b, 0, 480, 15.0).is_err());
        assert!(compute_guidance(&b, 640, 0, 15.0).is_err());
        assert!(compute_guidance(&b, 640, 480, 0.0).is_err());
        assert!(compute_guidance(&b, 640, 480, 100.5).is_err());
        assert!(compute_guidance(&b, 640, 480, f64::NAN).is_err());
        assert!(compute_guidance(&BoundingBox::new(0, 0, 0, 10), 640, 480, 15.0).is_err());
        assert!(compute_guidance(&b, 640, 480, 100.0).is_ok());
    }

    #[test]
    fn test_far_boxes_are_rejected_without_overflow() {
        let err = compute_guidance(&BoundingBox::new(2_147_483_000, 0, 2000, 10), 640, 480, 15.0)
            .unwrap_err();
        assert!(matches!(err, GuideError::InvalidInput { .. }));

        let err = compute_guidance(&BoundingBox::new(i32::MIN + 10, 0, 2, 2), 640, 480, 15.0)
            .unwrap_err();
        assert!(matches!(err, GuideError::InvalidInput { .. }));

        // Far but representable offsets still produce a command.
        let g = compute_guidance(&BoundingBox::new(i32::MAX - 400, 0, 2, 2), 640, 480, 15.0)
            .unwrap();
        assert_eq!(g.arrow_dx, i32::MAX - 399 - 320);
        assert_eq!(g.robot_command, RobotCommand::MoveRightUp);
    }

    #[test]
    fn test_primary_is_highest_confidence() {
        let detections = vec![
            Detection::reading_material(BoundingBox::new(0, 0, 10, 10), 0.6),
            Detection::reading_material(BoundingBox::new(1, 1, 10, 10), 0.9),
            Detection::reading_material(BoundingBox::new(2, 2, 10, 10), 0.9),
            Detection::face(BoundingBox::new(3, 3, 10, 10)),
        ];
        let primary = select_primary(&detections).unwrap();
        assert_eq!(primary.bbox.x, 1);
    }

    #[test]
    fn test_primary_ignores_faces() {
        let detections = vec![Detection::face(BoundingBox::new(3, 3, 10, 10))];
        assert!(select_primary(&detections).is_none());
        assert!(select_primary(&[]).is_none());
    }
}
