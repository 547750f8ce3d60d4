//! Per-frame analysis.
//!
//! Combines the raw face and material detections of one frame into the
//! record published to the front-end and appended to history.

use camguide_detection_model::{
    Detection, FaceReport, FrameAnalysis, FramePositioning, MaterialReport,
};

use crate::guidance::{
    compute_guidance, frame_center, offset_from_center, select_primary, threshold_px,
};

/// Build the analysis for one frame.
///
/// Guidance is computed from the primary material. Invalid geometry is
/// logged and leaves guidance empty rather than failing the frame.
pub fn analyze_frame(
    materials: &[Detection],
    faces: &[Detection],
    frame_width: u32,
    frame_height: u32,
    center_threshold_percent: f64,
) -> FrameAnalysis {
    let (fx, fy) = frame_center(frame_width, frame_height);
    let threshold = threshold_px(frame_width, frame_height, center_threshold_percent);

    let reading_materials: Vec<MaterialReport> = materials
        .iter()
        .map(|d| {
            let (cx, cy) = d.bbox.center();
            let (dx, dy) = offset_from_center(&d.bbox, frame_width, frame_height);
            let distance = (dx as f64).hypot(dy as f64);
            MaterialReport {
                bbox: d.bbox,
                confidence: d.confidence,
                bbox_center_x: cx,
                bbox_center_y: cy,
                is_centered: distance <= threshold,
            }
        })
        .collect();

    let faces: Vec<FaceReport> = faces
        .iter()
        .zip(1u32..)
        .map(|(d, face_id)| FaceReport {
            bbox: d.bbox,
            face_id,
        })
        .collect();

    let robot_guidance = select_primary(materials).and_then(|primary| {
        compute_guidance(
            &primary.bbox,
            frame_width,
            frame_height,
            center_threshold_percent,
        )
        .map_err(|e| tracing::warn!(error = %e, "Skipping guidance for frame"))
        .ok()
    });

    let positioning = FramePositioning {
        img_center_x: fx,
        img_center_y: fy,
        frame_width,
        frame_height,
        center_threshold_px: threshold,
        center_threshold_percent,
        distance_from_center: robot_guidance.map(|g| g.movement_magnitude),
    };

    FrameAnalysis {
        face_count: faces.len(),
        reading_materials,
        faces,
        positioning: Some(positioning),
        robot_guidance,
    }
}

#[cfg(test)]
mod tests {
    use camguide_detection_model::{BoundingBox, RobotCommand};

    use super::*;

    #[test]
    fn test_materials_get_centers_and_flags() {
        let materials = vec![
            Detection::reading_material(BoundingBox::new(170, 110, 100, 100), 0.7),
            Detection::reading_material(BoundingBox::new(270, 190, 100, 100), 0.6),
        ];
        let analysis = analyze_frame(&materials, &[], 640, 480, 15.0);

        assert_eq!(analysis.reading_materials.len(), 2);
        let first = &analysis.reading_materials[0];
        assert_eq!((first.bbox_center_x, first.bbox_center_y), (220, 160));
        assert!(!first.is_centered);
        assert!(analysis.reading_materials[1].is_centered);

        let guidance = analysis.robot_guidance.unwrap();
        assert_eq!(guidance.robot_command, RobotCommand::MoveLeftUp);

        let positioning = analysis.positioning.unwrap();
        assert_eq!((positioning.img_center_x, positioning.img_center_y), (320, 240));
        assert_eq!(positioning.center_threshold_px, 72.0);
        assert_eq!(positioning.distance_from_center, Some(guidance.movement_magnitude));
    }

    #[test]
    fn test_faces_numbered_from_one() {
        let faces = vec![
            Detection::face(BoundingBox::new(0, 0, 10, 10)),
            Detection::face(BoundingBox::new(20, 0, 10, 10)),
            Detection::face(BoundingBox::new(40, 0, 10, 10)),
        ];
        let analysis = analyze_frame(&[], &faces, 640, 480, 15.0);
        let ids: Vec<u32> = analysis.faces.iter().map(|f| f.face_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(analysis.face_count, 3);
        assert!(analysis.robot_guidance.is_none());
        assert_eq!(analysis.positioning.unwrap().distance_from_center, None);
    }

    #[test]
    fn test_primary_drives_guidance() {
        let materials = vec![
            Detection::reading_material(BoundingBox::new(0, 0, 40, 40), 0.55),
            Detection::reading_material(BoundingBox::new(540, 380, 100, 100), 0.95),
        ];
        let analysis = analyze_frame(&materials, &[], 640, 480, 15.0);
        let guidance = analysis.robot_guidance.unwrap();
        assert_eq!((guidance.arrow_dx, guidance.arrow_dy), (270, 190));
        assert_eq!(guidance.robot_command, RobotCommand::MoveRightDown);
    }

    #[test]
    fn test_degenerate_primary_has_no_guidance() {
        let materials = vec![Detection::reading_material(BoundingBox::new(10, 10, 0, 30), 0.9)];
        let analysis = analyze_frame(&materials, &[], 640, 480, 15.0);
        assert_eq!(analysis.reading_materials.len(), 1);
        assert!(analysis.robot_guidance.is_none());
    }

    #[test]
    fn test_far_primary_is_reported_without_guidance() {
        let materials = vec![Detection::reading_material(
            BoundingBox::new(i32::MIN + 10, 0, 2, 2),
            0.9,
        )];
        let analysis = analyze_frame(&materials, &[], 640, 480, 15.0);
        let report = &analysis.reading_materials[0];
        assert_eq!(report.bbox_center_x, i32::MIN + 11);
        assert!(!report.is_centered);
        assert!(analysis.robot_guidance.is_none());

        let preview = crate::overlay::preview_arrow(report, analysis.positioning.as_ref().unwrap());
        assert!(preview.is_some());
    }

    #[test]
    fn test_empty_frame() {
        let analysis = analyze_frame(&[], &[], 640, 480, 15.0);
        assert!(!analysis.has_content());
        assert!(analysis.positioning.is_some());
    }
}
