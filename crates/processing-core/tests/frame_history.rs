use chrono::Utc;

use camguide_detection_model::{BoundingBox, Detection, HistoryEvent};
use camguide_processing_core::{analyze_frame, HistoryBuffer, RenderMode};

// 2024-01-02T03:04:05.678Z
const T0: f64 = 1_704_164_645.678;

fn record(history: &mut HistoryBuffer, timestamp: f64, materials: &[Detection], faces: &[Detection]) {
    let analysis = analyze_frame(materials, faces, 640, 480, 15.0);
    if let Some(event) = HistoryEvent::from_analysis(timestamp, &analysis) {
        history.append(event);
    }
}

#[test]
fn frames_without_detections_are_not_recorded() {
    let mut history = HistoryBuffer::new();
    record(&mut history, T0, &[], &[]);
    record(&mut history, T0 + 1.0, &[], &[]);
    assert!(history.is_empty());
}

#[test]
fn compact_history_tracks_the_primary_material() {
    let mut history = HistoryBuffer::new();
    let faces = [
        Detection::face(BoundingBox::new(10, 10, 40, 40)),
        Detection::face(BoundingBox::new(100, 10, 40, 40)),
    ];

    // Object right-down of center: center (420, 320), vector (100, 80).
    record(
        &mut history,
        T0,
        &[Detection::reading_material(BoundingBox::new(370, 270, 100, 100), 0.9)],
        &faces,
    );
    // Centered object.
    record(
        &mut history,
        T0 + 1.0,
        &[Detection::reading_material(BoundingBox::new(270, 190, 100, 100), 0.8)],
        &[],
    );
    // Faces only.
    record(&mut history, T0 + 2.0, &[], &faces[..1]);

    let lines = history.render_in(RenderMode::Compact, &Utc);
    assert_eq!(
        lines,
        vec![
            "[03:04:05.678] M:1 F:2 R:MOVE_RIGHT_DOWN(128px)",
            "[03:04:06.678] M:1 F:0 R:HOLD(0px)",
            "[03:04:07.678] M:0 F:1",
        ]
    );
}

#[test]
fn detailed_history_marks_centered_materials() {
    let mut history = HistoryBuffer::new();
    record(
        &mut history,
        T0,
        &[
            Detection::reading_material(BoundingBox::new(270, 190, 100, 100), 0.5),
            Detection::reading_material(BoundingBox::new(0, 0, 50, 50), 0.25),
        ],
        &[],
    );

    let lines = history.render_in(RenderMode::Detailed, &Utc);
    assert_eq!(lines[0], "[03:04:05.678] === DETECTION EVENT ===");
    assert_eq!(lines[1], "READING MATERIALS: 2 detected");
    assert_eq!(
        lines[2],
        "  - Material 1: pos=(270,190) size=(100x100) conf=50.0% CENTERED"
    );
    assert_eq!(
        lines[3],
        "  - Material 2: pos=(0,0) size=(50x50) conf=25.0% NOT CENTERED"
    );
    assert_eq!(lines[4], "FACES: 0 detected");
    assert_eq!(lines[5], "ROBOT: HOLD | magnitude=0.0px | vector=(0,0)");
    assert_eq!(lines[6], "FRAME: center=(320,240) threshold=72px");
    assert_eq!(lines[7], "=".repeat(60));
    assert_eq!(lines.len(), 8);
}
