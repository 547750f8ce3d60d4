//! Export formats for detection data.
//!
//! The JSON form wraps a [`FrameAnalysis`] in a [`DetectionExport`] envelope
//! that also records service state. Materials and faces additionally have a
//! flat CSV table.

use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::{FaceReport, FrameAnalysis, MaterialReport};

pub const MATERIALS_CSV_HEADER: &str = "Material_ID,Confidence,X,Y,Width,Height,Centered";
pub const FACES_CSV_HEADER: &str = "Face_ID,X,Y,Width,Height";

/// Errors produced while reading or writing exports.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid export file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Data type '{data_type}' has no CSV form")]
    Unsupported { data_type: ExportDataType },

    #[error("Unknown export data type: {0}")]
    UnknownDataType(String),
}

/// What a user asked to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportDataType {
    Materials,
    Faces,
    Guidance,
    Session,
}

impl ExportDataType {
    pub const ALL: [ExportDataType; 4] = [
        Self::Materials,
        Self::Faces,
        Self::Guidance,
        Self::Session,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Faces => "faces",
            Self::Guidance => "guidance",
            Self::Session => "session",
        }
    }

    pub fn has_csv(&self) -> bool {
        matches!(self, Self::Materials | Self::Faces)
    }
}

impl fmt::Display for ExportDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportDataType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ExportError::UnknownDataType(s.to_string()))
    }
}

/// JSON export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionExport {
    /// Export time, RFC 3339.
    pub timestamp: String,
    pub data_type: ExportDataType,
    pub detection_data: FrameAnalysis,
    pub session_active: bool,
    pub camera_running: bool,
}

impl DetectionExport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), ExportError> {
        let json = self.to_json().map_err(|source| ExportError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        write_text(path, &json)
    }

    pub fn read_file(path: &Path) -> Result<Self, ExportError> {
        let json = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| ExportError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Materials table, ids 1-based in detection order.
pub fn materials_csv(materials: &[MaterialReport]) -> String {
    let mut out = String::from(MATERIALS_CSV_HEADER);
    out.push('\n');
    for (i, m) in materials.iter().enumerate() {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            i + 1,
            m.confidence,
            m.bbox.x,
            m.bbox.y,
            m.bbox.width,
            m.bbox.height,
            m.is_centered
        );
    }
    out
}

pub fn faces_csv(faces: &[FaceReport]) -> String {
    let mut out = String::from(FACES_CSV_HEADER);
    out.push('\n');
    for f in faces {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            f.face_id, f.bbox.x, f.bbox.y, f.bbox.width, f.bbox.height
        );
    }
    out
}

/// CSV text for `data_type`, rejecting types without a table form.
pub fn csv_for(analysis: &FrameAnalysis, data_type: ExportDataType) -> Result<String, ExportError> {
    match data_type {
        ExportDataType::Materials => Ok(materials_csv(&analysis.reading_materials)),
        ExportDataType::Faces => Ok(faces_csv(&analysis.faces)),
        other => Err(ExportError::Unsupported { data_type: other }),
    }
}

pub fn write_csv(
    analysis: &FrameAnalysis,
    data_type: ExportDataType,
    path: &Path,
) -> Result<(), ExportError> {
    let csv = csv_for(analysis, data_type)?;
    write_text(path, &csv)
}

fn write_text(path: &Path, content: &str) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GuidanceResult, RobotCommand};
    use crate::detection::BoundingBox;

    fn analysis() -> FrameAnalysis {
        FrameAnalysis {
            reading_materials: vec![
                MaterialReport {
                    bbox: BoundingBox::new(10, 20, 100, 50),
                    confidence: 0.75,
                    bbox_center_x: 60,
                    bbox_center_y: 45,
                    is_centered: false,
                },
                MaterialReport {
                    bbox: BoundingBox::new(270, 190, 100, 100),
                    confidence: 0.5,
                    bbox_center_x: 320,
                    bbox_center_y: 240,
                    is_centered: true,
                },
            ],
            faces: vec![FaceReport {
                bbox: BoundingBox::new(5, 6, 7, 8),
                face_id: 1,
            }],
            face_count: 1,
            positioning: None,
            robot_guidance: Some(GuidanceResult {
                arrow_dx: -260,
                arrow_dy: -195,
                movement_magnitude: 325.0,
                robot_command: RobotCommand::MoveLeftUp,
            }),
        }
    }

    #[test]
    fn test_materials_csv_rows() {
        let csv = materials_csv(&analysis().reading_materials);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], MATERIALS_CSV_HEADER);
        assert_eq!(lines[1], "1,0.75,10,20,100,50,false");
        assert_eq!(lines[2], "2,0.5,270,190,100,100,true");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_faces_csv_rows() {
        let csv = faces_csv(&analysis().faces);
        assert_eq!(csv, "Face_ID,X,Y,Width,Height\n1,5,6,7,8\n");
    }

    #[test]
    fn test_csv_rejects_guidance_and_session() {
        for data_type in [ExportDataType::Guidance, ExportDataType::Session] {
            let err = csv_for(&analysis(), data_type).unwrap_err();
            assert!(matches!(err, ExportError::Unsupported { .. }));
        }
    }

    #[test]
    fn test_data_type_parsing() {
        assert_eq!("faces".parse::<ExportDataType>().unwrap(), ExportDataType::Faces);
        assert_eq!(" Session ".parse::<ExportDataType>().unwrap(), ExportDataType::Session);
        assert!("pictures".parse::<ExportDataType>().is_err());
    }

    #[test]
    fn test_envelope_shape_and_reload() {
        let export = DetectionExport {
            timestamp: "2024-01-02T03:04:05+00:00".into(),
            data_type: ExportDataType::Guidance,
            detection_data: analysis(),
            session_active: true,
            camera_running: false,
        };
        let json = export.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["data_type"], "guidance");
        assert_eq!(value["detection_data"]["robot_guidance"]["robot_command"], "MOVE_LEFT_UP");
        assert_eq!(value["detection_data"]["reading_materials"][0]["box"], serde_json::json!([10, 20, 100, 50]));

        assert_eq!(DetectionExport::from_json(&json).unwrap(), export);
    }

    #[test]
    fn test_write_and_read_files() {
        let dir = std::env::temp_dir().join(format!("camguide_export_test_{}", std::process::id()));
        let json_path = dir.join("export.json");
        let csv_path = dir.join("materials.csv");

        let export = DetectionExport {
            timestamp: "2024-01-02T03:04:05+00:00".into(),
            data_type: ExportDataType::Materials,
            detection_data: analysis(),
            session_active: false,
            camera_running: true,
        };
        export.write_file(&json_path).unwrap();
        assert_eq!(DetectionExport::read_file(&json_path).unwrap(), export);

        write_csv(&export.detection_data, ExportDataType::Materials, &csv_path).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with(MATERIALS_CSV_HEADER));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = DetectionExport::read_file(Path::new("/nonexistent/camguide.json")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
