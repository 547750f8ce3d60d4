//! Per-frame analysis records and robot guidance.
//!
//! A [`FrameAnalysis`] is what one processed frame contributes to the
//! front-end: the reading materials with their centering state, the faces
//! with per-frame ordinals, the frame positioning, and the guidance derived
//! from the primary material. Its JSON form is the `detection_data` object of
//! the export envelope.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::detection::BoundingBox;

/// Discrete movement instruction derived from the guidance vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RobotCommand {
    /// Object is centered; no movement needed.
    Hold,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MoveLeftUp,
    MoveLeftDown,
    MoveRightUp,
    MoveRightDown,
}

impl RobotCommand {
    pub const ALL: [RobotCommand; 9] = [
        Self::Hold,
        Self::MoveLeft,
        Self::MoveRight,
        Self::MoveUp,
        Self::MoveDown,
        Self::MoveLeftUp,
        Self::MoveLeftDown,
        Self::MoveRightUp,
        Self::MoveRightDown,
    ];

    /// Combine the signs of an offset into a command.
    ///
    /// Negative `dx` is left, negative `dy` is up. A zero axis contributes
    /// nothing, so `(0, 0)` maps to [`RobotCommand::Hold`].
    pub fn from_offset(dx: i32, dy: i32) -> Self {
        use std::cmp::Ordering::*;
        match (dx.cmp(&0), dy.cmp(&0)) {
            (Equal, Equal) => Self::Hold,
            (Less, Equal) => Self::MoveLeft,
            (Greater, Equal) => Self::MoveRight,
            (Equal, Less) => Self::MoveUp,
            (Equal, Greater) => Self::MoveDown,
            (Less, Less) => Self::MoveLeftUp,
            (Less, Greater) => Self::MoveLeftDown,
            (Greater, Less) => Self::MoveRightUp,
            (Greater, Greater) => Self::MoveRightDown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "HOLD",
            Self::MoveLeft => "MOVE_LEFT",
            Self::MoveRight => "MOVE_RIGHT",
            Self::MoveUp => "MOVE_UP",
            Self::MoveDown => "MOVE_DOWN",
            Self::MoveLeftUp => "MOVE_LEFT_UP",
            Self::MoveLeftDown => "MOVE_LEFT_DOWN",
            Self::MoveRightUp => "MOVE_RIGHT_UP",
            Self::MoveRightDown => "MOVE_RIGHT_DOWN",
        }
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Displacement from frame center to the primary object center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuidanceResult {
    /// Horizontal offset in pixels, positive when the object is right of center.
    pub arrow_dx: i32,
    /// Vertical offset in pixels, positive when the object is below center.
    pub arrow_dy: i32,
    /// Euclidean length of the offset.
    pub movement_magnitude: f64,
    pub robot_command: RobotCommand,
}

impl GuidanceResult {
    pub fn is_centered(&self) -> bool {
        self.robot_command == RobotCommand::Hold
    }
}

/// A reading material detection with its centering state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialReport {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub bbox_center_x: i32,
    pub bbox_center_y: i32,
    pub is_centered: bool,
}

/// A face detection with its 1-based ordinal within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceReport {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub face_id: u32,
}

/// Frame geometry used for centering decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePositioning {
    pub img_center_x: i32,
    pub img_center_y: i32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub center_threshold_px: f64,
    pub center_threshold_percent: f64,
    /// Distance of the primary material from center, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_center: Option<f64>,
}

/// Everything derived from one processed frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    #[serde(default)]
    pub reading_materials: Vec<MaterialReport>,

    #[serde(default)]
    pub faces: Vec<FaceReport>,

    #[serde(default)]
    pub face_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positioning: Option<FramePositioning>,

    /// Serialized as `{}` when no guidance exists.
    #[serde(default, with = "empty_object_as_none")]
    pub robot_guidance: Option<GuidanceResult>,
}

impl FrameAnalysis {
    /// Whether the frame produced anything worth recording.
    pub fn has_content(&self) -> bool {
        !self.reading_materials.is_empty()
            || !self.faces.is_empty()
            || self.robot_guidance.is_some()
    }
}

/// Serde adapter mapping `None` to `{}` and `{}`/`null` back to `None`.
mod empty_object_as_none {
    use super::*;
    use serde::ser::SerializeMap;

    pub fn serialize<S>(value: &Option<GuidanceResult>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(guidance) => guidance.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<GuidanceResult>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Guidance(GuidanceResult),
            Empty(BTreeMap<String, IgnoredAny>),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            Some(Repr::Guidance(guidance)) => Some(guidance),
            Some(Repr::Empty(_)) | None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_offset_covers_all_quadrants() {
        assert_eq!(RobotCommand::from_offset(0, 0), RobotCommand::Hold);
        assert_eq!(RobotCommand::from_offset(-5, 0), RobotCommand::MoveLeft);
        assert_eq!(RobotCommand::from_offset(5, 0), RobotCommand::MoveRight);
        assert_eq!(RobotCommand::from_offset(0, -5), RobotCommand::MoveUp);
        assert_eq!(RobotCommand::from_offset(0, 5), RobotCommand::MoveDown);
        assert_eq!(RobotCommand::from_offset(-1, -1), RobotCommand::MoveLeftUp);
        assert_eq!(RobotCommand::from_offset(-1, 1), RobotCommand::MoveLeftDown);
        assert_eq!(RobotCommand::from_offset(1, -1), RobotCommand::MoveRightUp);
        assert_eq!(RobotCommand::from_offset(1, 1), RobotCommand::MoveRightDown);
    }

    #[test]
    fn test_command_serde_names_match_display() {
        for command in RobotCommand::ALL {
            let json = serde_json::to_string(&command).unwrap();
            assert_eq!(json, format!("\"{}\"", command.as_str()));
        }
    }

    #[test]
    fn test_missing_guidance_serializes_as_empty_object() {
        let analysis = FrameAnalysis::default();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["robot_guidance"], serde_json::json!({}));
        assert_eq!(json["reading_materials"], serde_json::json!([]));
        assert!(json.get("positioning").is_none());

        let parsed: FrameAnalysis = serde_json::from_value(json).unwrap();
        assert!(parsed.robot_guidance.is_none());
    }

    #[test]
    fn test_guidance_object_parses() {
        let json = r#"{
            "reading_materials": [],
            "faces": [{"box": [1, 2, 3, 4], "face_id": 1}],
            "robot_guidance": {
                "arrow_dx": -100,
                "arrow_dy": -80,
                "movement_magnitude": 128.06,
                "robot_command": "MOVE_LEFT_UP"
            }
        }"#;
        let parsed: FrameAnalysis = serde_json::from_str(json).unwrap();
        let guidance = parsed.robot_guidance.unwrap();
        assert_eq!(guidance.robot_command, RobotCommand::MoveLeftUp);
        assert_eq!(guidance.arrow_dx, -100);
        assert_eq!(parsed.faces[0].face_id, 1);
        assert_eq!(parsed.face_count, 0);
    }

    #[test]
    fn test_null_guidance_parses_as_none() {
        let parsed: FrameAnalysis = serde_json::from_str(r#"{"robot_guidance": null}"#).unwrap();
        assert!(parsed.robot_guidance.is_none());
        assert!(!parsed.has_content());
    }
}
