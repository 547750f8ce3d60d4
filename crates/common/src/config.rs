//! Application configuration.
//!
//! Configuration is built once at startup and then shared read-only. Values
//! are layered, later sources winning: built-in defaults, the JSON config
//! file, a `.env` file in the working directory, and finally the process
//! environment. Environment keys use `__` as the section delimiter, e.g.
//! `CAMERA__CENTER_THRESHOLD_PERCENT=20`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GuideError, GuideResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Camera, storage, and detector settings.
    pub camera: CameraConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Camera device selector: a numeric index or a device path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraDevice {
    Index(u32),
    Path(String),
}

impl Default for CameraDevice {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Path(path) => f.write_str(path),
        }
    }
}

impl FromStr for CameraDevice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<u32>() {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Path(trimmed.to_string()),
        })
    }
}

/// Camera capture and detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index or device path.
    pub device: CameraDevice,

    /// Seconds between processed frames.
    pub capture_interval: f64,

    /// JPEG quality (1-100) for saved frames.
    pub image_quality: u8,

    /// Directory for session captures.
    pub image_dir: PathBuf,

    /// Requested capture width in pixels.
    pub image_width: u32,

    /// Requested capture height in pixels.
    pub image_height: u32,

    /// Directory containing detection models.
    pub models_dir: PathBuf,

    /// Face cascade filename inside `models_dir`.
    pub face_cascade_file: String,

    /// Reading material model filename inside `models_dir`.
    pub reading_material_model: String,

    pub face_detection_enabled: bool,

    pub reading_material_detection_enabled: bool,

    /// Minimum detector confidence (0.0-1.0).
    pub detection_confidence: f32,

    /// Prefer the NCNN export of the reading material model.
    pub use_ncnn: bool,

    /// Centering threshold as a percentage of the smaller frame dimension.
    pub center_threshold_percent: f64,

    /// Number of events kept in the detection history.
    pub history_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "camguide=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: CameraDevice::default(),
            capture_interval: 1.0,
            image_quality: 95,
            image_dir: PathBuf::from("logs/camera_captures"),
            image_width: 640,
            image_height: 480,
            models_dir: PathBuf::from("models/cv"),
            face_cascade_file: "haarcascade_frontalface_default.xml".to_string(),
            reading_material_model: "read_material-yolo11n-best.pt".to_string(),
            face_detection_enabled: true,
            reading_material_detection_enabled: true,
            detection_confidence: 0.5,
            use_ncnn: false,
            center_threshold_percent: 15.0,
            history_capacity: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl CameraConfig {
    /// Full path of the face cascade file.
    pub fn face_cascade_path(&self) -> PathBuf {
        self.models_dir.join(&self.face_cascade_file)
    }

    /// Full path of the reading material model file.
    pub fn reading_material_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.reading_material_model)
    }

    /// Directory holding the NCNN export of the reading material model.
    pub fn ncnn_model_dir(&self) -> PathBuf {
        let stem = Path::new(&self.reading_material_model)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.reading_material_model.clone());
        self.models_dir.join(format!("{stem}_ncnn_model"))
    }

    /// Check ranges and that every enabled detector has its model on disk.
    pub fn validate(&self) -> GuideResult<()> {
        self.validate_ranges()?;
        self.validate_models()
    }

    /// Check that every setting is within its allowed range.
    pub fn validate_ranges(&self) -> GuideResult<()> {
        if !(self.capture_interval.is_finite() && self.capture_interval > 0.0) {
            return Err(GuideError::config(format!(
                "capture_interval must be positive, got {}",
                self.capture_interval
            )));
        }
        if !(1..=100).contains(&self.image_quality) {
            return Err(GuideError::config(format!(
                "image_quality must be within 1-100, got {}",
                self.image_quality
            )));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(GuideError::config(format!(
                "image dimensions must be positive, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(GuideError::config(format!(
                "detection_confidence must be within 0.0-1.0, got {}",
                self.detection_confidence
            )));
        }
        if !(self.center_threshold_percent > 0.0 && self.center_threshold_percent <= 100.0) {
            return Err(GuideError::config(format!(
                "center_threshold_percent must be within (0, 100], got {}",
                self.center_threshold_percent
            )));
        }
        if self.history_capacity == 0 {
            return Err(GuideError::config("history_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Check that every enabled detector has its model on disk.
    pub fn validate_models(&self) -> GuideResult<()> {
        if self.face_detection_enabled {
            let path = self.face_cascade_path();
            if !path.exists() {
                return Err(GuideError::config(format!(
                    "face detection is enabled but the cascade file {} does not exist",
                    path.display()
                )));
            }
        }

        if self.reading_material_detection_enabled {
            let path = self.reading_material_model_path();
            let ncnn_ok = self.use_ncnn && self.ncnn_model_dir().is_dir();
            if !path.exists() && !ncnn_ok {
                return Err(GuideError::config(format!(
                    "reading material detection is enabled but the model {} does not exist",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load config from every source and validate it.
    pub fn load() -> GuideResult<Self> {
        let config = Self::load_layers()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge defaults, the config file, `.env` and the environment without
    /// validating the result.
    pub fn load_layers() -> GuideResult<Self> {
        let mut config = Self::from_file_or_default(&config_file_path());

        let dotenv = Path::new(".env");
        if dotenv.exists() {
            let content = std::fs::read_to_string(dotenv)?;
            config.apply_env(parse_dotenv(&content))?;
        }
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Read a JSON config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn from_file_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> GuideResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlay `SECTION__FIELD=value` pairs onto this config.
    ///
    /// Keys are matched case-insensitively; keys outside the known sections
    /// are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> GuideResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref().to_ascii_uppercase();
            let value = value.as_ref().trim();
            let Some((section, field)) = key.split_once("__") else {
                continue;
            };
            match section {
                "CAMERA" => self.apply_camera_var(field, value, &key)?,
                "LOGGING" => self.apply_logging_var(field, value, &key)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn apply_camera_var(&mut self, field: &str, value: &str, key: &str) -> GuideResult<()> {
        let camera = &mut self.camera;
        match field {
            "DEVICE" => camera.device = value.parse().unwrap_or_default(),
            "CAPTURE_INTERVAL" => camera.capture_interval = parse_value(key, value)?,
            "IMAGE_QUALITY" => camera.image_quality = parse_value(key, value)?,
            "IMAGE_DIR" => camera.image_dir = PathBuf::from(value),
            "IMAGE_WIDTH" => camera.image_width = parse_value(key, value)?,
            "IMAGE_HEIGHT" => camera.image_height = parse_value(key, value)?,
            "MODELS_DIR" => camera.models_dir = PathBuf::from(value),
            "FACE_CASCADE_FILE" => camera.face_cascade_file = value.to_string(),
            "READING_MATERIAL_MODEL" => camera.reading_material_model = value.to_string(),
            "FACE_DETECTION_ENABLED" => camera.face_detection_enabled = parse_bool(key, value)?,
            "READING_MATERIAL_DETECTION_ENABLED" => {
                camera.reading_material_detection_enabled = parse_bool(key, value)?
            }
            "DETECTION_CONFIDENCE" => camera.detection_confidence = parse_value(key, value)?,
            "USE_NCNN" => camera.use_ncnn = parse_bool(key, value)?,
            "CENTER_THRESHOLD_PERCENT" => {
                camera.center_threshold_percent = parse_value(key, value)?
            }
            "HISTORY_CAPACITY" => camera.history_capacity = parse_value(key, value)?,
            _ => tracing::debug!(key, "Ignoring unknown camera setting"),
        }
        Ok(())
    }

    fn apply_logging_var(&mut self, field: &str, value: &str, key: &str) -> GuideResult<()> {
        match field {
            "LEVEL" => self.logging.level = value.to_string(),
            "JSON" => self.logging.json = parse_bool(key, value)?,
            "FILE" => self.logging.file = Some(PathBuf::from(value)),
            _ => tracing::debug!(key, "Ignoring unknown logging setting"),
        }
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> GuideResult<()> {
        self.camera.validate()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Parse `.env` content into key/value pairs.
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// dropped, and matching single or double quotes around values are removed.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}

fn parse_value<T>(key: &str, value: &str) -> GuideResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| GuideError::config(format!("{key}: cannot parse {value:?}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> GuideResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GuideError::config(format!(
            "{key}: expected a boolean, got {value:?}"
        ))),
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("camguide").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detectors_off() -> AppConfig {
        let mut config = AppConfig::default();
        config.camera.face_detection_enabled = false;
        config.camera.reading_material_detection_enabled = false;
        config
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let camera = CameraConfig::default();
        assert_eq!(camera.device, CameraDevice::Index(0));
        assert_eq!(camera.image_width, 640);
        assert_eq!(camera.image_height, 480);
        assert_eq!(camera.center_threshold_percent, 15.0);
        assert_eq!(camera.history_capacity, 100);
        assert_eq!(
            camera.face_cascade_path(),
            PathBuf::from("models/cv/haarcascade_frontalface_default.xml")
        );
        assert_eq!(
            camera.ncnn_model_dir(),
            PathBuf::from("models/cv/read_material-yolo11n-best_ncnn_model")
        );
    }

    #[test]
    fn test_apply_env_overrides_nested_keys() {
        let mut config = AppConfig::default();
        config
            .apply_env([
                ("CAMERA__DEVICE", "/dev/video2"),
                ("camera__capture_interval", "0.5"),
                ("CAMERA__FACE_DETECTION_ENABLED", "false"),
                ("CAMERA__CENTER_THRESHOLD_PERCENT", "20"),
                ("LOGGING__JSON", "yes"),
                ("PATH", "/usr/bin"),
                ("AUDIO__SAMPLE_RATE", "16000"),
            ])
            .unwrap();

        assert_eq!(
            config.camera.device,
            CameraDevice::Path("/dev/video2".to_string())
        );
        assert_eq!(config.camera.capture_interval, 0.5);
        assert!(!config.camera.face_detection_enabled);
        assert_eq!(config.camera.center_threshold_percent, 20.0);
        assert!(config.logging.json);
    }

    #[test]
    fn test_apply_env_rejects_garbage() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env([("CAMERA__IMAGE_WIDTH", "wide")])
            .unwrap_err();
        assert!(err.to_string().contains("CAMERA__IMAGE_WIDTH"));

        let err = config
            .apply_env([("CAMERA__USE_NCNN", "maybe")])
            .unwrap_err();
        assert!(matches!(err, GuideError::Config { .. }));
    }

    #[test]
    fn test_parse_dotenv() {
        let vars = parse_dotenv(
            "# camera\n\nCAMERA__DEVICE=1\nexport CAMERA__IMAGE_DIR=\"captures dir\"\nCAMERA__MODELS_DIR='m'\nbroken line\n",
        );
        assert_eq!(
            vars,
            vec![
                ("CAMERA__DEVICE".to_string(), "1".to_string()),
                ("CAMERA__IMAGE_DIR".to_string(), "captures dir".to_string()),
                ("CAMERA__MODELS_DIR".to_string(), "m".to_string()),
            ]
        );
    }

    #[test]
    fn test_validate_ranges() {
        assert!(detectors_off().validate().is_ok());

        let mut config = detectors_off();
        config.camera.center_threshold_percent = 0.0;
        assert!(config.validate().is_err());

        let mut config = detectors_off();
        config.camera.detection_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = detectors_off();
        config.camera.capture_interval = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_range_check_ignores_missing_models() {
        let mut config = AppConfig::default();
        config.camera.models_dir = PathBuf::from("/nonexistent/camguide/models");
        assert!(config.camera.validate_ranges().is_ok());
        assert!(config.camera.validate_models().is_err());

        config.camera.center_threshold_percent = 150.0;
        assert!(matches!(
            config.camera.validate_ranges(),
            Err(GuideError::Config { .. })
        ));
    }

    #[test]
    fn test_validate_requires_enabled_model_files() {
        let dir = std::env::temp_dir().join("camguide_test_models");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = detectors_off();
        config.camera.models_dir = dir.clone();
        config.camera.face_detection_enabled = true;

        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("haarcascade_frontalface_default.xml"));

        std::fs::write(config.camera.face_cascade_path(), "<opencv_storage/>").unwrap();
        assert!(config.validate().is_ok());

        config.camera.reading_material_detection_enabled = true;
        config.camera.use_ncnn = true;
        assert!(config.validate().is_err());
        std::fs::create_dir_all(config.camera.ncnn_model_dir()).unwrap();
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_json_file_keeps_defaults() {
        let json = r#"{ "camera": { "device": "/dev/video0", "image_width": 1280 } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.camera.device,
            CameraDevice::Path("/dev/video0".to_string())
        );
        assert_eq!(config.camera.image_width, 1280);
        assert_eq!(config.camera.image_height, 480);
        assert_eq!(config.logging.level, "info");
    }
}
