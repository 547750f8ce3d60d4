//! Error types shared across camguide crates.

use std::path::PathBuf;

/// Top-level error type for camguide operations.
#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Inference error in {detector}: {message}")]
    Inference { detector: String, message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Unknown frame rate: {label:?}")]
    UnknownRate { label: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GuideError.
pub type GuideResult<T> = Result<T, GuideError>;

impl GuideError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn inference(detector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Inference {
            detector: detector.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn unknown_rate(label: impl Into<String>) -> Self {
        Self::UnknownRate {
            label: label.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    /// Whether the error should abort startup rather than a single tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
