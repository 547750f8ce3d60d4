//! Capture interval selection.
//!
//! The front-end offers a closed set of labelled intervals. Anything outside
//! the table is rejected so the running service keeps its previous rate.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use camguide_common::{GuideError, GuideResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameRate {
    #[serde(rename = "0.5s per image")]
    HalfSecond,
    #[default]
    #[serde(rename = "1.0s per image")]
    OneSecond,
    #[serde(rename = "2.0s per image")]
    TwoSeconds,
}

const TABLE: [(FrameRate, &str, u64); 3] = [
    (FrameRate::HalfSecond, "0.5s per image", 500),
    (FrameRate::OneSecond, "1.0s per image", 1000),
    (FrameRate::TwoSeconds, "2.0s per image", 2000),
];

impl FrameRate {
    pub const ALL: [FrameRate; 3] = [Self::HalfSecond, Self::OneSecond, Self::TwoSeconds];

    fn entry(self) -> (FrameRate, &'static str, u64) {
        match self {
            Self::HalfSecond => TABLE[0],
            Self::OneSecond => TABLE[1],
            Self::TwoSeconds => TABLE[2],
        }
    }

    pub fn label(self) -> &'static str {
        self.entry().1
    }

    pub fn interval_ms(self) -> u64 {
        self.entry().2
    }

    pub fn interval(self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }

    /// Look up a user-facing label exactly as listed.
    pub fn from_label(label: &str) -> GuideResult<Self> {
        TABLE
            .iter()
            .find(|(_, l, _)| *l == label.trim())
            .map(|(rate, _, _)| *rate)
            .ok_or_else(|| GuideError::unknown_rate(label))
    }

    /// Nearest table entry for a configured interval in seconds.
    pub fn from_interval_secs(secs: f64) -> Self {
        let target_ms = secs * 1000.0;
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                let da = (a.interval_ms() as f64 - target_ms).abs();
                let db = (b.interval_ms() as f64 - target_ms).abs();
                da.total_cmp(&db)
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrameRate {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}
