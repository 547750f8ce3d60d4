//! Bounded detection history.
//!
//! Events are appended in arrival order; once the buffer is full the oldest
//! event is dropped. Rendering never mutates the buffer.

use std::collections::vec_deque::{self, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use camguide_common::{format_clock_time, GuideError, GuideResult};
use camguide_detection_model::HistoryEvent;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

const SEPARATOR_WIDTH: usize = 60;

/// Text layout for [`HistoryBuffer::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Multi-line block per event.
    #[default]
    Detailed,
    /// One line per event.
    Compact,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Compact => "compact",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Detailed => Self::Compact,
            Self::Compact => Self::Detailed,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detailed" => Ok(Self::Detailed),
            "compact" => Ok(Self::Compact),
            other => Err(GuideError::invalid_input(format!(
                "unknown history mode '{other}', expected 'detailed' or 'compact'"
            ))),
        }
    }
}

/// FIFO log of the most recent detection events.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    events: VecDeque<HistoryEvent>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn with_capacity(capacity: usize) -> GuideResult<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append an event, evicting the oldest when full.
    pub fn append(&mut self, event: HistoryEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, dropping the oldest events that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) -> GuideResult<()> {
        check_capacity(capacity)?;
        while self.events.len() > capacity {
            self.events.pop_front();
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Oldest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, HistoryEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEvent> {
        self.events.back()
    }

    /// Render all events with local timestamps.
    pub fn render(&self, mode: RenderMode) -> Vec<String> {
        self.render_in(mode, &Local)
    }

    /// Render all events with timestamps in `tz`.
    pub fn render_in<Tz: TimeZone>(&self, mode: RenderMode, tz: &Tz) -> Vec<String>
    where
        Tz::Offset: fmt::Display,
    {
        let mut lines = Vec::new();
        for event in &self.events {
            match mode {
                RenderMode::Detailed => render_detailed(event, tz, &mut lines),
                RenderMode::Compact => lines.push(render_compact(event, tz)),
            }
        }
        lines
    }
}

impl<'a> IntoIterator for &'a HistoryBuffer {
    type Item = &'a HistoryEvent;
    type IntoIter = vec_deque::Iter<'a, HistoryEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn check_capacity(capacity: usize) -> GuideResult<()> {
    if capacity == 0 {
        return Err(GuideError::invalid_input("history capacity must be at least 1"));
    }
    Ok(())
}

fn render_detailed<Tz: TimeZone>(event: &HistoryEvent, tz: &Tz, lines: &mut Vec<String>)
where
    Tz::Offset: fmt::Display,
{
    let time = format_clock_time(event.timestamp, tz);
    lines.push(format!("[{time}] === DETECTION EVENT ==="));

    lines.push(format!("READING MATERIALS: {} detected", event.materials.len()));
    for (i, m) in event.materials.iter().enumerate() {
        let state = if m.is_centered { "CENTERED" } else { "NOT CENTERED" };
        lines.push(format!(
            "  - Material {}: {} conf={:.1}% {}",
            i + 1,
            m.bbox,
            m.confidence * 100.0,
            state
        ));
    }

    lines.push(format!("FACES: {} detected", event.faces.len()));
    for face in &event.faces {
        lines.push(format!("  - Face {}: {}", face.face_id, face.bbox));
    }

    if let Some(g) = &event.guidance {
        lines.push(format!(
            "ROBOT: {} | magnitude={:.1}px | vector=({},{})",
            g.robot_command, g.movement_magnitude, g.arrow_dx, g.arrow_dy
        ));
    }

    if let Some(p) = &event.positioning {
        lines.push(format!(
            "FRAME: center=({},{}) threshold={:.0}px",
            p.img_center_x, p.img_center_y, p.center_threshold_px
        ));
    }

    lines.push("=".repeat(SEPARATOR_WIDTH));
}

fn render_compact<Tz: TimeZone>(event: &HistoryEvent, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    let mut line = format!(
        "[{}] M:{} F:{}",
        format_clock_time(event.timestamp, tz),
        event.materials.len(),
        event.faces.len()
    );
    if let Some(g) = &event.guidance {
        line.push_str(&format!(
            " R:{}({}px)",
            g.robot_command,
            g.movement_magnitude.round() as i64
        ));
    }
    line
}
