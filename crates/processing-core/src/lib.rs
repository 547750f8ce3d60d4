//! camguide Processing Core
//!
//! Turns raw detector output into guidance for the robot and the operator:
//! - **Guidance:** Offset from frame center to the primary reading material
//! - **Analysis:** Per-frame material/face reports and positioning
//! - **History:** Bounded log of detection events with text renderers
//! - **Frame rate:** The fixed set of capture intervals
//! - **Overlay:** Arrow geometry for preview and guidance panels
//!
//! This crate is pure computation: no I/O, no camera or model access.

pub mod analysis;
pub mod frame_rate;
pub mod guidance;
pub mod history;
pub mod overlay;

pub use analysis::analyze_frame;
pub use frame_rate::FrameRate;
pub use guidance::{compute_guidance, select_primary};
pub use history::{HistoryBuffer, RenderMode};
