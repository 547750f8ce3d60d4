//! camguide Detection Model
//!
//! Defines the core data contracts shared by the pipeline and front-ends:
//! - **Detections:** Boxes produced by the face and reading material detectors
//! - **Analysis:** Per-frame reports, positioning, and robot guidance
//! - **Events:** Timestamped history entries
//! - **Export:** The JSON envelope and CSV tables written for users
//!
//! All coordinates are integer pixels in the captured frame, origin top-left.

pub mod analysis;
pub mod detection;
pub mod event;
pub mod export;

pub use analysis::*;
pub use detection::*;
pub use event::*;
pub use export::*;
