//! camguide Capture Engine
//!
//! Runs the camera tick loop: capture a frame, run the enabled detectors,
//! analyze the result, publish it to front-ends, append it to history and,
//! while a session is active, save the frame to disk.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                   CameraService                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────┐  │
//! │  │ FrameSource │──▶│ DetectorSet │──▶│ analyze  │  │
//! │  └─────────────┘   └─────────────┘   └────┬─────┘  │
//! │          ┌───────────────┬────────────────┤        │
//! │          ▼               ▼                ▼        │
//! │  ┌─────────────┐ ┌───────────────┐ ┌─────────────┐ │
//! │  │  snapshot   │ │ HistoryBuffer │ │   Session   │ │
//! │  │  (watch)    │ │   (mutex)     │ │ <id>/*.jpg  │ │
//! │  └─────────────┘ └───────────────┘ └─────────────┘ │
//! └────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod detectors;
pub mod service;
pub mod session;
pub mod writer;

pub use backend::{Detector, Frame, FrameSource};
pub use detectors::{DetectionStatus, DetectorSet};
pub use service::{CameraService, FrameSnapshot, ServiceStatus};
pub use session::*;
