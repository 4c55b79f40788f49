//! Recognition workflow
//!
//! Turns front end candidates into confirmed, deduplicated detections.

pub mod detection;
pub mod recognizer;

pub use detection::{Detection, DetectionLog};
pub use recognizer::{ContinuousRecognizer, SegmentationPolicy};
