//! # Gesture Stream
//!
//! Continuous gesture recognition over live, unsegmented motion streams.
//!
//! ## Overview
//!
//! Frames arrive one at a time with no start/stop signal. The library decides,
//! frame by frame, *when* a gesture happened and *which* class it was, using
//! two cooperating engines:
//!
//! - an incremental segmentor that keeps a rolling normalized DTW cost per
//!   exemplar and reports candidate spans through a local-minimum trigger and
//!   a per-exemplar event state machine
//! - a whole-sequence matcher (banded DTW, confidence reweighting,
//!   lower-bound pruning, Monte-Carlo calibrated rejection thresholds) that
//!   confirms or classifies finite segments
//!
//! ## Quick Start
//!
//! ```no_run
//! use gesture_stream::{Config, ContinuousRecognizer, Sample, Vector};
//!
//! let swipe: Vec<Vector> = (0..30).map(|i| Vector::new(vec![i as f64, 0.0])).collect();
//! let samples = vec![Sample::from_points(0, &swipe).unwrap()];
//!
//! let mut recognizer = ContinuousRecognizer::new(&Config::default(), &samples).unwrap();
//! for frame in &swipe {
//!     for detection in recognizer.process_frame(frame).unwrap() {
//!         println!("class {} over {}..={}", detection.class_id, detection.start, detection.end);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`math`]: vectors and running statistics
//! - [`capture`]: frame history ring buffer and recorded samples
//! - [`analysis`]: simplification, resampling and filtering of trajectories
//! - [`segmentation`]: incremental segmentor, trigger and event FSM
//! - [`matching`]: banded-DTW matcher and threshold calibration
//! - [`window`]: trailing-window front end
//! - [`workflow`]: detections, merge rule and the continuous recognizer
//! - [`app`]: CLI and configuration management
//!
//! ## Frame Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │    Frame    │───▶│  Segmentor  │───▶│  Selection  │───▶│   Matcher   │
//! │  (filtered) │    │ (per templ.)│    │  (FSM arb.) │    │ (isMatch)   │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//!                                                          ┌─────────────┐
//!                                                          │ Detection   │
//!                                                          │ Log (merge) │
//!                                                          └─────────────┘
//! ```

pub mod math;
pub mod capture;
pub mod analysis;
pub mod segmentation;
pub mod matching;
pub mod window;
pub mod workflow;
pub mod app;

// Re-export commonly used types
pub use app::config::Config;
pub use capture::{ClassId, RingBuffer, Sample};
pub use math::Vector;
pub use matching::Matcher;
pub use segmentation::{SegmentResult, Segmentor};
pub use window::WindowSegmentor;
pub use workflow::{ContinuousRecognizer, Detection, DetectionLog};

/// Result type alias for the recognizer
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the recognizer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
