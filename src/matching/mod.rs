//! Whole-sequence matching
//!
//! Banded DTW classification of finite segments: confirmation of segmentor
//! candidates, direct classification of trailing windows, and Monte-Carlo
//! calibration of per-template rejection thresholds.

pub mod distributions;
pub mod dtw;
pub mod features;
pub mod matcher;
pub mod template;

pub use distributions::ScoreDistributions;
pub use dtw::{banded_dtw, lower_bound, CostMetric};
pub use features::Features;
pub use matcher::{CalibrationReport, Matcher, WindowMatch};
pub use template::{MatchTemplate, TemplateExport};
