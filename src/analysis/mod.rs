//! Trajectory analysis
//!
//! Geometry shared by template construction on both recognition paths:
//! - keypoint reduction with a density-aware Douglas-Peucker variant
//! - equidistant and stochastic resampling
//! - low-pass filtering of exemplars and live frames

pub mod filtering;
pub mod resampling;
pub mod simplification;

pub use filtering::{filter_sample, ExponentialMovingAverage};
pub use resampling::{gpsr, resample};
pub use simplification::{path_length, remove_duplicates, vectorize, DensitySimplifier};
