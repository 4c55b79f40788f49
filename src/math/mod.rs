//! Numeric primitives
//!
//! - [`Vector`]: fixed-size tuple with arithmetic, dot product and norms
//! - [`RunningStatistics`]: incremental mean / variance

pub mod vector;
pub mod statistics;

pub use statistics::RunningStatistics;
pub use vector::Vector;
