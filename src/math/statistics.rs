//! Running Statistics
//!
//! Welford accumulator used for score summaries during calibration and for
//! per-frame timing in the replay command.

use serde::Serialize;

/// Incremental mean / variance / extrema
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunningStatistics {
    pub count: u64,
    pub mean: f64,
    m2: f64,
    pub minimum: f64,
    pub maximum: f64,
}

impl RunningStatistics {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Add one observation
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.minimum = self.minimum.min(value);
        self.maximum = self.maximum.max(value);
    }

    /// Sample variance (0 with fewer than two observations)
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn standard_error(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.variance() / self.count as f64).sqrt()
    }

    /// Confidence interval around the mean for critical value `z`
    /// (1.96 for 95%, 2.576 for 99%)
    pub fn confidence_interval(&self, z: f64) -> (f64, f64) {
        let half = z * self.standard_error();
        (self.mean - half, self.mean + half)
    }
}

impl Default for RunningStatistics {
    fn default() -> Self {
        Self::new()
    }
}
