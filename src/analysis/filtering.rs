//! Low-pass filtering
//!
//! Exemplars are smoothed offline with repeated central moving averages; the
//! live stream is smoothed causally with an exponential moving average. Both
//! are tuned by a cutoff frequency and the frame rate.

use crate::capture::Sample;
use crate::math::Vector;
use std::f64::consts::PI;

/// Causal first-order low-pass filter
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    cutoff_hz: f64,
    state: Option<Vector>,
}

impl ExponentialMovingAverage {
    pub fn new(cutoff_hz: f64) -> Self {
        Self {
            cutoff_hz,
            state: None,
        }
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    /// Smoothing weight of a new point for a frame period of `dt` seconds
    pub fn alpha(&self, dt: f64) -> f64 {
        let tau = 1.0 / (2.0 * PI * self.cutoff_hz);
        1.0 / (1.0 + tau / dt)
    }

    /// Filter one point. The first point passes through unchanged.
    ///
    /// # Panics
    /// Panics if `point` differs in dimension from earlier points
    pub fn filter(&mut self, point: &Vector, dt: f64) -> Vector {
        let alpha = self.alpha(dt);
        let next = match self.state.take() {
            Some(previous) => &(point * alpha) + &(&previous * (1.0 - alpha)),
            None => point.clone(),
        };
        self.state = Some(next.clone());
        next
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Central moving average passes equivalent to a cutoff at a frame rate
pub fn cma_passes(cutoff_hz: f64, fps: f64) -> usize {
    let ratio = fps / (2.0 * PI * cutoff_hz);
    (1.5 * ratio * ratio).round() as usize
}

/// Apply `passes` central moving averages of half-width `window`.
/// The window shrinks at the ends of the trajectory.
pub fn cma_filter(points: &[Vector], window: usize, passes: usize) -> Vec<Vector> {
    let mut signal = points.to_vec();
    let count = signal.len();

    for _ in 0..passes {
        signal = (0..count)
            .map(|i| {
                let lo = i.saturating_sub(window);
                let hi = (i + window).min(count - 1);
                let mut sum = signal[lo].clone();
                for point in &signal[lo + 1..=hi] {
                    sum = &sum + point;
                }
                &sum / (hi - lo + 1) as f64
            })
            .collect();
    }

    signal
}

/// Attach a CMA-filtered trajectory to `sample`.
///
/// The pass count comes from the sample's own frame rate when it carries
/// timestamps, `default_fps` otherwise.
pub fn filter_sample(sample: Sample, cutoff_hz: f64, default_fps: f64) -> crate::Result<Sample> {
    let fps = sample.estimated_fps().unwrap_or(default_fps);
    let passes = cma_passes(cutoff_hz, fps);
    let filtered = cma_filter(sample.trajectory(), 1, passes);
    sample.with_filtered(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64) -> Vector {
        Vector::new(vec![x])
    }

    #[test]
    fn test_cma_passes() {
        assert_eq!(cma_passes(3.0, 30.0), 4);
        assert_eq!(cma_passes(5.0, 30.0), 1);
        assert_eq!(cma_passes(3.0, 5.0), 0);
    }

    #[test]
    fn test_cma_filter_single_pass() {
        let points = vec![v(0.0), v(3.0), v(0.0), v(3.0)];
        let filtered = cma_filter(&points, 1, 1);

        assert_eq!(filtered.len(), 4);
        assert!((filtered[0][0] - 1.5).abs() < 1e-12);
        assert!((filtered[1][0] - 1.0).abs() < 1e-12);
        assert!((filtered[2][0] - 2.0).abs() < 1e-12);
        assert!((filtered[3][0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_cma_zero_passes_is_identity() {
        let points = vec![v(1.0), v(5.0)];
        assert_eq!(cma_filter(&points, 1, 0), points);
        assert!(cma_filter(&[], 1, 3).is_empty());
    }

    #[test]
    fn test_ema_converges() {
        let mut ema = ExponentialMovingAverage::new(3.0);
        assert_eq!(ema.filter(&v(0.0), 1.0 / 30.0), v(0.0));

        let alpha = ema.alpha(1.0 / 30.0);
        assert!(alpha > 0.0 && alpha < 1.0);

        let first = ema.filter(&v(10.0), 1.0 / 30.0);
        assert!((first[0] - 10.0 * alpha).abs() < 1e-12);

        let mut last = first;
        for _ in 0..200 {
            last = ema.filter(&v(10.0), 1.0 / 30.0);
        }
        assert!((last[0] - 10.0).abs() < 1e-6);

        ema.reset();
        assert_eq!(ema.filter(&v(-4.0), 1.0 / 30.0), v(-4.0));
    }

    #[test]
    fn test_filter_sample_uses_timestamps() {
        let points: Vec<Vector> = (0..20).map(|i| v(if i % 2 == 0 { 0.0 } else { 1.0 })).collect();
        let timestamps: Vec<f64> = (0..20).map(|i| i as f64 / 30.0).collect();
        let sample = Sample::from_points(0, &points)
            .unwrap()
            .with_timestamps(timestamps)
            .unwrap();

        let sample = filter_sample(sample, 3.0, 120.0).unwrap();
        let filtered = sample.filtered().unwrap();
        assert_eq!(filtered.len(), 20);
        assert!((filtered[10][0] - 0.5).abs() < 0.1);
        assert_eq!(sample.trajectory_for(false), points.as_slice());
    }
}
