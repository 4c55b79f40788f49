//! Matcher feature extraction
//!
//! A trajectory is resampled to a fixed count and turned into:
//! - `vecs`: unit direction vectors (inner-product measure) or, optionally
//!   z-normalized, points (Euclidean measure)
//! - `abs`: normalized per-axis absolute distance travelled
//! - `bb`: normalized bounding-box widths
//!
//! `abs` and `bb` feed the confidence factor that separates near misses.

use crate::analysis::resampling::resample;
use crate::app::config::MatcherConfig;
use crate::math::Vector;

/// Features of one trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub vecs: Vec<Vector>,
    pub abs: Vector,
    pub bb: Vector,
}

impl Features {
    /// Extract features. `trajectory` must hold at least one point.
    pub fn new(config: &MatcherConfig, trajectory: &[Vector]) -> Self {
        let mut points = resample(trajectory, config.resample_count);
        let dim = trajectory.first().map(Vector::size).unwrap_or(0);

        if config.euclidean_distance && config.z_normalize {
            z_normalize(&mut points);
        }

        let mut abs = Vector::zeros(dim);
        let mut minimum = Vector::constant(f64::INFINITY, dim);
        let mut maximum = Vector::constant(f64::NEG_INFINITY, dim);
        let mut vecs = Vec::with_capacity(points.len());

        for (i, point) in points.iter().enumerate() {
            minimum.minimum(point);
            maximum.maximum(point);

            if config.euclidean_distance {
                vecs.push(point.clone());
            }
            if i == 0 {
                continue;
            }

            let delta = point - &points[i - 1];
            abs = &abs + &delta.abs();

            if config.inner_product {
                vecs.push(delta.normalized());
            }
        }

        abs.normalize();
        let mut bb = if points.is_empty() {
            Vector::zeros(dim)
        } else {
            &maximum - &minimum
        };
        bb.normalize();

        Self { vecs, abs, bb }
    }
}

/// Scale every component to zero mean and unit variance across points
fn z_normalize(points: &mut [Vector]) {
    let n = points.len();
    if n == 0 {
        return;
    }
    let dim = points[0].size();

    let mut mean = Vector::zeros(dim);
    for point in points.iter() {
        mean = &mean + point;
    }
    let mean = &mean / n as f64;

    let mut variance = Vector::zeros(dim);
    for point in points.iter() {
        let diff = point - &mean;
        for j in 0..dim {
            variance[j] += diff[j] * diff[j];
        }
    }

    for point in points.iter_mut() {
        for j in 0..dim {
            let sd = (variance[j] / n as f64).sqrt();
            point[j] = if sd > 0.0 { (point[j] - mean[j]) / sd } else { 0.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Vector {
        Vector::new(vec![x, y])
    }

    #[test]
    fn test_inner_product_features() {
        let config = MatcherConfig::inner_product_defaults();
        let trajectory: Vec<Vector> = (0..30).map(|i| p(i as f64, 0.0)).collect();

        let features = Features::new(&config, &trajectory);

        assert_eq!(features.vecs.len(), config.resample_count - 1);
        for vec in &features.vecs {
            assert!((vec[0] - 1.0).abs() < 1e-9);
            assert!(vec[1].abs() < 1e-9);
        }
        assert!((features.abs[0] - 1.0).abs() < 1e-9);
        assert!((features.bb[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_euclidean_features_z_normalized() {
        let config = MatcherConfig::euclidean_defaults();
        let trajectory: Vec<Vector> = (0..30).map(|i| p(i as f64, i as f64 * 2.0)).collect();

        let features = Features::new(&config, &trajectory);

        assert_eq!(features.vecs.len(), config.resample_count);
        let mean_x: f64 = features.vecs.iter().map(|v| v[0]).sum::<f64>() / 16.0;
        let var_x: f64 = features.vecs.iter().map(|v| v[0] * v[0]).sum::<f64>() / 16.0;
        assert!(mean_x.abs() < 1e-9);
        assert!((var_x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_abs_and_bb_unit_length() {
        let config = MatcherConfig::inner_product_defaults();
        let trajectory = vec![p(0.0, 0.0), p(4.0, 0.0), p(4.0, 3.0), p(0.0, 3.0)];

        let features = Features::new(&config, &trajectory);

        assert!((features.abs.l2_norm() - 1.0).abs() < 1e-9);
        assert!((features.bb.l2_norm() - 1.0).abs() < 1e-9);
        assert!((features.bb[0] - 0.8).abs() < 1e-9);
    }
}
