//! Trajectory Resampling
//!
//! Two resamplers feed the matcher:
//! - [`resample`] produces `n` points evenly spaced along the path, used to
//!   bring every template and query to a common length.
//! - [`gpsr`] (gesture path stochastic resampling) produces a synthetic
//!   variation of an exemplar by resampling at random intervals, dropping a
//!   few points and re-chaining the remaining unit steps. Calibration uses
//!   it to synthesise positive examples.

use crate::analysis::simplification::path_length;
use crate::math::Vector;
use rand::Rng;

/// Default interval variance for [`gpsr`]
pub const DEFAULT_GPSR_VARIANCE: f64 = 0.25;

/// Resample `points` to `n` points evenly spaced along the path.
///
/// Fewer than two input points, or a zero-length path, yields `n` copies of
/// the first point (empty input yields an empty result).
pub fn resample(points: &[Vector], n: usize) -> Vec<Vector> {
    let intervals = vec![1.0; n.saturating_sub(1)];
    resample_at(points, n, &intervals)
}

/// Resample with relative interval lengths (one per gap, summing to any value)
fn resample_at(points: &[Vector], n: usize, intervals: &[f64]) -> Vec<Vector> {
    let first = match points.first() {
        Some(first) => first,
        None => return Vec::new(),
    };
    if n == 0 {
        return Vec::new();
    }

    let total = path_length(points);
    if points.len() < 2 || total <= 0.0 || n == 1 {
        return vec![first.clone(); n];
    }

    let interval_sum: f64 = intervals.iter().sum();
    let mut ret = Vec::with_capacity(n);
    ret.push(first.clone());

    let mut gap = 0;
    let mut target = total * intervals[0] / interval_sum;
    let mut accumulated = 0.0;
    let mut prev = first.clone();

    let mut i = 1;
    while i < points.len() && ret.len() < n {
        let segment = prev.distance(&points[i]);

        if segment > 0.0 && accumulated + segment >= target {
            let t = (target - accumulated) / segment;
            let point = Vector::lerp(&prev, &points[i], t.clamp(0.0, 1.0));
            ret.push(point.clone());
            prev = point;
            accumulated = 0.0;

            gap += 1;
            if gap >= intervals.len() {
                break;
            }
            target = total * intervals[gap] / interval_sum;
            continue;
        }

        accumulated += segment;
        prev = points[i].clone();
        i += 1;
    }

    // rounding may leave the tail short
    let last = &points[points.len() - 1];
    while ret.len() < n {
        ret.push(last.clone());
    }

    ret
}

/// Synthesise a variation of `points` with `n` resulting points.
///
/// Samples `n + remove_count - 1` intervals of length `1 + r * sqrt(12 * variance)`
/// (`r` uniform in `[0, 1)`), resamples non-uniformly, removes `remove_count`
/// random interior points, then rebuilds the path from the origin by chaining
/// the unit direction between consecutive survivors.
pub fn gpsr<R: Rng + ?Sized>(
    points: &[Vector],
    n: usize,
    variance: f64,
    remove_count: usize,
    rng: &mut R,
) -> Vec<Vector> {
    if points.len() < 2 || n < 2 {
        return points.to_vec();
    }

    let total = n + remove_count;
    let spread = (12.0 * variance).sqrt();
    let intervals: Vec<f64> = (0..total - 1)
        .map(|_| 1.0 + rng.gen::<f64>() * spread)
        .collect();

    let mut resampled = resample_at(points, total, &intervals);

    for _ in 0..remove_count {
        if resampled.len() <= 2 {
            break;
        }
        let idx = rng.gen_range(1..resampled.len() - 1);
        resampled.remove(idx);
    }

    let dim = points[0].size();
    let mut ret = Vec::with_capacity(resampled.len());
    let mut current = Vector::zeros(dim);
    ret.push(current.clone());

    for w in resampled.windows(2) {
        let step = (&w[1] - &w[0]).normalized();
        current = &current + &step;
        ret.push(current.clone());
    }

    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn p(x: f64, y: f64) -> Vector {
        Vector::new(vec![x, y])
    }

    #[test]
    fn test_resample_line_is_equidistant() {
        let points = vec![p(0.0, 0.0), p(10.0, 0.0)];
        let resampled = resample(&points, 11);

        assert_eq!(resampled.len(), 11);
        for (i, point) in resampled.iter().enumerate() {
            assert!((point[0] - i as f64).abs() < 1e-9);
            assert!(point[1].abs() < 1e-9);
        }
    }

    #[test]
    fn test_resample_keeps_endpoints() {
        let points = vec![p(0.0, 0.0), p(3.0, 0.0), p(3.0, 4.0), p(0.0, 4.0)];
        let resampled = resample(&points, 16);

        assert_eq!(resampled.len(), 16);
        assert_eq!(resampled[0], p(0.0, 0.0));
        assert!(resampled[15].distance(&p(0.0, 4.0)) < 1e-9);
    }

    #[test]
    fn test_resample_degenerate_inputs() {
        assert!(resample(&[], 8).is_empty());

        let single = resample(&[p(2.0, 3.0)], 4);
        assert_eq!(single, vec![p(2.0, 3.0); 4]);

        let stationary = resample(&[p(1.0, 1.0), p(1.0, 1.0)], 3);
        assert_eq!(stationary, vec![p(1.0, 1.0); 3]);
    }

    #[test]
    fn test_gpsr_length_and_unit_steps() {
        let points: Vec<Vector> = (0..40)
            .map(|i| {
                let angle = i as f64 / 40.0 * std::f64::consts::PI;
                p(angle.cos() * 10.0, angle.sin() * 10.0)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);

        let synthetic = gpsr(&points, 16, DEFAULT_GPSR_VARIANCE, 2, &mut rng);

        assert_eq!(synthetic.len(), 16);
        assert!(synthetic[0].is_zero());
        for w in synthetic.windows(2) {
            assert!((w[0].distance(&w[1]) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gpsr_is_reproducible_with_seed() {
        let points = vec![p(0.0, 0.0), p(5.0, 5.0), p(10.0, 0.0)];
        let a = gpsr(&points, 12, 0.25, 2, &mut StdRng::seed_from_u64(42));
        let b = gpsr(&points, 12, 0.25, 2, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_gpsr_short_input_is_copied() {
        let mut rng = StdRng::seed_from_u64(1);
        let single = vec![p(1.0, 2.0)];
        assert_eq!(gpsr(&single, 8, 0.25, 2, &mut rng), single);
    }
}
