//! Banded dynamic time warping and its envelope lower bound

use crate::math::Vector;
use serde::{Deserialize, Serialize};

/// Local cost measure between feature vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostMetric {
    /// `1 - a.b` over unit direction vectors
    InnerProduct,
    /// Squared Euclidean distance over points
    Euclidean,
}

impl CostMetric {
    #[inline]
    pub fn cost(&self, a: &Vector, b: &Vector) -> f64 {
        match self {
            Self::InnerProduct => 1.0 - a.dot(b),
            Self::Euclidean => a.distance_squared(b),
        }
    }
}

/// DTW cost with a Sakoe-Chiba band of `radius` around the diagonal.
///
/// Only cells with `|i - j| <= radius` are evaluated. Two rolling rows keep
/// memory at O(m). Returns infinity for empty input or when the band never
/// reaches the final cell.
pub fn banded_dtw(a: &[Vector], b: &[Vector], radius: usize, metric: CostMetric) -> f64 {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return f64::INFINITY;
    }

    let mut previous = vec![f64::INFINITY; m + 1];
    let mut current = vec![f64::INFINITY; m + 1];
    previous[0] = 0.0;

    for i in 1..=n {
        current.iter_mut().for_each(|c| *c = f64::INFINITY);

        let lo = i.saturating_sub(radius).max(1);
        let hi = (i + radius).min(m);

        for j in lo..=hi {
            let best = previous[j].min(current[j - 1]).min(previous[j - 1]);
            current[j] = best + metric.cost(&a[i - 1], &b[j - 1]);
        }

        std::mem::swap(&mut previous, &mut current);
    }

    previous[m]
}

/// Per-position envelope of `vecs` over a window of `radius`
pub fn envelopes(vecs: &[Vector], radius: usize) -> (Vec<Vector>, Vec<Vector>) {
    let mut lower = Vec::with_capacity(vecs.len());
    let mut upper = Vec::with_capacity(vecs.len());

    for i in 0..vecs.len() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(vecs.len() - 1);

        let mut minimum = vecs[i].clone();
        let mut maximum = vecs[i].clone();
        for vec in &vecs[lo..=hi] {
            minimum.minimum(vec);
            maximum.maximum(vec);
        }
        lower.push(minimum);
        upper.push(maximum);
    }

    (lower, upper)
}

/// Cheap bound on [`banded_dtw`] from a template envelope.
///
/// Each query vector is compared with the envelope at the same position;
/// components inside the envelope cost nothing.
pub fn lower_bound(vecs: &[Vector], lower: &[Vector], upper: &[Vector], metric: CostMetric) -> f64 {
    let mut lb = 0.0;

    for ((vec, lo), hi) in vecs.iter().zip(lower).zip(upper) {
        let mut cost = 0.0;

        for j in 0..vec.size() {
            match metric {
                CostMetric::InnerProduct => {
                    cost += vec[j] * if vec[j] < 0.0 { lo[j] } else { hi[j] };
                }
                CostMetric::Euclidean => {
                    let diff = if vec[j] < lo[j] {
                        vec[j] - lo[j]
                    } else if vec[j] > hi[j] {
                        vec[j] - hi[j]
                    } else {
                        0.0
                    };
                    cost += diff * diff;
                }
            }
        }

        // inner products are bounded
        if metric == CostMetric::InnerProduct {
            cost = 1.0 - cost.clamp(-1.0, 1.0);
        }

        lb += cost;
    }

    lb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(values: &[f64]) -> Vec<Vector> {
        values.iter().map(|v| Vector::new(vec![*v])).collect()
    }

    #[test]
    fn test_unbanded_hand_computed() {
        let a = s(&[0.0, 1.0, 2.0]);
        let b = s(&[0.0, 2.0, 2.0]);
        assert!((banded_dtw(&a, &b, 3, CostMetric::Euclidean) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_radius_zero_is_lockstep() {
        let a = s(&[0.0, 1.0, 2.0]);
        let b = s(&[0.0, 2.0, 2.0]);
        // (0-0)^2 + (1-2)^2 + (2-2)^2
        assert!((banded_dtw(&a, &b, 0, CostMetric::Euclidean) - 1.0).abs() < 1e-12);

        let c = s(&[1.0, 1.0, 5.0]);
        assert!((banded_dtw(&a, &c, 0, CostMetric::Euclidean) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_band_unreachable_and_empty() {
        let a = s(&[0.0, 1.0, 2.0, 3.0]);
        let b = s(&[0.0, 1.0]);
        assert!(banded_dtw(&a, &b, 0, CostMetric::Euclidean).is_infinite());
        assert!(banded_dtw(&[], &b, 2, CostMetric::Euclidean).is_infinite());
    }

    #[test]
    fn test_inner_product_identical_is_zero() {
        let dirs = vec![
            Vector::new(vec![1.0, 0.0]),
            Vector::new(vec![0.0, 1.0]),
            Vector::new(vec![-1.0, 0.0]),
        ];
        assert!(banded_dtw(&dirs, &dirs, 1, CostMetric::InnerProduct).abs() < 1e-12);
    }

    #[test]
    fn test_lower_bound_never_exceeds_dtw() {
        let template = s(&[0.0, 1.0, 3.0, 2.0, 0.5, 0.0]);
        let query = s(&[0.5, 2.0, 2.5, 0.0, 1.0, 4.0]);
        let radius = 1;

        let (lower, upper) = envelopes(&template, radius);
        let lb = lower_bound(&query, &lower, &upper, CostMetric::Euclidean);
        let dtw = banded_dtw(&query, &template, radius, CostMetric::Euclidean);

        assert!(lb <= dtw + 1e-12);
        assert!(lb > 0.0);
    }

    #[test]
    fn test_envelopes_shape() {
        let template = s(&[0.0, 5.0, 1.0, 3.0]);
        let (lower, upper) = envelopes(&template, 1);
        assert_eq!(lower.len(), template.len());
        assert_eq!(lower[0][0], 0.0);
        assert_eq!(upper[0][0], 5.0);
        assert_eq!(lower[2][0], 1.0);
        assert_eq!(upper[3][0], 3.0);
    }
}
