//! Keypoint Reduction
//!
//! Reduces an exemplar trajectory to the keypoints the segmentor aligns
//! against. Uses a density-aware Douglas-Peucker variant: each candidate
//! split point is scored by its perpendicular distance to the chord, weighted
//! by how sharply the path turns there, so long straight runs collapse to
//! their endpoints while corners survive.
//!
//! Also hosts the small polyline helpers template construction needs
//! (duplicate removal, bounding box, path length, direction vectors, hook
//! removal for pointer devices).

use crate::math::Vector;
use tracing::debug;

/// Fraction of the bounding-box diagonal used as the split threshold
pub const DEFAULT_DIAGONAL_FRACTION: f64 = 0.01;

/// Adjacent segment length ratio below which an end segment is a hook
pub const HOOK_RATIO: f64 = 0.2;

/// Drop consecutive points closer than machine epsilon
pub fn remove_duplicates(points: &[Vector]) -> Vec<Vector> {
    let mut ret: Vec<Vector> = Vec::with_capacity(points.len());

    for point in points {
        match ret.last() {
            Some(last) if last.distance(point) <= f64::EPSILON => continue,
            _ => ret.push(point.clone()),
        }
    }

    ret
}

/// Component-wise minimum and maximum corners
pub fn bounding_box(points: &[Vector]) -> Option<(Vector, Vector)> {
    let first = points.first()?;
    let mut minimum = first.clone();
    let mut maximum = first.clone();

    for point in &points[1..] {
        minimum.minimum(point);
        maximum.maximum(point);
    }

    Some((minimum, maximum))
}

/// Length of the bounding-box diagonal (0 for an empty trajectory)
pub fn diagonal(points: &[Vector]) -> f64 {
    bounding_box(points)
        .map(|(min, max)| max.distance(&min))
        .unwrap_or(0.0)
}

/// Total length of the polyline
pub fn path_length(points: &[Vector]) -> f64 {
    points.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Successive differences, optionally scaled to unit length.
///
/// Produces `points.len() - 1` vectors.
pub fn vectorize(points: &[Vector], normalize: bool) -> Vec<Vector> {
    points
        .windows(2)
        .map(|w| {
            let mut vec = &w[1] - &w[0];
            if normalize {
                vec.normalize();
            }
            vec
        })
        .collect()
}

/// Drop a short leading or trailing "hook" segment.
///
/// Pointer input often starts or ends with a small flick in an unrelated
/// direction. An end segment whose length is under [`HOOK_RATIO`] of its
/// neighbour is removed. Needs at least three keypoints per check.
pub fn remove_hooks(mut keypoints: Vec<Vector>) -> Vec<Vector> {
    if keypoints.len() >= 3 {
        let first = keypoints[0].distance(&keypoints[1]);
        let second = keypoints[1].distance(&keypoints[2]);
        if second > 0.0 && first / second < HOOK_RATIO {
            debug!(ratio = first / second, "Removing leading hook");
            keypoints.remove(0);
        }
    }

    let n = keypoints.len();
    if n >= 3 {
        let before = keypoints[n - 3].distance(&keypoints[n - 2]);
        let last = keypoints[n - 2].distance(&keypoints[n - 1]);
        if before > 0.0 && last / before < HOOK_RATIO {
            debug!(ratio = last / before, "Removing trailing hook");
            keypoints.pop();
        }
    }

    keypoints
}

/// Density-aware Douglas-Peucker simplifier
#[derive(Debug, Clone, Copy)]
pub struct DensitySimplifier {
    /// Minimum split score for a point to be kept
    pub threshold: f64,
}

impl DensitySimplifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Threshold proportional to the trajectory's bounding-box diagonal
    pub fn for_trajectory(points: &[Vector]) -> Self {
        Self::new(diagonal(points) * DEFAULT_DIAGONAL_FRACTION)
    }

    /// Reduce `points` to keypoints, preserving order.
    ///
    /// Endpoints are always kept.
    pub fn simplify(&self, points: &[Vector]) -> Vec<Vector> {
        if points.len() <= 2 {
            return points.to_vec();
        }

        let scores = self.split_scores(points);

        points
            .iter()
            .zip(&scores)
            .filter(|(_, score)| **score >= self.threshold)
            .map(|(point, _)| point.clone())
            .collect()
    }

    /// Score every point; endpoints get `f64::MAX`, unsplit points 0
    pub fn split_scores(&self, points: &[Vector]) -> Vec<f64> {
        let n = points.len();
        let mut scores = vec![0.0; n];
        if n == 0 {
            return scores;
        }
        scores[0] = f64::MAX;
        scores[n - 1] = f64::MAX;

        let mut pending = vec![(0usize, n - 1)];

        while let Some((start, end)) = pending.pop() {
            if end < start + 2 {
                continue;
            }

            let (largest, selected) = Self::find_split(points, start, end);
            if largest < self.threshold {
                continue;
            }

            scores[selected] = largest;
            pending.push((start, selected));
            pending.push((selected, end));
        }

        scores
    }

    /// Interior point with the largest turn-weighted chord distance
    fn find_split(points: &[Vector], start: usize, end: usize) -> (f64, usize) {
        let a = &points[start];
        let b = &points[end];
        let ab = b - a;
        let denom = ab.dot(&ab);

        let mut largest = f64::NEG_INFINITY;
        let mut selected = start + 1;

        for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
            let ac = point - a;

            // closed chord: plain distance, rooted again below like the others
            let mut d2 = if denom == 0.0 {
                ac.l2_norm()
            } else {
                let numer = ac.dot(&ab);
                ac.dot(&ac) - numer * numer / denom
            };

            // weight by the turning angle at this point
            let v1 = point - a;
            let v2 = b - point;
            let l1l2 = v1.l2_norm() * v2.l2_norm();
            let cos = if l1l2 > 0.0 { v1.dot(&v2) / l1l2 } else { v1.dot(&v2) };
            d2 *= cos.clamp(-1.0, 1.0).acos() / std::f64::consts::PI;

            if d2 > largest {
                largest = d2;
                selected = i;
            }
        }

        (largest.max(0.0).sqrt(), selected)
    }
}
