//! Score distributions for threshold calibration
//!
//! Positive (same-class variation) and negative (spliced) scores are
//! histogrammed over `[0, max_score]`. The rejection threshold is the bin edge
//! that maximizes the F-beta score when everything below it is accepted.

use crate::math::RunningStatistics;

/// Default histogram resolution
pub const DEFAULT_BINS: usize = 1000;

/// Positive and negative score histograms for one template
#[derive(Debug, Clone)]
pub struct ScoreDistributions {
    max_score: f64,
    negative_bins: Vec<f64>,
    positive_bins: Vec<f64>,
    negative_scores: Vec<f64>,
    positive_stats: RunningStatistics,
}

impl ScoreDistributions {
    pub fn new(max_score: f64, bins: usize) -> Self {
        let bins = bins.max(1);
        Self {
            max_score,
            negative_bins: vec![0.0; bins],
            positive_bins: vec![0.0; bins],
            negative_scores: Vec::new(),
            positive_stats: RunningStatistics::new(),
        }
    }

    fn bin(&self, score: f64) -> usize {
        let bins = self.negative_bins.len();
        if self.max_score <= 0.0 || !score.is_finite() {
            return bins - 1;
        }
        let idx = (score / self.max_score * bins as f64).max(0.0) as usize;
        idx.min(bins - 1)
    }

    pub fn add_negative_score(&mut self, score: f64) {
        let idx = self.bin(score);
        self.negative_bins[idx] += 1.0;
        self.negative_scores.push(score);
    }

    pub fn add_positive_score(&mut self, score: f64) {
        let idx = self.bin(score);
        self.positive_bins[idx] += 1.0;
        self.positive_stats.add(score);
    }

    pub fn negative_count(&self) -> usize {
        self.negative_scores.len()
    }

    pub fn positive_count(&self) -> u64 {
        self.positive_stats.count
    }

    /// Mean positive score
    pub fn positive_mean(&self) -> f64 {
        self.positive_stats.mean
    }

    /// Negative score at percentile `p` in `[0, 1]` (nearest rank)
    pub fn negative_percentile(&self, p: f64) -> Option<f64> {
        if self.negative_scores.is_empty() {
            return None;
        }
        let mut sorted = self.negative_scores.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = (p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[rank])
    }

    /// Threshold maximizing F-beta over cumulative bins.
    ///
    /// Recall is the share of positives at or below a bin; precision is
    /// positives over positives plus negatives at or below it. Returns the
    /// upper edge of the first best bin.
    pub fn rejection_threshold(&self, beta: f64) -> f64 {
        let bins = self.negative_bins.len();
        let negative_total: f64 = self.negative_bins.iter().sum::<f64>().max(1.0);
        let positive_total: f64 = self.positive_bins.iter().sum::<f64>().max(1.0);
        let beta2 = beta * beta;

        let mut negatives = 0.0;
        let mut positives = 0.0;
        let mut best_score = f64::NEG_INFINITY;
        let mut best_idx = bins - 1;

        for idx in 0..bins {
            negatives += self.negative_bins[idx] / negative_total;
            positives += self.positive_bins[idx] / positive_total;

            let (r, e) = (positives, negatives);
            if r + e <= 0.0 {
                continue;
            }
            let precision = r / (r + e);
            let recall = r;
            let denom = beta2 * precision + recall;
            if denom <= 0.0 {
                continue;
            }
            let f_score = (1.0 + beta2) * precision * recall / denom;

            if f_score > best_score {
                best_score = f_score;
                best_idx = idx;
            }
        }

        (best_idx + 1) as f64 * self.max_score / bins as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separable_threshold_between_classes() {
        let mut dist = ScoreDistributions::new(10.0, DEFAULT_BINS);
        for i in 0..200 {
            dist.add_positive_score(1.0 + i as f64 / 200.0);
            dist.add_negative_score(5.0 + 4.0 * i as f64 / 200.0);
        }

        let threshold = dist.rejection_threshold(1.0);
        let p95 = dist.negative_percentile(0.95).unwrap();

        assert!(threshold > dist.positive_mean());
        assert!(threshold < p95);
        // every positive is accepted
        assert!(threshold >= 2.0 - 1e-9);
        assert!(threshold <= 5.0);
    }

    #[test]
    fn test_scores_beyond_max_clamp_to_last_bin() {
        let mut dist = ScoreDistributions::new(1.0, 10);
        dist.add_negative_score(50.0);
        dist.add_negative_score(f64::INFINITY);
        assert_eq!(dist.negative_count(), 2);
        assert_eq!(dist.negative_bins[9], 2.0);
    }

    #[test]
    fn test_percentile() {
        let mut dist = ScoreDistributions::new(100.0, 100);
        for i in 0..=100 {
            dist.add_negative_score(i as f64);
        }
        assert_eq!(dist.negative_percentile(0.95), Some(95.0));
        assert_eq!(dist.negative_percentile(0.0), Some(0.0));
    }

    #[test]
    fn test_empty_distributions() {
        let dist = ScoreDistributions::new(4.0, 8);
        assert!(dist.negative_percentile(0.5).is_none());
        assert_eq!(dist.rejection_threshold(1.0), 4.0);
    }
}
