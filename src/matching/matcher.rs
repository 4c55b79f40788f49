//! Whole-sequence matcher
//!
//! Confirms or classifies a finite candidate segment against every
//! exemplar with banded DTW. Scores are reweighted by a confidence factor
//! built from coarse shape descriptors:
//!
//! ```text
//! cf = 1 / max(0.01, abs . abs_t) * 1 / max(0.01, bb . bb_t)
//! ```
//!
//! `classify` sorts templates by their envelope lower bound and skips full
//! DTW for templates the bound already rejects.
//!
//! Per-template rejection thresholds are either fixed or learned with
//! [`Matcher::calibrate`], a Monte-Carlo procedure over spliced negatives and
//! GPSR positives.

use crate::analysis::resampling::{gpsr, DEFAULT_GPSR_VARIANCE};
use crate::app::config::MatcherConfig;
use crate::capture::{ClassId, RingBuffer, Sample};
use crate::math::Vector;
use crate::matching::distributions::{ScoreDistributions, DEFAULT_BINS};
use crate::matching::dtw::{banded_dtw, lower_bound, CostMetric};
use crate::matching::features::Features;
use crate::matching::template::{MatchTemplate, TemplateExport};
use crate::workflow::Detection;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Synthetic examples generated per calibration phase
pub const CALIBRATION_SAMPLES: usize = 1000;

/// Negatives scored before the histogram range is fixed
pub const CALIBRATION_WARMUP: usize = 50;

/// Floor for confidence factor dot products
const CF_FLOOR: f64 = 0.01;

/// Best accepted class over trailing windows of a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMatch {
    pub class_id: ClassId,
    pub score: f64,
    /// Buffer-relative start index (inclusive)
    pub start: usize,
    /// Buffer-relative end index (exclusive)
    pub end: usize,
}

/// Calibration outcome for one template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub template: usize,
    pub class_id: ClassId,
    pub threshold: f64,
    pub positive_mean: f64,
    pub negative_p95: f64,
}

/// Per-query score against one template
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    cf: f64,
    lb: f64,
}

/// Banded-DTW matcher over a set of exemplars
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatcherConfig,
    metric: CostMetric,
    templates: Vec<MatchTemplate>,
    lengths: BTreeMap<ClassId, usize>,
    min_template_len: usize,
    max_template_len: usize,
}

impl Matcher {
    /// Exactly one cost measure must be selected
    pub fn new(config: MatcherConfig) -> crate::Result<Self> {
        let metric = match (config.inner_product, config.euclidean_distance) {
            (true, false) => CostMetric::InnerProduct,
            (false, true) => CostMetric::Euclidean,
            _ => {
                return Err(crate::Error::Config(
                    "exactly one of inner_product and euclidean_distance must be enabled"
                        .to_string(),
                ))
            }
        };
        if config.resample_count < 2 {
            return Err(crate::Error::Config(format!(
                "resample_count must be >= 2, got {}",
                config.resample_count
            )));
        }

        Ok(Self {
            config,
            metric,
            templates: Vec::new(),
            lengths: BTreeMap::new(),
            min_template_len: usize::MAX,
            max_template_len: 0,
        })
    }

    pub fn add_template(&mut self, sample: &Sample) -> crate::Result<()> {
        let template = MatchTemplate::new(&self.config, sample)?;
        self.push_template(template)
    }

    pub(crate) fn push_template(&mut self, template: MatchTemplate) -> crate::Result<()> {
        if let Some(first) = self.templates.first() {
            if first.dimension() != template.dimension() {
                return Err(crate::Error::DimensionMismatch {
                    expected: first.dimension(),
                    found: template.dimension(),
                });
            }
        }

        let length = template.length;
        let longest = self.lengths.entry(template.class_id).or_insert(length);
        if *longest < length {
            *longest = length;
        }
        self.max_template_len = self.max_template_len.max(length);
        self.min_template_len = self.min_template_len.min(length);

        self.templates.push(template);
        Ok(())
    }

    /// Flatten every template to its features and threshold
    pub fn export_templates(&self) -> Vec<TemplateExport> {
        self.templates.iter().map(MatchTemplate::export).collect()
    }

    /// Rebuild a trained matcher from exported templates
    pub fn import_templates(
        config: MatcherConfig,
        templates: Vec<TemplateExport>,
    ) -> crate::Result<Self> {
        let mut matcher = Self::new(config)?;
        for export in templates {
            let template = MatchTemplate::from_export(&matcher.config, export)?;
            matcher.push_template(template)?;
        }
        debug!(templates = matcher.templates.len(), "Imported matcher templates");
        Ok(matcher)
    }

    /// Use one fixed threshold for every template
    pub fn set_rejection_thresholds(&mut self, threshold: f64) {
        for template in self.templates.iter_mut() {
            template.rejection_threshold = threshold;
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn metric(&self) -> CostMetric {
        self.metric
    }

    pub fn templates(&self) -> &[MatchTemplate] {
        &self.templates
    }

    /// Point dimensionality of the templates
    pub fn dimension(&self) -> Option<usize> {
        self.templates.first().map(MatchTemplate::dimension)
    }

    /// Shortest exemplar length (0 without templates)
    pub fn min_template_len(&self) -> usize {
        if self.templates.is_empty() {
            0
        } else {
            self.min_template_len
        }
    }

    pub fn max_template_len(&self) -> usize {
        self.max_template_len
    }

    /// Longest exemplar length of a class
    pub fn template_len(&self, class_id: ClassId) -> Option<usize> {
        self.lengths.get(&class_id).copied()
    }

    fn confidence(&self, query: &Features, template: &MatchTemplate) -> f64 {
        let mut cf = 1.0;
        if self.config.cf_abs_distance {
            cf *= 1.0 / CF_FLOOR.max(query.abs.dot(&template.features().abs));
        }
        if self.config.cf_bb_widths {
            cf *= 1.0 / CF_FLOOR.max(query.bb.dot(&template.features().bb));
        }
        cf
    }

    fn dtw(&self, query: &Features, template: &MatchTemplate) -> f64 {
        banded_dtw(
            &query.vecs,
            &template.features().vecs,
            self.config.radius,
            self.metric,
        )
    }

    fn candidate(&self, query: &Features, index: usize) -> Candidate {
        let template = &self.templates[index];
        let cf = self.confidence(query, template);
        let lb = if self.config.lower_bound {
            let (lower, upper) = template.envelopes();
            cf * lower_bound(&query.vecs, lower, upper, self.metric)
        } else {
            0.0
        };
        Candidate { index, cf, lb }
    }

    fn features(&self, segment: &[Vector]) -> Option<Features> {
        if segment.len() < 2 {
            return None;
        }
        if let Some(dim) = self.dimension() {
            if segment.iter().any(|p| p.size() != dim) {
                warn!(expected = dim, "Segment dimension does not match templates");
                return None;
            }
        }
        Some(Features::new(&self.config, segment))
    }

    /// Score `segment` against the templates of one class.
    ///
    /// Returns whether any template accepted it and the best (lowest) score.
    pub fn is_match(&self, segment: &[Vector], class_id: ClassId) -> (bool, f64) {
        let query = match self.features(segment) {
            Some(query) => query,
            None => return (false, f64::INFINITY),
        };

        let mut accepted = false;
        let mut best = f64::INFINITY;

        for (index, template) in self.templates.iter().enumerate() {
            if template.class_id != class_id {
                continue;
            }

            let candidate = self.candidate(&query, index);
            let score = candidate.cf * self.dtw(&query, template);

            if score < template.rejection_threshold {
                accepted = true;
            }
            if score < best {
                best = score;
            }
        }

        (accepted, best)
    }

    /// Class of the best accepted template with its score
    pub fn classify_scored(&self, segment: &[Vector]) -> Option<(ClassId, f64)> {
        let query = self.features(segment)?;

        let mut candidates: Vec<Candidate> = (0..self.templates.len())
            .map(|index| self.candidate(&query, index))
            .collect();
        candidates.sort_by(|a, b| a.lb.total_cmp(&b.lb));

        let mut best = f64::INFINITY;
        let mut ret = None;

        for candidate in candidates {
            let template = &self.templates[candidate.index];

            if candidate.lb > template.rejection_threshold || candidate.lb > best {
                continue;
            }

            let score = candidate.cf * self.dtw(&query, template);
            if score > template.rejection_threshold {
                continue;
            }
            if score < best {
                best = score;
                ret = Some((template.class_id, score));
            }
        }

        ret
    }

    /// Class of the best accepted template
    pub fn classify(&self, segment: &[Vector]) -> Option<ClassId> {
        self.classify_scored(segment).map(|(class_id, _)| class_id)
    }

    /// Test each class against the trailing window of its longest exemplar
    /// length. Classes whose window exceeds the buffer are skipped.
    pub fn classify_window(&self, buffer: &RingBuffer<Vector>) -> Option<WindowMatch> {
        let mut best: Option<WindowMatch> = None;
        let mut tested: Vec<ClassId> = Vec::new();

        for template in &self.templates {
            let class_id = template.class_id;
            if tested.contains(&class_id) {
                continue;
            }
            tested.push(class_id);

            let len = match self.template_len(class_id) {
                Some(len) => len,
                None => {
                    warn!(class_id, "No exemplar length recorded for class");
                    return None;
                }
            };

            let trajectory = match buffer.trailing(len) {
                Some(trajectory) => trajectory,
                None => continue,
            };

            let (accepted, score) = self.is_match(&trajectory, class_id);
            if !accepted {
                continue;
            }

            if best.as_ref().map_or(true, |b| score < b.score) {
                best = Some(WindowMatch {
                    class_id,
                    score,
                    start: buffer.len() - len,
                    end: buffer.len(),
                });
            }
        }

        best
    }

    /// Every template that accepts `segment`, as detections over `[start, end]`
    pub fn match_all(&self, segment: &[Vector], start: i64, end: i64) -> Vec<Detection> {
        let query = match self.features(segment) {
            Some(query) => query,
            None => return Vec::new(),
        };

        self.templates
            .iter()
            .enumerate()
            .filter_map(|(index, template)| {
                let candidate = self.candidate(&query, index);
                let score = candidate.cf * self.dtw(&query, template);
                (score < template.rejection_threshold)
                    .then(|| Detection::new(template.class_id, start, end, score))
            })
            .collect()
    }

    /// Learn a rejection threshold per template from an OS-seeded RNG
    pub fn calibrate(
        &mut self,
        gpsr_n: usize,
        gpsr_r: usize,
        beta: f64,
    ) -> crate::Result<Vec<CalibrationReport>> {
        let mut rng = StdRng::from_entropy();
        self.calibrate_with_rng(gpsr_n, gpsr_r, beta, &mut rng)
    }

    /// Learn a rejection threshold per template.
    ///
    /// Negatives splice random halves of two exemplars; the first
    /// [`CALIBRATION_WARMUP`] of them only fix the histogram range. Positives
    /// are GPSR variations of each exemplar. Scores are raw DTW costs.
    pub fn calibrate_with_rng<R: Rng + ?Sized>(
        &mut self,
        gpsr_n: usize,
        gpsr_r: usize,
        beta: f64,
        rng: &mut R,
    ) -> crate::Result<Vec<CalibrationReport>> {
        let count = self.templates.len();
        if count == 0 {
            return Err(crate::Error::Calibration(
                "no templates to calibrate".to_string(),
            ));
        }
        if let Some(index) = self.templates.iter().position(|t| t.trajectory().len() < 2) {
            return Err(crate::Error::Calibration(format!(
                "template {} has no exemplar trajectory (imported templates keep their thresholds)",
                index
            )));
        }

        let mut worst_score: f64 = 0.0;
        let mut distributions: Vec<ScoreDistributions> = Vec::new();

        for i in 0..CALIBRATION_SAMPLES {
            let mut synthetic = Vec::new();
            for _ in 0..2 {
                let trajectory = self.templates[rng.gen_range(0..count)].trajectory();
                let half = trajectory.len() / 2;
                let start = rng.gen_range(0..half.max(1));
                synthetic.extend_from_slice(&trajectory[start..start + half]);
            }

            let features = match self.features(&synthetic) {
                Some(features) => features,
                None => continue,
            };

            let scores: Vec<f64> = self
                .templates
                .par_iter()
                .map(|template| self.dtw(&features, template))
                .collect();

            for (t, score) in scores.into_iter().enumerate() {
                if score.is_finite() && worst_score < score {
                    worst_score = score;
                }
                if i > CALIBRATION_WARMUP {
                    distributions[t].add_negative_score(score);
                }
            }

            if i == CALIBRATION_WARMUP {
                debug!(worst_score, "Fixed negative score range");
                distributions = (0..count)
                    .map(|_| ScoreDistributions::new(worst_score, DEFAULT_BINS))
                    .collect();
            }
        }

        let seeds: Vec<u64> = (0..count).map(|_| rng.gen()).collect();
        let positives: Vec<Vec<f64>> = self
            .templates
            .par_iter()
            .zip(seeds)
            .map(|(template, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..CALIBRATION_SAMPLES)
                    .filter_map(|_| {
                        let synthetic = gpsr(
                            template.trajectory(),
                            gpsr_n,
                            DEFAULT_GPSR_VARIANCE,
                            gpsr_r,
                            &mut rng,
                        );
                        let features = self.features(&synthetic)?;
                        Some(self.dtw(&features, template))
                    })
                    .collect()
            })
            .collect();

        for (dist, scores) in distributions.iter_mut().zip(positives) {
            for score in scores {
                dist.add_positive_score(score);
            }
        }

        let mut reports = Vec::with_capacity(count);
        for (index, (template, dist)) in self
            .templates
            .iter_mut()
            .zip(&distributions)
            .enumerate()
        {
            let threshold = dist.rejection_threshold(beta);
            template.rejection_threshold = threshold;

            let report = CalibrationReport {
                template: index,
                class_id: template.class_id,
                threshold,
                positive_mean: dist.positive_mean(),
                negative_p95: dist.negative_percentile(0.95).unwrap_or(f64::INFINITY),
            };
            debug!(
                class_id = report.class_id,
                threshold,
                positive_mean = report.positive_mean,
                negative_p95 = report.negative_p95,
                "Calibrated template"
            );
            reports.push(report);
        }

        info!(templates = count, "Calibration complete");
        Ok(reports)
    }
}
