//! Incremental continuous segmentor
//!
//! Holds one [`SegmentTemplate`] per exemplar and a history of recent frames.
//! Every frame, the unit motion direction is fed to all templates (optionally
//! in parallel: templates share nothing mutable) and each template's event
//! machine state is reported. [`Segmentor::select`] then arbitrates between
//! templates that fired on the same frame.

use crate::app::config::{DeviceProfile, SegmentorConfig};
use crate::capture::{ClassId, RingBuffer, Sample};
use crate::math::Vector;
use crate::segmentation::events::{select_triggered, EventFsm, FsmState};
use crate::segmentation::template::SegmentTemplate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// History is sized to hold a very slow performance of the longest exemplar
const HISTORY_FACTOR: usize = 5;

/// One template's state after a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    /// Index of the template in the segmentor
    pub template: usize,
    pub class_id: ClassId,
    pub state: FsmState,
    /// Corrected score this frame
    pub score: f64,
    /// Adaptive trigger threshold this frame
    pub threshold: f64,
    /// Best corrected score of the current detection
    pub minimum: f64,
    /// Span of the best score (inclusive frame numbers, -1 while waiting)
    pub start_frame: i64,
    pub end_frame: i64,
    /// Warping path span ending at this frame
    pub candidate_start: i64,
    pub candidate_end: i64,
    /// Local-minimum trigger fired on this frame
    pub fired: bool,
}

impl SegmentResult {
    fn from_template(index: usize, template: &SegmentTemplate) -> Self {
        let fsm = template.fsm();
        let (score, threshold, candidate_start, candidate_end) = template
            .last_score()
            .map(|s| (s.corrected(), s.threshold, s.start_frame, s.end_frame))
            .unwrap_or((f64::INFINITY, 0.0, -1, -1));

        Self {
            template: index,
            class_id: template.class_id(),
            state: fsm.state(),
            score,
            threshold,
            minimum: fsm.minimum,
            start_frame: fsm.start_frame,
            end_frame: fsm.end_frame,
            candidate_start,
            candidate_end,
            fired: template.trigger().fired(),
        }
    }

    pub fn triggered(&self) -> bool {
        self.state == FsmState::Trigger
    }
}

/// Continuous segmentor over a set of exemplars
#[derive(Debug, Clone)]
pub struct Segmentor {
    profile: DeviceProfile,
    config: SegmentorConfig,
    templates: Vec<SegmentTemplate>,
    history: RingBuffer<Vector>,
    dimension: Option<usize>,
    last_frame: Option<i64>,
    last_point: Option<Vector>,
}

impl Segmentor {
    pub fn new(profile: DeviceProfile, config: SegmentorConfig) -> Self {
        Self {
            profile,
            config,
            templates: Vec::new(),
            history: RingBuffer::new(),
            dimension: None,
            last_frame: None,
            last_point: None,
        }
    }

    /// Add an exemplar. Resets every template and the frame history.
    pub fn add_sample(&mut self, sample: &Sample) -> crate::Result<()> {
        let dimension = sample.dimension();
        if let Some(expected) = self.dimension {
            if expected != dimension {
                return Err(crate::Error::DimensionMismatch {
                    expected,
                    found: dimension,
                });
            }
        }

        let template = SegmentTemplate::new(sample, &self.profile, &self.config)?;

        let size = sample.len() * HISTORY_FACTOR;
        if size > self.history.capacity() {
            self.history.resize(size);
        }

        self.templates.push(template);
        self.dimension = Some(dimension);
        self.reset();
        Ok(())
    }

    /// Add several exemplars
    pub fn add_samples<'a>(&mut self, samples: impl IntoIterator<Item = &'a Sample>) -> crate::Result<()> {
        for sample in samples {
            self.add_sample(sample)?;
        }
        Ok(())
    }

    /// Start a new session: clear matching state and frame history
    pub fn reset(&mut self) {
        for template in self.templates.iter_mut() {
            template.reset();
        }
        self.history.clear();
        self.last_frame = None;
        self.last_point = None;
    }

    /// Feed one frame.
    ///
    /// Frame numbers must not decrease; skipped numbers are back-filled in
    /// the history with the current point. Returns one result per template,
    /// or nothing when the frame is gated out (too little motion).
    pub fn process_frame(&mut self, point: &Vector, frame: i64) -> crate::Result<Vec<SegmentResult>> {
        if let Some(expected) = self.dimension {
            if expected != point.size() {
                return Err(crate::Error::DimensionMismatch {
                    expected,
                    found: point.size(),
                });
            }
        }

        let last_point = self.last_point.get_or_insert_with(|| point.clone()).clone();

        let mut last_frame = self.last_frame.unwrap_or(frame - 1);
        while last_frame < frame {
            self.history.insert(point.clone());
            last_frame += 1;
        }
        self.last_frame = Some(last_frame);

        let motion = point - &last_point;
        let length = motion.l2_norm();

        if self.profile.min_motion > 0.0 && length < self.profile.min_motion {
            trace!(frame, length, "Frame below minimum motion");
            return Ok(Vec::new());
        }

        self.last_point = Some(point.clone());

        if length <= f64::EPSILON {
            return Ok(Vec::new());
        }

        let direction = &motion / length;
        let history = &self.history;

        if self.config.parallel {
            self.templates.par_iter_mut().for_each(|template| {
                template.update(history, &direction, frame, length);
            });
        } else {
            for template in self.templates.iter_mut() {
                template.update(history, &direction, frame, length);
            }
        }

        Ok(self.results())
    }

    /// Current state of every template
    pub fn results(&self) -> Vec<SegmentResult> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| SegmentResult::from_template(i, t))
            .collect()
    }

    /// Pick the template to report this frame, if any fired
    pub fn select(&mut self) -> Option<SegmentResult> {
        let selected = {
            let mut fsms: Vec<&mut EventFsm> =
                self.templates.iter_mut().map(|t| t.fsm_mut()).collect();
            select_triggered(&mut fsms, self.config.cancel_with_better)?
        };

        let result = SegmentResult::from_template(selected, &self.templates[selected]);
        debug!(
            class_id = result.class_id,
            start = result.start_frame,
            end = result.end_frame,
            score = result.minimum,
            "Segment triggered"
        );
        Some(result)
    }

    /// Score ceiling for leaving WAIT_FOR_END, for current and future
    /// templates. `None` falls back to each template's adaptive threshold.
    pub fn set_rejection_threshold(&mut self, threshold: Option<f64>) {
        self.config.rejection_threshold = threshold;
        for template in self.templates.iter_mut() {
            template.fsm_mut().set_rejection_threshold(threshold);
        }
    }

    /// Reject a reported detection so the template can fire again quickly
    pub fn false_positive(&mut self, template: usize) {
        if let Some(t) = self.templates.get_mut(template) {
            t.fsm_mut().false_positive();
        }
    }

    pub fn templates(&self) -> &[SegmentTemplate] {
        &self.templates
    }

    pub fn history(&self) -> &RingBuffer<Vector> {
        &self.history
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::DeviceKind;

    fn p(x: f64, y: f64) -> Vector {
        Vector::new(vec![x, y])
    }

    fn line_segmentor(config: SegmentorConfig) -> Segmentor {
        let points: Vec<Vector> = (0..=20).map(|i| p(i as f64, 0.0)).collect();
        let sample = Sample::from_points(0, &points).unwrap();
        let mut segmentor = Segmentor::new(DeviceProfile::preset(DeviceKind::Kinect), config);
        segmentor.add_sample(&sample).unwrap();
        segmentor
    }

    #[test]
    fn test_add_sample_grows_history() {
        let segmentor = line_segmentor(SegmentorConfig::default());
        assert_eq!(segmentor.len(), 1);
        assert!(segmentor.history().capacity() >= 21 * HISTORY_FACTOR);
    }

    #[test]
    fn test_dimension_mismatch_reported() {
        let mut segmentor = line_segmentor(SegmentorConfig::default());
        let result = segmentor.process_frame(&Vector::new(vec![1.0, 2.0, 3.0]), 0);
        assert!(matches!(
            result,
            Err(crate::Error::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_first_and_stationary_frames_skipped() {
        let mut segmentor = line_segmentor(SegmentorConfig::default());
        assert!(segmentor.process_frame(&p(0.0, 0.0), 0).unwrap().is_empty());
        assert!(segmentor.process_frame(&p(0.0, 0.0), 1).unwrap().is_empty());
        assert_eq!(segmentor.process_frame(&p(1.0, 0.0), 2).unwrap().len(), 1);
        assert_eq!(segmentor.history().len(), 3);
    }

    #[test]
    fn test_frame_gaps_back_filled() {
        let mut segmentor = line_segmentor(SegmentorConfig::default());
        segmentor.process_frame(&p(0.0, 0.0), 0).unwrap();
        segmentor.process_frame(&p(1.0, 0.0), 4).unwrap();
        assert_eq!(segmentor.history().len(), 5);
        assert_eq!(segmentor.history()[-1], p(1.0, 0.0));
        assert_eq!(segmentor.history()[0], p(0.0, 0.0));
    }

    #[test]
    fn test_pointer_min_motion_gating() {
        let points: Vec<Vector> = (0..=20).map(|i| p(i as f64 * 20.0, 0.0)).collect();
        let sample = Sample::from_points(0, &points).unwrap();
        let mut segmentor = Segmentor::new(
            DeviceProfile::preset(DeviceKind::Mouse),
            SegmentorConfig::default(),
        );
        segmentor.add_sample(&sample).unwrap();

        segmentor.process_frame(&p(0.0, 0.0), 0).unwrap();
        // 5 px is below the 10 px gate
        assert!(segmentor.process_frame(&p(5.0, 0.0), 1).unwrap().is_empty());
        // measured from the last accepted point: 12 px
        assert_eq!(segmentor.process_frame(&p(12.0, 0.0), 2).unwrap().len(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential = line_segmentor(SegmentorConfig::default());
        let mut parallel = line_segmentor(SegmentorConfig {
            parallel: true,
            ..SegmentorConfig::default()
        });

        for frame in 0..40 {
            let angle = frame as f64 * 0.3;
            let point = p(frame as f64 + angle.cos(), angle.sin());
            let a = sequential.process_frame(&point, frame).unwrap();
            let b = parallel.process_frame(&point, frame).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut segmentor = line_segmentor(SegmentorConfig::default());
        segmentor.process_frame(&p(0.0, 0.0), 0).unwrap();
        segmentor.process_frame(&p(1.0, 0.0), 1).unwrap();

        segmentor.reset();
        assert!(segmentor.history().is_empty());
        assert!(segmentor.process_frame(&p(5.0, 5.0), 0).unwrap().is_empty());
    }
}
