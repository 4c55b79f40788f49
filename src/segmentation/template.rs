//! Segmentor template
//!
//! A gesture exemplar prepared for incremental matching. Construction reduces
//! the trajectory to keypoints and unit direction vectors. The mutable part
//! (two ping-pong DP rows, the trigger and the event machine) is owned here
//! exclusively so templates can be updated in parallel.

use crate::analysis::simplification::{
    diagonal, path_length, remove_duplicates, remove_hooks, vectorize, DensitySimplifier,
    DEFAULT_DIAGONAL_FRACTION,
};
use crate::app::config::{DeviceProfile, SegmentorConfig};
use crate::capture::{ClassId, RingBuffer, Sample};
use crate::math::Vector;
use crate::segmentation::element::Cell;
use crate::segmentation::events::EventFsm;
use crate::segmentation::trigger::Trigger;
use tracing::debug;

/// Floor applied to every ratio denominator in the correction factor
const RATIO_FLOOR: f64 = 0.01;

/// Cap on each correction sub-factor and on their product
const MAX_CORRECTION: f64 = 2.0;

/// Multiplier for candidates shorter than the admissible duration
const SHORT_SPAN_PENALTY: f64 = 1000.0;

/// Scores produced by the last update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameScore {
    /// Normalized warping path cost of the rightmost column
    pub raw: f64,
    /// Pointer correction and short-span penalty
    pub correction: f64,
    /// Adaptive trigger threshold after this frame
    pub threshold: f64,
    pub start_frame: i64,
    pub end_frame: i64,
}

impl FrameScore {
    pub fn corrected(&self) -> f64 {
        self.raw * self.correction
    }
}

/// Per-class exemplar with its incremental matching state
#[derive(Debug, Clone)]
pub struct SegmentTemplate {
    class_id: ClassId,
    name: Option<String>,
    keypoints: Vec<Vector>,
    directions: Vec<Vector>,
    min_frames: usize,
    max_frames: usize,
    closedness: f64,
    f2l: Vector,
    weight_closedness: f64,
    weight_f2l: f64,
    pointer: bool,
    start_cost: f64,

    rows: [Vec<Cell>; 2],
    current: usize,
    trigger: Trigger,
    fsm: EventFsm,
    last: Option<FrameScore>,
}

impl SegmentTemplate {
    /// Prepare a template from a recorded sample
    pub fn new(
        sample: &Sample,
        profile: &DeviceProfile,
        config: &SegmentorConfig,
    ) -> crate::Result<Self> {
        let trajectory = sample.trajectory_for(config.use_filtered);
        let deduped = remove_duplicates(trajectory);
        if deduped.len() < 2 {
            return Err(crate::Error::Template(format!(
                "class {} exemplar needs at least two distinct points, got {}",
                sample.class_id,
                deduped.len()
            )));
        }

        let diag = diagonal(&deduped);
        let simplifier = DensitySimplifier::new(diag * DEFAULT_DIAGONAL_FRACTION);
        let mut keypoints = simplifier.simplify(&deduped);
        if profile.pointer {
            keypoints = remove_hooks(keypoints);
        }

        let directions = vectorize(&keypoints, true);

        let mut f2l = &keypoints[keypoints.len() - 1] - &keypoints[0];
        let f2l_length = f2l.l2_norm();
        let closedness = f2l_length / path_length(&deduped);
        f2l.normalize();

        let weight_closedness = 1.0 - f2l_length / diag;
        let weight_f2l = (2.0 * f2l_length / diag).min(1.0);

        debug!(
            class_id = sample.class_id,
            points = trajectory.len(),
            keypoints = keypoints.len(),
            closedness,
            "Prepared segmentor template"
        );

        let mut template = Self {
            class_id: sample.class_id,
            name: sample.name.clone(),
            min_frames: trajectory.len() / 2,
            max_frames: trajectory.len() * 2,
            keypoints,
            directions,
            closedness,
            f2l,
            weight_closedness,
            weight_f2l,
            pointer: profile.pointer,
            start_cost: profile.start_cost(),
            rows: [Vec::new(), Vec::new()],
            current: 0,
            trigger: Trigger::new(),
            fsm: EventFsm::new(config.latency_frame_count, config.rejection_threshold),
            last: None,
        };
        template.reset();
        Ok(template)
    }

    /// Clear DP rows, trigger and event machine
    pub fn reset(&mut self) {
        let width = self.directions.len() + 1;
        for row in self.rows.iter_mut() {
            row.clear();
            row.extend((0..width).map(|col| Cell::new(col, self.start_cost)));
        }
        self.current = 0;
        self.trigger.reset();
        self.fsm.reset();
        self.last = None;
    }

    /// Advance by one frame.
    ///
    /// `direction` is the unit vector from the previous to the current point
    /// and `length` the distance between them. `history` must already hold
    /// the current point.
    pub fn update(
        &mut self,
        history: &RingBuffer<Vector>,
        direction: &Vector,
        frame: i64,
        length: f64,
    ) -> FrameScore {
        self.current = (self.current + 1) % 2;
        let (low, high) = self.rows.split_at_mut(1);
        let (previous, current) = if self.current == 0 {
            (&high[0], &mut low[0])
        } else {
            (&low[0], &mut high[0])
        };

        current[0].start_frame = frame;

        for col in 1..current.len() {
            let dot = direction.dot(&self.directions[col - 1]);
            let cost = (1.0 - dot.clamp(-1.0, 1.0)).powi(2);

            // insertion, match, deletion
            let mut extend = current[col - 1];
            let mut minimum = extend.normalized_cost();
            for candidate in [previous[col - 1], previous[col]] {
                let normalized = candidate.normalized_cost();
                if normalized < minimum {
                    extend = candidate;
                    minimum = normalized;
                }
            }

            current[col].extend(&extend, frame, cost, length);
        }

        let cell = current[current.len() - 1];
        let duration = cell.end_frame - cell.start_frame + 1;

        let mut correction = if self.pointer {
            self.pointer_correction(history, duration, cell.total)
        } else {
            1.0
        };
        if duration < self.min_frames as i64 {
            correction *= SHORT_SPAN_PENALTY;
        }

        let raw = cell.normalized_cost();
        self.trigger
            .update(raw, correction, cell.start_frame, cell.end_frame);
        let threshold = self.trigger.threshold();

        self.fsm.update(
            raw * correction,
            threshold,
            cell.start_frame,
            cell.end_frame,
            frame,
        );

        let score = FrameScore {
            raw,
            correction,
            threshold,
            start_frame: cell.start_frame,
            end_frame: cell.end_frame,
        };
        self.last = Some(score);
        score
    }

    /// Compare the observed displacement over the candidate span with the
    /// exemplar's closedness and first-to-last direction
    fn pointer_correction(&self, history: &RingBuffer<Vector>, duration: i64, total: f64) -> f64 {
        if duration < 1 || duration as usize >= history.len().saturating_sub(1) {
            return 1.0;
        }

        let (newest, oldest) = match (history.get(-1), history.get(-(duration as isize))) {
            (Some(newest), Some(oldest)) => (newest, oldest),
            _ => return 1.0,
        };
        let mut displacement = newest - oldest;
        let distance = displacement.l2_norm();
        let observed = distance / total.max(RATIO_FLOOR);
        displacement.normalize();

        let ratio = observed.max(self.closedness) / observed.min(self.closedness).max(RATIO_FLOOR);
        let cf_closedness = (1.0 + self.weight_closedness * (ratio - 1.0)).min(MAX_CORRECTION);

        let misalignment = 1.0 - self.f2l.dot(&displacement).clamp(-1.0, 1.0);
        let cf_f2l = (1.0 + misalignment / 2.0 * self.weight_f2l).min(MAX_CORRECTION);

        (cf_closedness * cf_f2l).min(MAX_CORRECTION)
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn keypoints(&self) -> &[Vector] {
        &self.keypoints
    }

    /// Unit direction vectors, one fewer than the keypoints
    pub fn directions(&self) -> &[Vector] {
        &self.directions
    }

    /// Width of each DP row (direction count + 1)
    pub fn row_width(&self) -> usize {
        self.rows[self.current].len()
    }

    /// Shortest admissible match (frames)
    pub fn min_frames(&self) -> usize {
        self.min_frames
    }

    /// Longest expected match (frames)
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// First-to-last distance over path length
    pub fn closedness(&self) -> f64 {
        self.closedness
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn fsm(&self) -> &EventFsm {
        &self.fsm
    }

    pub fn fsm_mut(&mut self) -> &mut EventFsm {
        &mut self.fsm
    }

    /// Scores from the most recent update
    pub fn last_score(&self) -> Option<FrameScore> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::DeviceKind;

    fn p(x: f64, y: f64) -> Vector {
        Vector::new(vec![x, y])
    }

    fn line_sample() -> Sample {
        let points: Vec<Vector> = (0..=20).map(|i| p(i as f64, 0.0)).collect();
        Sample::from_points(0, &points).unwrap()
    }

    fn l_sample() -> Sample {
        let mut points: Vec<Vector> = (0..=10).map(|i| p(i as f64, 0.0)).collect();
        points.extend((1..=10).map(|i| p(10.0, i as f64)));
        Sample::from_points(1, &points).unwrap()
    }

    #[test]
    fn test_line_template_shape() {
        let profile = DeviceProfile::preset(DeviceKind::Kinect);
        let template =
            SegmentTemplate::new(&line_sample(), &profile, &SegmentorConfig::default()).unwrap();

        assert_eq!(template.keypoints().len(), 2);
        assert_eq!(template.directions().len(), 1);
        assert_eq!(template.directions()[0], p(1.0, 0.0));
        assert_eq!(template.row_width(), 2);
        assert_eq!(template.min_frames(), 10);
        assert_eq!(template.max_frames(), 42);
        assert!((template.closedness() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_direction_count_matches_keypoints() {
        let profile = DeviceProfile::preset(DeviceKind::Kinect);
        let template =
            SegmentTemplate::new(&l_sample(), &profile, &SegmentorConfig::default()).unwrap();

        assert_eq!(template.keypoints().len(), 3);
        assert_eq!(template.directions().len(), template.keypoints().len() - 1);
        assert_eq!(template.row_width(), template.directions().len() + 1);
        for direction in template.directions() {
            assert!((direction.l2_norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_degenerate_sample_rejected() {
        let profile = DeviceProfile::default();
        let sample = Sample::from_points(0, &[p(1.0, 1.0), p(1.0, 1.0)]).unwrap();
        let result = SegmentTemplate::new(&sample, &profile, &SegmentorConfig::default());
        assert!(matches!(result, Err(crate::Error::Template(_))));
    }

    #[test]
    fn test_matching_motion_scores_zero() {
        let profile = DeviceProfile::preset(DeviceKind::Kinect);
        let mut template =
            SegmentTemplate::new(&line_sample(), &profile, &SegmentorConfig::default()).unwrap();
        let mut history = RingBuffer::with_capacity(128);
        let right = p(1.0, 0.0);

        history.insert(p(0.0, 0.0));
        let mut score = None;
        for frame in 1..=15 {
            history.insert(p(frame as f64, 0.0));
            score = Some(template.update(&history, &right, frame, 1.0));
        }

        let score = score.unwrap();
        assert_eq!(score.raw, 0.0);
        assert_eq!(score.start_frame, 1);
        assert_eq!(score.end_frame, 15);
        assert_eq!(score.correction, 1.0);
    }

    #[test]
    fn test_short_span_penalty() {
        let profile = DeviceProfile::preset(DeviceKind::Kinect);
        let mut template =
            SegmentTemplate::new(&line_sample(), &profile, &SegmentorConfig::default()).unwrap();
        let mut history = RingBuffer::with_capacity(16);
        history.insert(p(0.0, 0.0));
        history.insert(p(0.0, 1.0));

        // orthogonal motion: every frame restarts from the sentinel
        let score = template.update(&history, &p(0.0, 1.0), 1, 1.0);
        assert!((score.raw - 1.0).abs() < 1e-12);
        assert_eq!(score.correction, SHORT_SPAN_PENALTY);
        assert_eq!(score.start_frame, score.end_frame);
    }

    #[test]
    fn test_reset_clears_state() {
        let profile = DeviceProfile::preset(DeviceKind::Kinect);
        let mut template =
            SegmentTemplate::new(&line_sample(), &profile, &SegmentorConfig::default()).unwrap();
        let mut history = RingBuffer::with_capacity(16);
        history.insert(p(0.0, 0.0));
        history.insert(p(1.0, 0.0));
        template.update(&history, &p(1.0, 0.0), 1, 1.0);
        assert!(template.last_score().is_some());

        template.reset();
        assert!(template.last_score().is_none());
        assert_eq!(template.trigger().threshold(), 0.0);
    }

    #[test]
    fn test_pointer_correction_bounded() {
        let profile = DeviceProfile::preset(DeviceKind::Mouse);
        let points: Vec<Vector> = (0..=40).map(|i| p(i as f64 * 10.0, 0.0)).collect();
        let sample = Sample::from_points(0, &points).unwrap();
        let mut template =
            SegmentTemplate::new(&sample, &profile, &SegmentorConfig::default()).unwrap();

        let mut history = RingBuffer::with_capacity(256);
        for i in 0..100 {
            history.insert(p(0.0, i as f64 * 10.0));
        }
        for frame in 100..160 {
            history.insert(p((frame - 99) as f64 * 10.0, 990.0));
            let score = template.update(&history, &p(1.0, 0.0), frame, 10.0);
            if frame - 100 >= template.min_frames() as i64 {
                assert!(score.correction >= 1.0);
                assert!(score.correction <= MAX_CORRECTION);
            }
        }
    }
}
