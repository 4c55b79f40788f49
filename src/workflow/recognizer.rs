//! Continuous recognizer
//!
//! Glue between a segmentation front end and the matcher. Each frame:
//!
//! ```text
//! point -> [EMA filter] -> front end -> candidate span(s) -> matcher -> DetectionLog
//! ```
//!
//! The incremental policy asks the segmentor for at most one triggered
//! template per frame and confirms its span with [`Matcher::is_match`]. The
//! window policy classifies trailing windows directly and reports every
//! acceptor.

use crate::analysis::filtering::{filter_sample, ExponentialMovingAverage};
use crate::app::config::{Config, FilterConfig, PolicyKind};
use crate::capture::{RingBuffer, Sample};
use crate::math::Vector;
use crate::matching::{CalibrationReport, Matcher, TemplateExport};
use crate::segmentation::{SegmentResult, Segmentor};
use crate::window::WindowSegmentor;
use crate::workflow::detection::{Detection, DetectionLog};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// Minimum frame history kept for slicing candidate spans
const MIN_FRAME_HISTORY: usize = 512;

/// Frame history relative to the longest exemplar
const FRAME_HISTORY_FACTOR: usize = 5;

/// How candidate segments are produced
#[derive(Debug, Clone)]
pub enum SegmentationPolicy {
    Incremental(Segmentor),
    Window(WindowSegmentor),
}

impl SegmentationPolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Incremental(_) => PolicyKind::Incremental,
            Self::Window(_) => PolicyKind::Window,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Incremental(segmentor) => segmentor.reset(),
            Self::Window(window) => window.reset(),
        }
    }
}

/// Frame-by-frame gesture recognizer
#[derive(Debug, Clone)]
pub struct ContinuousRecognizer {
    matcher: Matcher,
    policy: SegmentationPolicy,
    filter: Option<(ExponentialMovingAverage, f64)>,
    frames: RingBuffer<Vector>,
    next_frame: i64,
    dimension: usize,
    log: DetectionLog,
    calibration: Vec<CalibrationReport>,
}

impl ContinuousRecognizer {
    /// Train both engines on `samples`.
    ///
    /// With calibration enabled every template gets a learned threshold;
    /// otherwise the device's fixed threshold applies to all of them.
    pub fn new(config: &Config, samples: &[Sample]) -> crate::Result<Self> {
        config.validate()?;
        let samples = prepare(config, samples)?;

        let mut matcher = Matcher::new(config.matcher.clone())?;
        for sample in &samples {
            matcher.add_template(sample)?;
        }

        let calibration = if config.recognizer.calibrate {
            let settings = &config.recognizer.calibration;
            match settings.seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    matcher.calibrate_with_rng(settings.gpsr_n, settings.gpsr_r, settings.beta, &mut rng)?
                }
                None => matcher.calibrate(settings.gpsr_n, settings.gpsr_r, settings.beta)?,
            }
        } else {
            matcher.set_rejection_thresholds(config.device.rejection_threshold);
            Vec::new()
        };

        Self::assemble(config, &samples, matcher, calibration)
    }

    /// Build with a previously trained matcher.
    ///
    /// `templates` come from [`Matcher::export_templates`] and keep their
    /// thresholds; no calibration runs. `samples` still train the
    /// incremental segmentor.
    pub fn with_templates(
        config: &Config,
        samples: &[Sample],
        templates: Vec<TemplateExport>,
    ) -> crate::Result<Self> {
        config.validate()?;
        let samples = prepare(config, samples)?;

        let matcher = Matcher::import_templates(config.matcher.clone(), templates)?;
        if matcher.templates().is_empty() {
            return Err(crate::Error::Template(
                "no matcher templates to import".to_string(),
            ));
        }
        if let Some(found) = matcher.dimension() {
            let expected = samples[0].dimension();
            if found != expected {
                return Err(crate::Error::DimensionMismatch { expected, found });
            }
        }

        Self::assemble(config, &samples, matcher, Vec::new())
    }

    fn assemble(
        config: &Config,
        samples: &[Sample],
        matcher: Matcher,
        calibration: Vec<CalibrationReport>,
    ) -> crate::Result<Self> {
        let dimension = samples[0].dimension();

        let policy = match config.recognizer.policy {
            PolicyKind::Incremental => {
                let mut segmentor = Segmentor::new(config.device.clone(), config.segmentor.clone());
                segmentor.add_samples(samples)?;
                SegmentationPolicy::Incremental(segmentor)
            }
            PolicyKind::Window => {
                SegmentationPolicy::Window(WindowSegmentor::new(&matcher, config.window.mode)?)
            }
        };

        let filter = config.recognizer.filter.enabled.then(|| {
            let settings = &config.recognizer.filter;
            (ExponentialMovingAverage::new(settings.cutoff_hz), 1.0 / settings.fps)
        });

        let capacity = MIN_FRAME_HISTORY.max(matcher.max_template_len() * FRAME_HISTORY_FACTOR);

        info!(
            templates = matcher.templates().len(),
            policy = ?policy.kind(),
            calibrated = !calibration.is_empty(),
            "Recognizer ready"
        );

        Ok(Self {
            matcher,
            policy,
            filter,
            frames: RingBuffer::with_capacity(capacity),
            next_frame: 0,
            dimension,
            log: DetectionLog::new(),
            calibration,
        })
    }

    /// Feed one raw frame. Returns the detections that are new events
    /// (detections merged into an earlier one are not repeated).
    pub fn process_frame(&mut self, point: &Vector) -> crate::Result<Vec<Detection>> {
        if point.size() != self.dimension {
            return Err(crate::Error::DimensionMismatch {
                expected: self.dimension,
                found: point.size(),
            });
        }

        let point = match self.filter.as_mut() {
            Some((ema, dt)) => ema.filter(point, *dt),
            None => point.clone(),
        };

        let frame = self.next_frame;
        self.next_frame += 1;
        self.frames.insert(point.clone());

        let candidates = match &mut self.policy {
            SegmentationPolicy::Incremental(segmentor) => {
                segmentor.process_frame(&point, frame)?;
                match segmentor.select() {
                    Some(result) => confirm(&self.matcher, &self.frames, frame, &result)
                        .into_iter()
                        .collect(),
                    None => Vec::new(),
                }
            }
            SegmentationPolicy::Window(window) => {
                window.update(&point);
                window.segment(&self.matcher)
            }
        };

        let mut detections = Vec::new();
        for detection in candidates {
            if self.log.record(detection.clone()) {
                info!(
                    class_id = detection.class_id,
                    start = detection.start,
                    end = detection.end,
                    score = detection.score,
                    "Gesture detected"
                );
                detections.push(detection);
            }
        }
        Ok(detections)
    }

    /// Feed a whole session, returning the new detections in order
    pub fn process_frames<'a>(
        &mut self,
        points: impl IntoIterator<Item = &'a Vector>,
    ) -> crate::Result<Vec<Detection>> {
        let mut detections = Vec::new();
        for point in points {
            detections.extend(self.process_frame(point)?);
        }
        Ok(detections)
    }

    /// Start a new session: clears front end state, filter, frame history and log
    pub fn reset(&mut self) {
        self.policy.reset();
        if let Some((ema, _)) = self.filter.as_mut() {
            ema.reset();
        }
        self.frames.clear();
        self.next_frame = 0;
        self.log.clear();
    }

    pub fn log(&self) -> &DetectionLog {
        &self.log
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn policy(&self) -> &SegmentationPolicy {
        &self.policy
    }

    /// Per-template calibration outcome (empty with fixed thresholds)
    pub fn calibration(&self) -> &[CalibrationReport] {
        &self.calibration
    }

    /// Frames consumed since the last reset
    pub fn frame_count(&self) -> i64 {
        self.next_frame
    }
}

/// Validate the training set and apply exemplar filtering
fn prepare(config: &Config, samples: &[Sample]) -> crate::Result<Vec<Sample>> {
    if samples.is_empty() {
        return Err(crate::Error::Template(
            "recognizer needs at least one training sample".to_string(),
        ));
    }
    prepare_samples(&config.recognizer.filter, config.segmentor.use_filtered, samples)
}

/// Attach CMA-filtered trajectories where the segmentor wants them and the
/// sample lacks one
fn prepare_samples(
    filter: &FilterConfig,
    use_filtered: bool,
    samples: &[Sample],
) -> crate::Result<Vec<Sample>> {
    samples
        .iter()
        .map(|sample| {
            sample.validate()?;
            if filter.enabled && use_filtered && sample.filtered().is_none() {
                filter_sample(sample.clone(), filter.cutoff_hz, filter.fps)
            } else {
                Ok(sample.clone())
            }
        })
        .collect()
}

/// Confirm a triggered segmentor span with the matcher
fn confirm(
    matcher: &Matcher,
    frames: &RingBuffer<Vector>,
    frame: i64,
    result: &SegmentResult,
) -> Option<Detection> {
    let oldest = frame - frames.len() as i64 + 1;
    let start = result.start_frame.max(oldest);
    let end = result.end_frame.min(frame);
    if start > end {
        debug!(
            start = result.start_frame,
            end = result.end_frame,
            "Candidate span no longer in frame history"
        );
        return None;
    }

    let segment = frames.range((start - oldest) as usize, (end - oldest) as usize + 1);
    let (accepted, score) = matcher.is_match(&segment, result.class_id);
    if !accepted {
        debug!(
            class_id = result.class_id,
            start = result.start_frame,
            end = result.end_frame,
            score,
            "Candidate rejected by matcher"
        );
        return None;
    }

    Some(Detection::new(
        result.class_id,
        result.start_frame,
        result.end_frame,
        score,
    ))
}
