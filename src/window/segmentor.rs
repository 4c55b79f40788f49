//! Fixed-size trailing window segmentor

use crate::app::config::WindowMode;
use crate::capture::RingBuffer;
use crate::math::Vector;
use crate::matching::{Matcher, WindowMatch};
use crate::workflow::Detection;
use tracing::trace;

/// Window sizes for a mode over the exemplar length range, ascending and
/// deduplicated
pub fn window_sizes(mode: WindowMode, min: usize, max: usize) -> Vec<usize> {
    let mid = min + max.saturating_sub(min) / 2;
    let mut sizes = match mode {
        WindowMode::Min => vec![min],
        WindowMode::Max => vec![max],
        WindowMode::MinMax => vec![min, max],
        WindowMode::MinMidMax => vec![min, mid, max],
        WindowMode::Mid => vec![mid],
    };
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

/// Trailing window front end
#[derive(Debug, Clone)]
pub struct WindowSegmentor {
    mode: WindowMode,
    sizes: Vec<usize>,
    history: RingBuffer<Vector>,
    /// Frames consumed since the last reset
    frames_seen: i64,
}

impl WindowSegmentor {
    /// Size the windows from the matcher's exemplar lengths
    pub fn new(matcher: &Matcher, mode: WindowMode) -> crate::Result<Self> {
        if matcher.templates().is_empty() {
            return Err(crate::Error::Template(
                "window segmentor needs at least one template".to_string(),
            ));
        }

        let min = matcher.min_template_len();
        let max = matcher.max_template_len();
        let sizes = window_sizes(mode, min, max);

        Ok(Self {
            mode,
            sizes,
            history: RingBuffer::with_capacity(max),
            frames_seen: 0,
        })
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn history(&self) -> &RingBuffer<Vector> {
        &self.history
    }

    /// Frame number of the newest point, if any
    pub fn latest_frame(&self) -> Option<i64> {
        (self.frames_seen > 0).then(|| self.frames_seen - 1)
    }

    pub fn update(&mut self, point: &Vector) {
        self.history.insert(point.clone());
        self.frames_seen += 1;
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.frames_seen = 0;
    }

    /// Every accepted match over every window size ending at the newest frame
    pub fn segment(&self, matcher: &Matcher) -> Vec<Detection> {
        let latest = match self.latest_frame() {
            Some(latest) => latest,
            None => return Vec::new(),
        };

        let mut detections = Vec::new();
        for &size in &self.sizes {
            let window = match self.history.trailing(size) {
                Some(window) => window,
                None => {
                    trace!(size, held = self.history.len(), "Window not yet segmentable");
                    break;
                }
            };

            let start = latest - size as i64 + 1;
            detections.extend(matcher.match_all(&window, start, latest));
        }
        detections
    }

    /// Best class over per-class trailing windows, as a detection
    pub fn segment_best(&self, matcher: &Matcher) -> Option<Detection> {
        let latest = self.latest_frame()?;
        let WindowMatch {
            class_id,
            score,
            start,
            end,
        } = matcher.classify_window(&self.history)?;

        let oldest = latest - self.history.len() as i64 + 1;
        Some(Detection::new(
            class_id,
            oldest + start as i64,
            oldest + end as i64 - 1,
            score,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::MatcherConfig;
    use crate::capture::Sample;

    fn p(x: f64, y: f64) -> Vector {
        Vector::new(vec![x, y])
    }

    fn matcher() -> Matcher {
        let mut matcher = Matcher::new(MatcherConfig::inner_product_defaults()).unwrap();
        let short: Vec<Vector> = (0..10).map(|i| p(i as f64, 0.0)).collect();
        let long: Vec<Vector> = (0..20).map(|i| p(0.0, i as f64)).collect();
        matcher.add_template(&Sample::from_points(0, &short).unwrap()).unwrap();
        matcher.add_template(&Sample::from_points(1, &long).unwrap()).unwrap();
        matcher.set_rejection_thresholds(1.0);
        matcher
    }

    #[test]
    fn test_window_sizes() {
        assert_eq!(window_sizes(WindowMode::Min, 10, 20), vec![10]);
        assert_eq!(window_sizes(WindowMode::Max, 10, 20), vec![20]);
        assert_eq!(window_sizes(WindowMode::MinMax, 10, 20), vec![10, 20]);
        assert_eq!(window_sizes(WindowMode::MinMidMax, 10, 20), vec![10, 15, 20]);
        assert_eq!(window_sizes(WindowMode::Mid, 10, 21), vec![15]);
        assert_eq!(window_sizes(WindowMode::MinMidMax, 12, 12), vec![12]);
    }

    #[test]
    fn test_requires_templates() {
        let matcher = Matcher::new(MatcherConfig::default()).unwrap();
        assert!(WindowSegmentor::new(&matcher, WindowMode::Min).is_err());
    }

    #[test]
    fn test_not_segmentable_until_window_filled() {
        let matcher = matcher();
        let mut window = WindowSegmentor::new(&matcher, WindowMode::Min).unwrap();
        assert!(window.segment(&matcher).is_empty());

        for i in 0..9 {
            window.update(&p(i as f64, 0.0));
        }
        assert!(window.segment(&matcher).is_empty());

        window.update(&p(9.0, 0.0));
        let detections = window.segment(&matcher);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 0);
        assert_eq!((detections[0].start, detections[0].end), (0, 9));
    }

    #[test]
    fn test_history_bounded_by_longest_template() {
        let matcher = matcher();
        let mut window = WindowSegmentor::new(&matcher, WindowMode::Max).unwrap();
        for i in 0..50 {
            window.update(&p(0.0, i as f64));
        }
        assert_eq!(window.history().len(), 20);
        assert_eq!(window.latest_frame(), Some(49));

        let detections = window.segment(&matcher);
        assert!(detections.iter().any(|d| d.class_id == 1 && d.start == 30 && d.end == 49));
    }

    #[test]
    fn test_segment_best_absolute_span() {
        let matcher = matcher();
        let mut window = WindowSegmentor::new(&matcher, WindowMode::Min).unwrap();
        for i in 0..30 {
            window.update(&p(0.0, i as f64 * 0.5));
        }

        let best = window.segment_best(&matcher).unwrap();
        assert_eq!(best.class_id, 1);
        assert_eq!((best.start, best.end), (10, 29));
        assert!(best.score < 1e-6);
    }

    #[test]
    fn test_reset() {
        let matcher = matcher();
        let mut window = WindowSegmentor::new(&matcher, WindowMode::Min).unwrap();
        window.update(&p(0.0, 0.0));
        window.reset();
        assert!(window.history().is_empty());
        assert_eq!(window.latest_frame(), None);
    }
}
