//! Confirmed detections and their merge rule

use crate::capture::ClassId;
use serde::{Deserialize, Serialize};

/// A recognized gesture over an inclusive frame span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: ClassId,
    pub start: i64,
    pub end: i64,
    pub score: f64,
}

impl Detection {
    pub fn new(class_id: ClassId, start: i64, end: i64, score: f64) -> Self {
        Self {
            class_id,
            start,
            end,
            score,
        }
    }

    /// Span midpoint
    pub fn middle(&self) -> f64 {
        (self.start + self.end) as f64 / 2.0
    }

    /// Absorb `other` if it describes the same event.
    ///
    /// Same class and `other` starts no later than this detection's midpoint.
    /// The higher-scoring span survives. Returns false when the two are
    /// distinct events.
    pub fn merge(&mut self, other: &Detection) -> bool {
        if self.class_id != other.class_id {
            return false;
        }

        if self.middle() < other.start as f64 {
            return false;
        }

        if self.score < other.score {
            self.start = other.start;
            self.end = other.end;
            self.score = other.score;
        }

        true
    }
}

/// Deduplicated detections of a session
#[derive(Debug, Clone, Default)]
pub struct DetectionLog {
    detections: Vec<Detection>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge into an existing detection or append. Returns true when appended.
    pub fn record(&mut self, detection: Detection) -> bool {
        for existing in self.detections.iter_mut() {
            if existing.merge(&detection) {
                return false;
            }
        }
        self.detections.push(detection);
        true
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn clear(&mut self) {
        self.detections.clear();
    }

    pub fn into_vec(self) -> Vec<Detection> {
        self.detections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_keeps_higher_score() {
        let mut existing = Detection::new(1, 10, 30, 0.4);
        let newer = Detection::new(1, 15, 35, 0.9);

        assert!(existing.merge(&newer));
        assert_eq!(existing, Detection::new(1, 15, 35, 0.9));
    }

    #[test]
    fn test_overlapping_lower_score_absorbed() {
        let mut existing = Detection::new(1, 10, 30, 0.9);
        assert!(existing.merge(&Detection::new(1, 12, 31, 0.2)));
        assert_eq!(existing, Detection::new(1, 10, 30, 0.9));
    }

    #[test]
    fn test_non_overlapping_never_merge() {
        let mut existing = Detection::new(1, 10, 30, 0.4);
        assert!(!existing.merge(&Detection::new(1, 21, 40, 0.9)));
        assert_eq!(existing.end, 30);
    }

    #[test]
    fn test_different_class_never_merge() {
        let mut existing = Detection::new(1, 10, 30, 0.4);
        assert!(!existing.merge(&Detection::new(2, 12, 30, 0.9)));
    }

    #[test]
    fn test_log_records_distinct_events() {
        let mut log = DetectionLog::new();
        assert!(log.record(Detection::new(0, 0, 10, 0.5)));
        assert!(!log.record(Detection::new(0, 3, 12, 0.7)));
        assert!(log.record(Detection::new(0, 40, 50, 0.5)));
        assert!(log.record(Detection::new(1, 40, 50, 0.5)));

        assert_eq!(log.len(), 3);
        assert_eq!(log.detections()[0], Detection::new(0, 3, 12, 0.7));
    }
}
