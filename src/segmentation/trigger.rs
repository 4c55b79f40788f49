//! Adaptive local-minimum trigger
//!
//! Tracks the running mean of a template's uncorrected scores and fires on a
//! three-sample pattern of corrected scores:
//!
//! ```text
//! s1 >= s2 <= threshold,  s3 >= s2
//! ```
//!
//! where `threshold = mean / 2`. While scores are strictly falling the trigger
//! only remembers the span of the newest sample.

/// Per-template local-minimum detector
#[derive(Debug, Clone)]
pub struct Trigger {
    sum: f64,
    count: f64,
    s1: f64,
    s2: f64,
    s3: f64,
    /// Span recorded on the last falling sample
    pub start: i64,
    pub end: i64,
    check: bool,
}

impl Trigger {
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0.0,
            s1: f64::INFINITY,
            s2: f64::INFINITY,
            s3: f64::INFINITY,
            start: -1,
            end: -1,
            check: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Adaptive threshold: half the mean raw score seen so far
    pub fn threshold(&self) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }
        self.sum / self.count / 2.0
    }

    /// True when the last update completed the local-minimum pattern
    pub fn fired(&self) -> bool {
        self.check
    }

    /// Corrected score history, oldest first
    pub fn history(&self) -> [f64; 3] {
        [self.s1, self.s2, self.s3]
    }

    /// Feed one raw score with its correction factor and candidate span
    pub fn update(&mut self, score: f64, correction: f64, start: i64, end: i64) {
        self.sum += score;
        self.count += 1.0;

        self.s1 = self.s2;
        self.s2 = self.s3;
        self.s3 = score * correction;

        let threshold = self.threshold();
        self.check = false;

        if self.s3 < self.s2 {
            self.start = start;
            self.end = end;
            return;
        }

        if self.s2 > threshold {
            return;
        }

        if self.s1 < self.s2 {
            return;
        }

        self.check = true;
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_half_mean() {
        let mut trigger = Trigger::new();
        trigger.update(4.0, 1.0, 0, 0);
        trigger.update(2.0, 1.0, 0, 1);
        assert!((trigger.threshold() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_ignores_correction() {
        let mut trigger = Trigger::new();
        trigger.update(2.0, 1000.0, 0, 0);
        assert!((trigger.threshold() - 1.0).abs() < 1e-12);
        assert_eq!(trigger.history()[2], 2000.0);
    }

    #[test]
    fn test_fires_once_at_local_minimum() {
        let mut trigger = Trigger::new();
        let scores = [10.0, 8.0, 6.0, 4.0, 1.0, 0.5, 2.0, 3.0, 4.0];
        let mut fired_at = Vec::new();

        for (frame, score) in scores.iter().enumerate() {
            trigger.update(*score, 1.0, 0, frame as i64);
            if trigger.fired() {
                fired_at.push(frame);
            }
        }

        // s2 = 0.5 is the minimum once 2.0 arrives
        assert_eq!(fired_at, vec![6]);
        assert_eq!(trigger.end, 5);
    }

    #[test]
    fn test_no_fire_while_decreasing() {
        let mut trigger = Trigger::new();
        for (frame, score) in [5.0, 4.0, 3.0, 2.0, 1.0].iter().enumerate() {
            trigger.update(*score, 1.0, 0, frame as i64);
            assert!(!trigger.fired());
            assert_eq!(trigger.end, frame as i64);
        }
    }

    #[test]
    fn test_no_fire_above_threshold() {
        let mut trigger = Trigger::new();
        // mean stays near 5, minimum 4.5 is above threshold 2.5
        for score in [5.0, 4.5, 5.5, 5.0] {
            trigger.update(score, 1.0, 0, 0);
            assert!(!trigger.fired());
        }
    }
}
