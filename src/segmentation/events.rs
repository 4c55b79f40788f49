//! Event state machine
//!
//! Turns a template's per-frame corrected scores into discrete detections.
//!
//! ```text
//! WAIT_FOR_START --score < threshold--> LOOKING_FOR_MINIMUM
//! LOOKING_FOR_MINIMUM --minimum unbeaten for latency frames--> TRIGGER
//! TRIGGER --next frame--> WAIT_FOR_END
//! WAIT_FOR_END --score > rejection threshold--> WAIT_FOR_START
//! ```
//!
//! `TRIGGER` lasts exactly one frame; that frame is the externally visible
//! "fire". Cross-template arbitration lives in [`select_triggered`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsmState {
    WaitForStart,
    LookingForMinimum,
    Trigger,
    WaitForEnd,
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WaitForStart => "wait for start",
            Self::LookingForMinimum => "looking for minimum",
            Self::Trigger => "trigger",
            Self::WaitForEnd => "wait for end",
        };
        f.write_str(name)
    }
}

/// Per-template detection state machine
#[derive(Debug, Clone)]
pub struct EventFsm {
    state: FsmState,
    /// Score reported with the current minimum
    pub score: f64,
    /// Lowest score seen while looking for the minimum
    pub minimum: f64,
    pub start_frame: i64,
    pub end_frame: i64,
    /// End frame of the detection that cancelled this one
    pub boundary: i64,
    latency_frame_count: usize,
    rejection_threshold: Option<f64>,
}

impl EventFsm {
    /// `rejection_threshold` gates the WAIT_FOR_END exit. When `None` the
    /// per-frame adaptive threshold is used instead.
    pub fn new(latency_frame_count: usize, rejection_threshold: Option<f64>) -> Self {
        let mut fsm = Self {
            state: FsmState::WaitForStart,
            score: f64::INFINITY,
            minimum: f64::INFINITY,
            start_frame: -1,
            end_frame: -1,
            boundary: -1,
            latency_frame_count,
            rejection_threshold,
        };
        fsm.set_wait_for_start();
        fsm
    }

    pub fn state(&self) -> FsmState {
        self.state
    }

    pub fn triggered(&self) -> bool {
        self.state == FsmState::Trigger
    }

    pub fn set_rejection_threshold(&mut self, threshold: Option<f64>) {
        self.rejection_threshold = threshold;
    }

    fn set_wait_for_start(&mut self) {
        self.state = FsmState::WaitForStart;
        self.minimum = f64::INFINITY;
        self.score = self.minimum;
        self.start_frame = -1;
        self.end_frame = -1;
    }

    /// Back to WAIT_FOR_START, boundary included
    pub fn reset(&mut self) {
        self.set_wait_for_start();
        self.boundary = -1;
    }

    /// Advance one frame
    pub fn update(&mut self, score: f64, threshold: f64, start: i64, end: i64, frame: i64) {
        if self.state == FsmState::WaitForStart {
            self.minimum = score;
            if score < threshold {
                self.state = FsmState::LookingForMinimum;
            }
        }

        if self.state == FsmState::LookingForMinimum {
            if score <= self.minimum {
                self.minimum = score;
                self.score = score;
                self.start_frame = start;
                self.end_frame = end;
            }

            if frame - self.end_frame >= self.latency_frame_count as i64 {
                self.state = FsmState::Trigger;
                return;
            }
        }

        if self.state == FsmState::Trigger {
            self.state = FsmState::WaitForEnd;
        }

        if self.state == FsmState::WaitForEnd {
            let exit = self.rejection_threshold.unwrap_or(threshold);
            if score > exit {
                self.state = FsmState::WaitForStart;
            }
        }
    }

    /// Suppress this detection in favour of one ending at `boundary`
    pub fn set_wait_for_end(&mut self, boundary: i64) {
        self.boundary = boundary;
        self.state = FsmState::WaitForEnd;
    }

    /// Discard a rejected detection. The boundary is kept so a better
    /// segmentation of the same motion can still fire quickly.
    pub fn false_positive(&mut self) {
        self.set_wait_for_start();
    }
}

/// Pick the detection to report among all templates this frame.
///
/// With `cancel_with_better`, a triggered machine whose minimum is beaten by
/// any other machine is moved to WAIT_FOR_END instead. Returns the index of
/// the first machine still triggered.
pub fn select_triggered(fsms: &mut [&mut EventFsm], cancel_with_better: bool) -> Option<usize> {
    let triggered: Vec<usize> = (0..fsms.len()).filter(|i| fsms[*i].triggered()).collect();

    if triggered.is_empty() {
        return None;
    }

    for &i in &triggered {
        if cancel_with_better {
            let better = (0..fsms.len()).find(|&j| j != i && fsms[i].minimum > fsms[j].minimum);
            if let Some(j) = better {
                let boundary = fsms[j].end_frame;
                fsms[i].set_wait_for_end(boundary);
            }
        }
    }

    triggered.into_iter().find(|i| fsms[*i].triggered())
}
