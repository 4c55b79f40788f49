//! Continuous segmentation
//!
//! Online, per-frame detection of gesture boundaries in an unsegmented
//! stream. Each exemplar keeps a rolling DTW row over its direction vectors;
//! the rightmost column's normalized cost is that exemplar's score for the
//! frame. Scores pass through an adaptive local-minimum [`Trigger`] and a
//! four-state [`EventFsm`] that reports each detection once.
//!
//! Cost per frame is O(templates x directions).

pub mod element;
pub mod events;
pub mod segmentor;
pub mod template;
pub mod trigger;

pub use element::Cell;
pub use events::{select_triggered, EventFsm, FsmState};
pub use segmentor::{SegmentResult, Segmentor};
pub use template::{FrameScore, SegmentTemplate};
pub use trigger::Trigger;
