//! Window front end
//!
//! Non-incremental baseline: every frame, slice a few trailing windows of
//! fixed size and hand each one to the matcher. No state machine; repeated
//! detections of one event are folded by the [`crate::workflow::DetectionLog`]
//! merge rule.

pub mod segmentor;

pub use crate::app::config::WindowMode;
pub use segmentor::{window_sizes, WindowSegmentor};
