//! Stream input
//!
//! Frame history and recorded gesture samples.

pub mod ring_buffer;
pub mod sample;

pub use ring_buffer::RingBuffer;
pub use sample::{ClassId, Sample};
