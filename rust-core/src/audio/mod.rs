//! Capture hand-off, block segmentation and the processing thread

pub mod buffer;
pub mod processor;
pub mod segmenter;

pub use buffer::{SampleConsumer, SampleProducer, SampleRing};
pub use processor::SpectrogramEngine;
pub use segmenter::OverlapSegmenter;
