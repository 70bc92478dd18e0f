//! Streaming short-time transform processing.

pub mod processor;

pub use processor::{FrameLayout, Identity, ProcessorConfig, SpectralProcessor, StreamingTransformProcessor};
