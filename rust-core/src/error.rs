//! Error types for configuration, the analysis pipeline and the export path

use thiserror::Error;

/// Rejected configuration. The pipeline keeps its previous configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Sampling rate must be positive (found: {0} Hz)")]
    InvalidSampleRate(u32),

    #[error("Frame resolution must be a power of two (found: {0})")]
    NotPowerOfTwo(usize),

    #[error("Unsupported frame resolution {0}")]
    UnsupportedResolution(usize),

    #[error("Unknown window kind: {0:?}")]
    UnknownWindow(String),

    #[error("Block length {block_len} is not a positive multiple of the half frame length {half_len}")]
    BlockLength { block_len: usize, half_len: usize },

    #[error("Failed to parse settings: {0}")]
    Parse(String),
}

/// Broken contract between capture and pipeline configuration.
///
/// These are never retried: the call that hit them is aborted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Pipeline is not configured")]
    NotConfigured,

    #[error("Raw block has {actual} samples, expected {expected}")]
    BlockLength { expected: usize, actual: usize },

    #[error("Buffer has {actual} samples, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Processing thread is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Pipeline lock poisoned by a panicking sink")]
    Poisoned,
}

/// Failures of the classification export path. Never propagated into the pipeline.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Classification request failed: {0}")]
    Transport(String),

    #[error("Failed to encode classification request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Classification service returned an empty label")]
    EmptyResponse,
}
