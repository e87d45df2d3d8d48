//! Spectrogram - real-time overlapped spectral analysis core
//!
//! Turns a stream of fixed-size capture blocks into half-overlapping,
//! windowed frames and their magnitude spectra, for waveform and
//! spectrogram displays.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod sinks;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use audio::{OverlapSegmenter, SampleProducer, SpectrogramEngine};
pub use config::{SpectrogramConfig, SUPPORTED_RESOLUTIONS};
pub use error::{ConfigError, EngineError, ExportError, PipelineError};
pub use export::{Classifier, ClassificationRequest, Exporter, SoundLabel};
pub use pipeline::Pipeline;
pub use sinks::{LatestFrame, SharedSink, SpectrogramHistory, SpectrumSink, WaveformSink};
pub use spectrum::{FftEngine, FrameAnalyzer, WindowKind};
