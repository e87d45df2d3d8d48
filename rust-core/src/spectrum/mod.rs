//! Windowing, FFT and per-frame spectral analysis

pub mod analysis;
pub mod fft;
pub mod windowing;

pub use analysis::FrameAnalyzer;
pub use fft::{to_polar, FftEngine};
pub use windowing::WindowKind;
