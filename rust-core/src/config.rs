//! Spectrogram configuration supplied by the settings store

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::spectrum::WindowKind;

/// Frame resolutions offered by the settings screen
pub const SUPPORTED_RESOLUTIONS: [usize; 8] = [64, 128, 256, 512, 1024, 2048, 4096, 8192];

/// Spectrogram configuration
///
/// Changing any field requires the reconfiguration barrier: the processing
/// thread is stopped and all pipeline buffers are reallocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Sampling rate in Hz (default: 16000)
    pub sample_rate: u32,

    /// Frame length n in samples, a power of two (default: 1024)
    pub resolution: usize,

    /// Window applied to every frame (default: Hanning)
    pub window: WindowKind,

    /// Capture block length L, a positive multiple of n/2 (default: 2048)
    pub block_len: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            resolution: 1024,
            window: WindowKind::Hanning,
            block_len: 2048,
        }
    }
}

impl SpectrogramConfig {
    pub fn new(sample_rate: u32, resolution: usize, window: WindowKind, block_len: usize) -> Self {
        Self {
            sample_rate,
            resolution,
            window,
            block_len,
        }
    }

    /// Parse settings JSON, e.g. `{"resolution": 2048, "window": "Blackman"}`
    ///
    /// Missing fields take their defaults; the result is validated.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject anything the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !self.resolution.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo(self.resolution));
        }
        if !SUPPORTED_RESOLUTIONS.contains(&self.resolution) {
            return Err(ConfigError::UnsupportedResolution(self.resolution));
        }

        let half_len = self.half_len();
        if self.block_len == 0 || self.block_len % half_len != 0 {
            return Err(ConfigError::BlockLength {
                block_len: self.block_len,
                half_len,
            });
        }

        Ok(())
    }

    /// Segment length h = n/2
    pub fn half_len(&self) -> usize {
        self.resolution / 2
    }

    /// Transform stage count, log2(n)
    pub fn log2_resolution(&self) -> u32 {
        self.resolution.trailing_zeros()
    }

    /// Slots in the segment ring, L/h + 1
    pub fn segment_count(&self) -> usize {
        self.block_len / self.half_len() + 1
    }

    /// Frames emitted per capture block, L/h
    pub fn frames_per_block(&self) -> usize {
        self.block_len / self.half_len()
    }

    /// Duration of one frame in milliseconds
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 * self.resolution as f64 / self.sample_rate as f64
    }

    /// Center frequency of FFT bin `bin` in Hz
    pub fn bin_frequency_hz(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.resolution as f64
    }

    /// Frequencies of the independent bins 0..=n/2, DC to Nyquist
    pub fn frequency_axis_hz(&self) -> Vec<f64> {
        (0..=self.resolution / 2)
            .map(|bin| self.bin_frequency_hz(bin))
            .collect()
    }
}
