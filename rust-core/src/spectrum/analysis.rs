//! Per-frame analysis: widen, window, transform, polar, dispatch
//!
//! Owns the transform pair (re, im) reused for every frame.

use super::fft::{to_polar, FftEngine};
use super::windowing::WindowKind;
use crate::error::PipelineError;
use crate::sinks::{SpectrumSink, WaveformSink};

/// Frame analyzer for a fixed resolution and window
pub struct FrameAnalyzer {
    window: WindowKind,
    fft: FftEngine,

    /// Time samples, then magnitudes
    re: Vec<f64>,

    /// Zeros, then phases
    im: Vec<f64>,
}

impl FrameAnalyzer {
    /// Allocate the transform pair
    ///
    /// # Arguments
    /// * `log2n` - Frame length exponent, n = 2^log2n
    /// * `window` - Window applied to every frame
    pub fn new(log2n: u32, window: WindowKind) -> Self {
        let fft = FftEngine::new(log2n);
        let size = fft.size();

        Self {
            window,
            fft,
            re: vec![0.0; size],
            im: vec![0.0; size],
        }
    }

    /// Process one frame and notify both sinks
    ///
    /// The waveform sink sees the frame widened to f64 before windowing; the
    /// spectrum sink sees the magnitudes of the windowed frame.
    ///
    /// # Arguments
    /// * `frame` - Exactly n raw samples
    /// * `waveform` - Receives the pre-window samples
    /// * `spectrum` - Receives the n magnitudes
    pub fn on_frame<W, S>(
        &mut self,
        frame: &[i16],
        waveform: &mut W,
        spectrum: &mut S,
    ) -> Result<(), PipelineError>
    where
        W: WaveformSink + ?Sized,
        S: SpectrumSink + ?Sized,
    {
        let size = self.size();
        if frame.len() != size {
            return Err(PipelineError::BufferLength {
                expected: size,
                actual: frame.len(),
            });
        }

        for (dst, &sample) in self.re.iter_mut().zip(frame) {
            *dst = f64::from(sample);
        }
        self.im.fill(0.0);

        waveform.on_waveform(&self.re);

        self.window.apply(&mut self.re);
        self.fft.forward(&mut self.re, &mut self.im)?;
        to_polar(&mut self.re, &mut self.im)?;

        spectrum.on_magnitudes(&self.re);

        Ok(())
    }

    /// Magnitudes of the last processed frame
    pub fn magnitudes(&self) -> &[f64] {
        &self.re
    }

    /// Phases of the last processed frame
    pub fn phases(&self) -> &[f64] {
        &self.im
    }

    /// Frame length n
    pub fn size(&self) -> usize {
        self.fft.size()
    }
}
