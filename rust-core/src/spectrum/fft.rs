//! FFT engine over split real/imaginary arrays
//!
//! The transform pair is owned by the caller and reused for every frame;
//! the engine only keeps the planned FFT and its work buffers, all allocated
//! once at construction.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::error::PipelineError;

/// Fixed-size forward FFT of length `n = 2^log2n`
pub struct FftEngine {
    /// Stage count, n = 2^log2n
    log2n: u32,

    /// Planned forward transform
    fft: Arc<dyn Fft<f64>>,

    /// Interleaved work buffer (re/im are gathered here)
    buffer: Vec<Complex<f64>>,

    /// Scratch space required by the planned algorithm
    scratch: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Plan a forward transform
    ///
    /// # Arguments
    /// * `log2n` - Stage count; the transform length is n = 2^log2n
    pub fn new(log2n: u32) -> Self {
        let size = 1usize << log2n;
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();

        Self {
            log2n,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// In-place forward transform of the complex sequence `re + i*im`
    ///
    /// Afterwards `re`/`im` hold X[k] = Σ x[j]·exp(-2πi·jk/n) in natural
    /// order, unnormalized.
    ///
    /// # Arguments
    /// * `re` - Real parts, length n
    /// * `im` - Imaginary parts, length n
    pub fn forward(&mut self, re: &mut [f64], im: &mut [f64]) -> Result<(), PipelineError> {
        let size = self.size();
        check_len(size, re.len())?;
        check_len(size, im.len())?;

        for ((c, &r), &i) in self.buffer.iter_mut().zip(re.iter()).zip(im.iter()) {
            *c = Complex::new(r, i);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for ((c, r), i) in self.buffer.iter().zip(re.iter_mut()).zip(im.iter_mut()) {
            *r = c.re;
            *i = c.im;
        }

        Ok(())
    }

    /// FFT size n
    pub fn size(&self) -> usize {
        1usize << self.log2n
    }

    /// Stage count log2(n)
    pub fn log2n(&self) -> u32 {
        self.log2n
    }
}

#[inline]
fn check_len(expected: usize, actual: usize) -> Result<(), PipelineError> {
    if expected == actual {
        Ok(())
    } else {
        Err(PipelineError::BufferLength { expected, actual })
    }
}

/// Replace a rectangular spectrum by its polar form, in place
///
/// `re[i]` becomes the magnitude and `im[i]` the phase (atan2), for every
/// index including the mirrored upper half.
pub fn to_polar(re: &mut [f64], im: &mut [f64]) -> Result<(), PipelineError> {
    check_len(re.len(), im.len())?;

    for (r, i) in re.iter_mut().zip(im.iter_mut()) {
        let (x, y) = (*r, *i);
        *r = (x * x + y * y).sqrt();
        *i = y.atan2(x);
    }

    Ok(())
}
