//! Consumers of per-frame results
//!
//! Sinks are invoked synchronously on the processing thread with borrowed
//! views of the transform buffers. Those buffers are overwritten by the next
//! frame, so a sink that renders later must copy before returning.

use ndarray::{s, Array2};
use std::sync::{Arc, Mutex};

/// Receives the pre-window time-domain samples of every frame (n values)
pub trait WaveformSink {
    fn on_waveform(&mut self, samples: &[f64]);
}

/// Receives the polar magnitudes of every frame (n values)
pub trait SpectrumSink {
    fn on_magnitudes(&mut self, magnitudes: &[f64]);
}

impl<F: FnMut(&[f64])> WaveformSink for F {
    fn on_waveform(&mut self, samples: &[f64]) {
        self(samples)
    }
}

impl<F: FnMut(&[f64])> SpectrumSink for F {
    fn on_magnitudes(&mut self, magnitudes: &[f64]) {
        self(magnitudes)
    }
}

/// Keeps a copy of the most recent waveform and spectrum
///
/// The copy reuses its storage, so after the first frame of a given
/// resolution no further allocation happens. Behind a `SharedSink` either
/// half of a frame can be dropped; a pair is only handed out when both
/// halves came from the same frame.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    waveform: Vec<f64>,
    magnitudes: Vec<f64>,

    /// Number of spectra received so far
    frames: u64,

    /// Value of `frames` at the last `take_if_new`
    seen: u64,

    /// A waveform arrived that no spectrum has been paired with yet
    waveform_pending: bool,

    /// `waveform` and `magnitudes` belong to the same frame
    paired: bool,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waveform(&self) -> &[f64] {
        &self.waveform
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Total spectra received
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether the stored waveform and spectrum come from one frame
    pub fn is_paired(&self) -> bool {
        self.paired
    }

    /// Copy out (waveform, magnitudes) if a complete frame arrived since the
    /// last call
    pub fn take_if_new(&mut self) -> Option<(Vec<f64>, Vec<f64>)> {
        if self.frames == self.seen || !self.paired {
            return None;
        }
        self.seen = self.frames;
        Some((self.waveform.clone(), self.magnitudes.clone()))
    }
}

fn copy_into(dst: &mut Vec<f64>, src: &[f64]) {
    dst.clear();
    dst.extend_from_slice(src);
}

impl WaveformSink for LatestFrame {
    fn on_waveform(&mut self, samples: &[f64]) {
        copy_into(&mut self.waveform, samples);
        self.waveform_pending = true;
        self.paired = false;
    }
}

impl SpectrumSink for LatestFrame {
    fn on_magnitudes(&mut self, magnitudes: &[f64]) {
        copy_into(&mut self.magnitudes, magnitudes);
        self.frames += 1;
        self.paired = self.waveform_pending;
        self.waveform_pending = false;
    }
}

/// Scrolling spectrogram: the last `rows` spectra, one row per frame
///
/// Only bins `0..=n/2` are kept; the upper half mirrors them for real input.
pub struct SpectrogramHistory {
    rows: Array2<f64>,

    /// Row the next spectrum is written to
    cursor: usize,

    /// Rows written so far, saturating at capacity
    filled: usize,
}

impl SpectrogramHistory {
    /// History of `rows` spectra for frames of `resolution` samples
    pub fn new(rows: usize, resolution: usize) -> Self {
        Self {
            rows: Array2::zeros((rows.max(1), resolution / 2 + 1)),
            cursor: 0,
            filled: 0,
        }
    }

    /// Number of frequency bins per row
    pub fn bins(&self) -> usize {
        self.rows.ncols()
    }

    pub fn capacity(&self) -> usize {
        self.rows.nrows()
    }

    /// Rows currently holding data
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Filled rows in arrival order, oldest first
    pub fn ordered_rows(&self) -> Array2<f64> {
        let capacity = self.capacity();
        let start = if self.filled < capacity { 0 } else { self.cursor };
        let mut out = Array2::zeros((self.filled, self.bins()));
        for (dst, offset) in (0..self.filled).enumerate() {
            let src = (start + offset) % capacity;
            out.row_mut(dst).assign(&self.rows.row(src));
        }
        out
    }

    pub fn clear(&mut self) {
        self.rows.fill(0.0);
        self.cursor = 0;
        self.filled = 0;
    }
}

impl SpectrumSink for SpectrogramHistory {
    fn on_magnitudes(&mut self, magnitudes: &[f64]) {
        let bins = self.bins().min(magnitudes.len());
        let mut row = self.rows.row_mut(self.cursor);
        row.fill(0.0);
        for (dst, &src) in row.slice_mut(s![..bins]).iter_mut().zip(magnitudes) {
            *dst = src;
        }

        self.cursor = (self.cursor + 1) % self.capacity();
        self.filled = (self.filled + 1).min(self.capacity());
    }
}

/// A sink shared with a reader on another thread (e.g. a UI timer)
///
/// Delivery uses `try_lock`: if the reader holds the lock the frame is
/// dropped for this sink instead of stalling the processing thread.
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Handle for the reading side
    pub fn handle(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.inner)
    }
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: WaveformSink> WaveformSink for SharedSink<S> {
    fn on_waveform(&mut self, samples: &[f64]) {
        match self.inner.try_lock() {
            Ok(mut sink) => sink.on_waveform(samples),
            Err(_) => log::trace!("waveform sink busy, frame dropped"),
        }
    }
}

impl<S: SpectrumSink> SpectrumSink for SharedSink<S> {
    fn on_magnitudes(&mut self, magnitudes: &[f64]) {
        match self.inner.try_lock() {
            Ok(mut sink) => sink.on_magnitudes(magnitudes),
            Err(_) => log::trace!("spectrum sink busy, frame dropped"),
        }
    }
}
