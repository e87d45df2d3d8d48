//! Pipeline coordinator: raw blocks in, frames out to the sinks
//!
//! Owns every buffer of the analysis chain. Buffers are allocated by
//! `configure` and never touched by anything else; `ingest` runs the whole
//! segment → window → FFT → polar chain for one block synchronously.

use crate::audio::OverlapSegmenter;
use crate::config::SpectrogramConfig;
use crate::error::{ConfigError, PipelineError};
use crate::sinks::{SpectrumSink, WaveformSink};
use crate::spectrum::FrameAnalyzer;

/// Buffers allocated for one configuration
struct Stages {
    config: SpectrogramConfig,
    segmenter: OverlapSegmenter,
    analyzer: FrameAnalyzer,
}

impl Stages {
    fn allocate(config: SpectrogramConfig) -> Self {
        Self {
            segmenter: OverlapSegmenter::new(config.half_len(), config.segment_count()),
            analyzer: FrameAnalyzer::new(config.log2_resolution(), config.window),
            config,
        }
    }
}

/// Real-time spectrogram pipeline
pub struct Pipeline {
    /// None while idle (never configured, or released)
    stages: Option<Stages>,

    waveform_sink: Box<dyn WaveformSink + Send>,
    spectrum_sink: Box<dyn SpectrumSink + Send>,

    /// Frames processed since the last successful `configure`
    frames_processed: u64,
}

impl Pipeline {
    /// Idle pipeline delivering to the given sinks
    pub fn new<W, S>(waveform_sink: W, spectrum_sink: S) -> Self
    where
        W: WaveformSink + Send + 'static,
        S: SpectrumSink + Send + 'static,
    {
        Self {
            stages: None,
            waveform_sink: Box::new(waveform_sink),
            spectrum_sink: Box::new(spectrum_sink),
            frames_processed: 0,
        }
    }

    /// Validate `config` and reallocate every buffer for it
    ///
    /// On error the previous configuration (or the idle state) is kept.
    /// On success the carry-over restarts from silence.
    pub fn configure(&mut self, config: SpectrogramConfig) -> Result<(), ConfigError> {
        config.validate()?;

        // Release before allocating so two buffer sets never coexist
        self.stages = None;
        self.stages = Some(Stages::allocate(config));
        self.frames_processed = 0;

        log::debug!(
            "pipeline configured: n={} window={} block={} ({} frames/block) at {} Hz",
            config.resolution,
            config.window,
            config.block_len,
            config.frames_per_block(),
            config.sample_rate
        );
        Ok(())
    }

    /// Segment and analyze one raw block, returning the number of frames emitted
    pub fn ingest(&mut self, block: &[i16]) -> Result<usize, PipelineError> {
        let stages = self.stages.as_mut().ok_or(PipelineError::NotConfigured)?;
        let analyzer = &mut stages.analyzer;
        let waveform = self.waveform_sink.as_mut();
        let spectrum = self.spectrum_sink.as_mut();

        let emitted = stages
            .segmenter
            .ingest(block, |frame| analyzer.on_frame(frame, &mut *waveform, &mut *spectrum))?;

        self.frames_processed += emitted as u64;
        Ok(emitted)
    }

    /// Drop all buffers and return to idle (shutdown)
    pub fn release(&mut self) {
        if self.stages.take().is_some() {
            log::debug!("pipeline buffers released");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.stages.is_some()
    }

    pub fn config(&self) -> Option<&SpectrogramConfig> {
        self.stages.as_ref().map(|s| &s.config)
    }

    /// Samples retained for the first frame of the next block
    pub fn carry_over(&self) -> Option<&[i16]> {
        self.stages.as_ref().map(|s| s.segmenter.carry_over())
    }

    /// Phases of the last processed frame
    pub fn phases(&self) -> Option<&[f64]> {
        self.stages.as_ref().map(|s| s.analyzer.phases())
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
