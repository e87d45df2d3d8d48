//! Spectrogram engine - owns the processing thread
//!
//! Capture pushes raw samples into a ring buffer; a single processing thread
//! pops fixed-size blocks and runs the whole pipeline on each one before
//! taking the next. Reconfiguration is a full stop: the thread is joined
//! (finishing any in-flight block) before buffers are reallocated.

use crate::audio::buffer::{SampleProducer, SampleRing};
use crate::config::SpectrogramConfig;
use crate::error::{ConfigError, EngineError};
use crate::export::Exporter;
use crate::pipeline::Pipeline;
use crate::sinks::{SpectrumSink, WaveformSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Ring buffer capacity, in blocks
pub const RING_BLOCKS: usize = 16;

/// Idle wait when less than one block is queued
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Real-time spectrogram engine
pub struct SpectrogramEngine {
    /// Analysis pipeline, locked by the processing thread for each block
    pipeline: Arc<Mutex<Pipeline>>,

    /// Optional classification export tap
    exporter: Arc<Mutex<Option<Exporter>>>,

    /// Current (validated) configuration
    config: SpectrogramConfig,

    /// Processing thread handle
    process_thread: Option<JoinHandle<()>>,

    /// Running flag
    running: Arc<AtomicBool>,
}

impl SpectrogramEngine {
    /// Create an engine with a configured pipeline
    pub fn new<W, S>(config: SpectrogramConfig, waveform_sink: W, spectrum_sink: S) -> Result<Self, ConfigError>
    where
        W: WaveformSink + Send + 'static,
        S: SpectrumSink + Send + 'static,
    {
        let mut pipeline = Pipeline::new(waveform_sink, spectrum_sink);
        pipeline.configure(config)?;

        Ok(Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            exporter: Arc::new(Mutex::new(None)),
            config,
            process_thread: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Install the classification export tap
    pub fn set_exporter(&mut self, mut exporter: Exporter) {
        exporter.set_sample_rate(self.config.sample_rate);
        if let Ok(mut guard) = self.exporter.lock() {
            *guard = Some(exporter);
        }
    }

    /// Remove the export tap, returning it
    pub fn take_exporter(&mut self) -> Option<Exporter> {
        self.exporter.lock().ok().and_then(|mut guard| guard.take())
    }

    /// Start the processing thread
    ///
    /// Returns the capture end of a fresh ring buffer; capture must write
    /// samples in order, without gaps.
    pub fn start(&mut self) -> Result<SampleProducer, EngineError> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        // A previous thread may have stopped itself on an error
        self.join_thread();

        let block_len = self.config.block_len;
        let (producer, mut consumer) = SampleRing::new(block_len * RING_BLOCKS).split();

        self.running.store(true, Ordering::SeqCst);

        let pipeline = Arc::clone(&self.pipeline);
        let exporter = Arc::clone(&self.exporter);
        let running = Arc::clone(&self.running);

        let handle = std::thread::spawn(move || {
            // Allocated once per run; the loop below does not allocate
            let mut block = vec![0i16; block_len];

            while running.load(Ordering::SeqCst) {
                if !consumer.read_block(&mut block) {
                    std::thread::sleep(POLL_INTERVAL);
                    continue;
                }

                // Export takes its own copy before the pipeline touches anything
                if let Ok(mut guard) = exporter.lock() {
                    if let Some(exporter) = guard.as_mut() {
                        exporter.push_block(&block);
                    }
                }

                let result = match pipeline.lock() {
                    Ok(mut pipeline) => pipeline.ingest(&block),
                    Err(_) => {
                        log::error!("pipeline lock poisoned, stopping processing thread");
                        break;
                    }
                };

                if let Err(e) = result {
                    log::error!("processing stopped: {}", e);
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
            log::debug!("processing thread exited");
        });

        self.process_thread = Some(handle);

        log::info!(
            "spectrogram started: {} Hz, n={}, {} window, {}-sample blocks",
            self.config.sample_rate,
            self.config.resolution,
            self.config.window,
            block_len
        );

        Ok(producer)
    }

    /// Stop the processing thread, waiting for the current block to finish
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.process_thread.take() {
            if handle.join().is_err() {
                log::error!("processing thread panicked");
            }
        }
    }

    /// Apply a new configuration behind a stop-the-world barrier
    ///
    /// An invalid configuration is rejected before anything stops. Otherwise
    /// the processing thread is stopped, the pipeline reallocated, and the
    /// engine left stopped: call `start` again for a producer matching the
    /// new block length.
    pub fn reconfigure(&mut self, config: SpectrogramConfig) -> Result<(), EngineError> {
        config.validate()?;

        self.stop();

        {
            let mut pipeline = self.pipeline.lock().map_err(|_| EngineError::Poisoned)?;
            pipeline.configure(config)?;
        }
        if let Ok(mut guard) = self.exporter.lock() {
            if let Some(exporter) = guard.as_mut() {
                exporter.set_sample_rate(config.sample_rate);
            }
        }

        self.config = config;
        Ok(())
    }

    /// Run one block synchronously on the caller's thread
    ///
    /// Only allowed while the processing thread is stopped, since the
    /// processing thread is the single block producer when running.
    pub fn ingest(&mut self, block: &[i16]) -> Result<usize, EngineError> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        let mut pipeline = self.pipeline.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(pipeline.ingest(block)?)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SpectrogramConfig {
        &self.config
    }

    /// Frames processed since the last (re)configuration
    pub fn frames_processed(&self) -> u64 {
        self.pipeline
            .lock()
            .map(|pipeline| pipeline.frames_processed())
            .unwrap_or(0)
    }
}

impl Drop for SpectrogramEngine {
    fn drop(&mut self) {
        self.stop();
        if let Ok(mut pipeline) = self.pipeline.lock() {
            pipeline.release();
        }
    }
}
