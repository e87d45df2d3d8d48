//! Python bindings for the threaded spectrogram engine

use numpy::{PyArray1, PyArray2, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::sync::{Arc, Mutex};

use crate::audio::{SampleProducer, SpectrogramEngine};
use crate::config::SpectrogramConfig;
use crate::sinks::{LatestFrame, SharedSink, SpectrogramHistory, SpectrumSink};
use crate::spectrum::WindowKind;

pub(crate) fn build_config(
    sample_rate: u32,
    resolution: usize,
    window: &str,
    block_len: usize,
) -> PyResult<SpectrogramConfig> {
    let window: WindowKind = window
        .parse()
        .map_err(|e: crate::error::ConfigError| PyValueError::new_err(e.to_string()))?;
    let config = SpectrogramConfig::new(sample_rate, resolution, window, block_len);
    config
        .validate()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(config)
}

/// Spectrogram engine exposed to Python
///
/// Samples pushed from Python are processed on a Rust thread; Python only
/// polls the latest frame and the scrolling history.
#[pyclass(name = "Spectrogram", unsendable)]
pub struct PySpectrogram {
    engine: SpectrogramEngine,
    producer: Option<SampleProducer>,
    latest: Arc<Mutex<LatestFrame>>,
    history: Arc<Mutex<SpectrogramHistory>>,
    history_rows: usize,
}

#[pymethods]
impl PySpectrogram {
    /// Create a stopped engine
    ///
    /// Args:
    ///     sample_rate: Sampling rate in Hz
    ///     resolution: Frame length (power of two)
    ///     window: Window name, e.g. "Hanning" or "Blackman-Harris"
    ///     block_len: Capture block length (multiple of resolution/2)
    ///     history_rows: Spectra kept for the scrolling display
    #[new]
    #[pyo3(signature = (sample_rate=16000, resolution=1024, window="Hanning", block_len=2048, history_rows=256))]
    fn new(
        sample_rate: u32,
        resolution: usize,
        window: &str,
        block_len: usize,
        history_rows: usize,
    ) -> PyResult<Self> {
        let config = build_config(sample_rate, resolution, window, block_len)?;

        let latest = SharedSink::new(LatestFrame::new());
        let history = SharedSink::new(SpectrogramHistory::new(history_rows, resolution));
        let latest_handle = latest.handle();
        let history_handle = history.handle();

        let mut latest_spectrum = latest.clone();
        let mut history_spectrum = history;
        let spectrum = move |magnitudes: &[f64]| {
            latest_spectrum.on_magnitudes(magnitudes);
            history_spectrum.on_magnitudes(magnitudes);
        };

        let engine = SpectrogramEngine::new(config, latest, spectrum)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        Ok(Self {
            engine,
            producer: None,
            latest: latest_handle,
            history: history_handle,
            history_rows,
        })
    }

    /// Start the processing thread
    fn start(&mut self) -> PyResult<()> {
        let producer = self
            .engine
            .start()
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        self.producer = Some(producer);
        Ok(())
    }

    /// Stop the processing thread
    fn stop(&mut self) {
        self.engine.stop();
        self.producer = None;
    }

    /// Queue raw int16 samples; returns how many were accepted
    fn push(&mut self, samples: PyReadonlyArray1<i16>) -> PyResult<usize> {
        let samples = samples
            .as_slice()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| PyRuntimeError::new_err("engine is not running"))?;
        Ok(producer.write(samples))
    }

    /// Latest frame as {'waveform', 'magnitudes'}, or None if nothing new
    fn latest(&self, py: Python<'_>) -> Option<PyObject> {
        let (waveform, magnitudes) = self.latest.lock().ok()?.take_if_new()?;

        let dict = PyDict::new(py);
        dict.set_item("waveform", PyArray1::from_vec(py, waveform)).ok();
        dict.set_item("magnitudes", PyArray1::from_vec(py, magnitudes)).ok();
        Some(dict.into())
    }

    /// Scrolling spectrogram, oldest row first, bins 0..=n/2
    fn history<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        let history = self
            .history
            .lock()
            .map_err(|_| PyRuntimeError::new_err("history lock poisoned"))?;
        Ok(PyArray2::from_owned_array(py, history.ordered_rows()))
    }

    /// Apply new settings; the engine is left stopped
    #[pyo3(signature = (sample_rate, resolution, window, block_len))]
    fn reconfigure(
        &mut self,
        sample_rate: u32,
        resolution: usize,
        window: &str,
        block_len: usize,
    ) -> PyResult<()> {
        let config = build_config(sample_rate, resolution, window, block_len)?;
        self.engine
            .reconfigure(config)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        self.producer = None;

        if let Ok(mut history) = self.history.lock() {
            *history = SpectrogramHistory::new(self.history_rows, resolution);
        }
        Ok(())
    }

    /// Frequencies in Hz of the history columns
    fn frequency_axis<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        PyArray1::from_vec(py, self.engine.config().frequency_axis_hz())
    }

    #[getter]
    fn frames_processed(&self) -> u64 {
        self.engine.frames_processed()
    }

    #[getter]
    fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    #[getter]
    fn frame_duration_ms(&self) -> f64 {
        self.engine.config().frame_duration_ms()
    }
}
