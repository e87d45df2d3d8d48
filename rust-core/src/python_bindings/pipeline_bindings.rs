//! Python bindings for synchronous, block-at-a-time analysis

use numpy::{PyArray2, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::{Arc, Mutex};

use super::spectrogram_bindings::build_config;
use crate::pipeline::Pipeline;
use crate::sinks::{SharedSink, SpectrogramHistory};

/// Pipeline driven directly from Python (offline files, notebooks)
#[pyclass(name = "Pipeline", unsendable)]
pub struct PyPipeline {
    pipeline: Pipeline,
    history: Arc<Mutex<SpectrogramHistory>>,
}

#[pymethods]
impl PyPipeline {
    #[new]
    #[pyo3(signature = (sample_rate=16000, resolution=1024, window="Hanning", block_len=2048, history_rows=1024))]
    fn new(
        sample_rate: u32,
        resolution: usize,
        window: &str,
        block_len: usize,
        history_rows: usize,
    ) -> PyResult<Self> {
        let config = build_config(sample_rate, resolution, window, block_len)?;
        let history = SharedSink::new(SpectrogramHistory::new(history_rows, resolution));
        let handle = history.handle();

        let mut pipeline = Pipeline::new(|_: &[f64]| {}, history);
        pipeline
            .configure(config)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        Ok(Self {
            pipeline,
            history: handle,
        })
    }

    /// Analyze one raw block; returns the number of frames produced
    fn ingest(&mut self, block: PyReadonlyArray1<i16>) -> PyResult<usize> {
        let block = block
            .as_slice()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.pipeline
            .ingest(block)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Spectra produced so far, oldest row first
    fn spectrogram<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        let history = self
            .history
            .lock()
            .map_err(|_| PyRuntimeError::new_err("history lock poisoned"))?;
        Ok(PyArray2::from_owned_array(py, history.ordered_rows()))
    }
}
