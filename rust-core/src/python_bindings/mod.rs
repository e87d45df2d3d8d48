//! PyO3 bindings for Python integration

use pyo3::prelude::*;

mod pipeline_bindings;
mod spectrogram_bindings;

use crate::spectrum::WindowKind;

/// Names accepted for the `window` argument
#[pyfunction]
fn window_kinds() -> Vec<&'static str> {
    WindowKind::ALL.iter().map(|kind| kind.name()).collect()
}

/// Python module definition
#[pymodule]
fn spectrogram(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<spectrogram_bindings::PySpectrogram>()?;
    m.add_class::<pipeline_bindings::PyPipeline>()?;
    m.add_function(wrap_pyfunction!(window_kinds, m)?)?;

    Ok(())
}
