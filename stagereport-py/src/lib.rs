//! Python bindings for the stagereport Rust library.
//!
//! Exposes a `Job` class that a Python worker holds and reports through.
//! Accepted progress goes to a logging sink unless another one is chosen:
//!
//! ```python
//! init_logging("info")
//! job = Job(sink="json", json_path="progress.jsonl")
//! job.register_stages(["Stage One", "Stage Two"])
//! job.report_progress("Stage One")
//! for i in range(101):
//!     job.report_progress("Stage One", 100, i)
//! ```

use pyo3::create_exception;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use serde::de::DeserializeOwned;

use stagereport::config::{ReporterConfig, SinkKind};
use stagereport::core::{JobId, ProgressEvent};
use stagereport::errors::ProgressError as RustProgressError;
use stagereport::events::ConfiguredSink;
use stagereport::observability::{init_tracing, LogFormat};
use stagereport::progress::{JobHandle, ProgressReporter};

create_exception!(stagereport_py, ProgressError, PyValueError);
create_exception!(stagereport_py, InvalidRegistration, ProgressError);
create_exception!(stagereport_py, UnknownStage, ProgressError);
create_exception!(stagereport_py, StageRegression, ProgressError);
create_exception!(stagereport_py, MalformedFraction, ProgressError);
create_exception!(stagereport_py, FractionRegression, ProgressError);

fn to_py_err(err: &RustProgressError) -> PyErr {
    let message = format!("[{}] {}", err.code(), err);
    match err {
        RustProgressError::InvalidRegistration { .. } => InvalidRegistration::new_err(message),
        RustProgressError::UnknownStage { .. } => UnknownStage::new_err(message),
        RustProgressError::StageRegression { .. } => StageRegression::new_err(message),
        RustProgressError::MalformedFraction { .. } => MalformedFraction::new_err(message),
        RustProgressError::FractionRegression { .. } => FractionRegression::new_err(message),
    }
}

fn parse_choice<T: DeserializeOwned>(field: &str, value: &str) -> PyResult<T> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| PyValueError::new_err(format!("Unknown {field} '{value}'")))
}

fn reporter_config(sink: &str, json_path: Option<String>) -> PyResult<ReporterConfig> {
    let kind: SinkKind = parse_choice("sink", sink)?;
    let mut config = ReporterConfig::new().with_sink(kind);
    if let Some(path) = json_path {
        config = config.with_json_path(path);
    }
    // Queued sinks need a tokio runtime, which a Python worker does not run.
    if config.uses_queue() {
        return Err(PyValueError::new_err(format!(
            "Sink '{sink}' is not available from Python; use 'none', 'log' or 'json'"
        )));
    }
    Ok(config)
}

/// Python wrapper for a job handle with its own reporter.
#[pyclass(name = "Job")]
pub struct PyJob {
    handle: JobHandle,
}

#[pymethods]
impl PyJob {
    /// Creates a job. A fresh id is generated when none is given.
    ///
    /// `sink` is one of `none`, `log` (the default) or `json`. The JSON
    /// sink appends to `json_path`, or writes to stdout without one.
    #[new]
    #[pyo3(signature = (job_id=None, sink="log", json_path=None))]
    fn new(job_id: Option<String>, sink: &str, json_path: Option<String>) -> PyResult<Self> {
        let config = reporter_config(sink, json_path)?;
        let configured =
            ConfiguredSink::build(&config).map_err(|e| PyValueError::new_err(e.to_string()))?;
        let reporter = ProgressReporter::shared(configured.sink());
        let job_id = job_id.map_or_else(JobId::generate, JobId::from);
        Ok(Self {
            handle: reporter.job(job_id),
        })
    }

    /// The job id.
    #[getter]
    fn job_id(&self) -> String {
        self.handle.job_id().to_string()
    }

    /// Declares the job's ordered stages. Must be called once, first.
    fn register_stages(&self, stages: Vec<String>) -> PyResult<()> {
        self.handle
            .register_stages(stages)
            .map(|_| ())
            .map_err(|e| to_py_err(&e))
    }

    /// Reports progress on a stage.
    ///
    /// With neither `total` nor `current` this marks the stage as entered.
    #[pyo3(signature = (stage, total=None, current=None))]
    fn report_progress(&self, stage: &str, total: Option<i64>, current: Option<i64>) -> PyResult<()> {
        let event = ProgressEvent {
            stage: stage.to_string(),
            numerator: current,
            denominator: total,
        };
        self.handle
            .report_event(&event)
            .map(|_| ())
            .map_err(|e| to_py_err(&e))
    }

    /// Returns the job's stages and statuses, or None before registration.
    fn snapshot(&self, py: Python<'_>) -> PyResult<PyObject> {
        match self.handle.snapshot() {
            Some(snapshot) => {
                let value = serde_json::to_value(&snapshot)
                    .map_err(|e| PyValueError::new_err(e.to_string()))?;
                json_to_py(py, &value)
            }
            None => Ok(py.None()),
        }
    }

    /// Renders the job's progress as a text tree.
    fn render(&self) -> Option<String> {
        self.handle.snapshot().map(|s| s.render())
    }

    fn __repr__(&self) -> String {
        let summary = self
            .handle
            .snapshot()
            .map_or_else(|| "unregistered".to_string(), |s| s.summary());
        format!("Job(job_id='{}', {})", self.handle.job_id(), summary)
    }
}

fn json_to_py(py: Python<'_>, value: &serde_json::Value) -> PyResult<PyObject> {
    Ok(match value {
        serde_json::Value::Null => py.None(),
        serde_json::Value::Bool(b) => b.into_py(py),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into_py(py)
            } else if let Some(u) = n.as_u64() {
                u.into_py(py)
            } else if let Some(f) = n.as_f64() {
                f.into_py(py)
            } else {
                py.None()
            }
        }
        serde_json::Value::String(s) => s.into_py(py),
        serde_json::Value::Array(arr) => {
            let items = arr
                .iter()
                .map(|v| json_to_py(py, v))
                .collect::<PyResult<Vec<_>>>()?;
            PyList::new_bound(py, items).into_py(py)
        }
        serde_json::Value::Object(map) => {
            let dict = PyDict::new_bound(py);
            for (k, v) in map {
                dict.set_item(k, json_to_py(py, v)?)?;
            }
            dict.into_py(py)
        }
    })
}

/// Installs the global tracing subscriber used by the logging sink.
///
/// `RUST_LOG` takes precedence over `level`. Call at most once per process.
#[pyfunction]
#[pyo3(signature = (level="info", format="pretty"))]
fn init_logging(level: &str, format: &str) -> PyResult<()> {
    let format: LogFormat = parse_choice("log format", format)?;
    init_tracing(level, format).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// The stagereport Python module.
#[pymodule]
fn stagereport_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PyJob>()?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    m.add("ProgressError", py.get_type_bound::<ProgressError>())?;
    m.add("InvalidRegistration", py.get_type_bound::<InvalidRegistration>())?;
    m.add("UnknownStage", py.get_type_bound::<UnknownStage>())?;
    m.add("StageRegression", py.get_type_bound::<StageRegression>())?;
    m.add("MalformedFraction", py.get_type_bound::<MalformedFraction>())?;
    m.add("FractionRegression", py.get_type_bound::<FractionRegression>())?;

    // Add version info
    m.add("__version__", "0.1.0")?;
    m.add("__rust_version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
