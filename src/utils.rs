//! Conversion helpers for the Python bindings.
//!
//! Everything here sits behind the `python-bindings` feature and turns Python
//! objects (dicts, sequences, numpy arrays, ISO timestamps) into the core
//! Rust types. Error messages are phrased for Python callers.
#[cfg(feature = "python-bindings")]
use chrono::{NaiveDate, NaiveDateTime};

#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::{PyAny, PyDict},
};

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArrayMethods, PyReadonlyArray1};

#[cfg(feature = "python-bindings")]
use crate::{
    config::{
        Preset,
        options::{AssimConfig, Selection},
    },
    state::catalog::{VariableCatalog, VariableEntry},
};

/// Accept a 1-D float64 numpy array, a pandas Series, or any float sequence.
///
/// Contiguous numpy inputs are borrowed; everything else is copied once.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray1<f64>>() {
        if arr.as_slice().is_ok() {
            return Ok(arr);
        }
    }

    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Ok(series) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series.as_slice().is_ok() {
                return Ok(series);
            }
        }
    }

    let vec: Vec<f64> = raw.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Observation indices as 0-based state offsets.
///
/// Errors
/// ------
/// - `ValueError` for negative indices.
/// - `TypeError` if `raw` is not a sequence of integers.
#[cfg(feature = "python-bindings")]
pub fn extract_obs_indices(raw: &Bound<'_, PyAny>) -> PyResult<Array1<usize>> {
    let values: Vec<i64> = raw
        .extract()
        .map_err(|_| PyTypeError::new_err("iobs must be a sequence or 1-D array of integers"))?;
    values
        .into_iter()
        .map(|i| {
            usize::try_from(i).map_err(|_| {
                PyValueError::new_err(format!("iobs must be non-negative, got {i}"))
            })
        })
        .collect()
}

/// Build a [`VariableCatalog`] from `{name: (start, length)}`.
#[cfg(feature = "python-bindings")]
pub fn extract_catalog(variables: &Bound<'_, PyDict>, state_len: usize) -> PyResult<VariableCatalog> {
    let mut entries = Vec::with_capacity(variables.len());
    for (key, value) in variables.iter() {
        let name: String = key
            .extract()
            .map_err(|_| PyTypeError::new_err("variable names must be strings"))?;
        let (start, length): (usize, usize) = value.extract().map_err(|_| {
            PyTypeError::new_err(format!("variable {name:?} must map to (start, length)"))
        })?;
        entries.push(VariableEntry::new(name, start, length));
    }
    entries.sort_by_key(|e| e.start);
    Ok(VariableCatalog::new(entries, state_len)?)
}

/// Parse `"YYYY-MM-DDTHH:MM:SS"`, `"YYYY-MM-DD HH:MM:SS"` or `"YYYY-MM-DD"`.
#[cfg(feature = "python-bindings")]
pub fn parse_time(raw: &str) -> PyResult<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y%m%d-%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            PyValueError::new_err(format!(
                "invalid time {raw:?} (expected 'YYYY-MM-DD[THH:MM:SS]' or 'YYYYMMDD-HH:MM:SS')"
            ))
        })
}

/// Start from a preset (or an empty keep-list) and apply keyword overrides.
///
/// `keep` and `patterns` are mutually exclusive; either replaces the preset's
/// selection.
#[cfg(feature = "python-bindings")]
pub fn build_config(
    preset: Option<&str>, keep: Option<Vec<String>>, patterns: Option<Vec<String>>,
    log_variables: Option<Vec<String>>, controlled: Option<Vec<String>>,
    positive: Option<Vec<String>>, check_finite: Option<bool>,
) -> PyResult<AssimConfig> {
    let mut config = match preset {
        Some(name) => name.parse::<Preset>()?.config(),
        None => AssimConfig::new(Selection::Names(Vec::new())),
    };

    match (keep, patterns) {
        (Some(_), Some(_)) => {
            return Err(PyValueError::new_err("pass either keep or patterns, not both"));
        }
        (Some(names), None) => config.selection = Selection::Names(names),
        (None, Some(globs)) => config.selection = Selection::Patterns(globs),
        (None, None) => {}
    }
    if let Some(v) = log_variables {
        config.log_variables = v;
    }
    if let Some(v) = controlled {
        config.controlled = v;
    }
    if let Some(v) = positive {
        config.positive = v;
    }
    if let Some(flag) = check_finite {
        config.check_finite = flag;
    }

    config.validate()?;
    Ok(config)
}
