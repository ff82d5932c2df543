//! bgc_assim — state transforms, spread control and parameterized 3D-Var
//! covariance transforms for biogeochemical data assimilation.
//!
//! Purpose
//! -------
//! Provide the model-side pieces that sit between a biogeochemical model's
//! flat state vector and a generic data-assimilation filter: which variables
//! the filter sees, which of them live in log space, how the analysed
//! ensemble is kept physically sensible, and the control-variable transform
//! used by variational filters. With the `python-bindings` feature the same
//! components are exposed as the `_bgc_assim` extension module.
//!
//! Key behaviors
//! -------------
//! - `state`: variable catalog, retained subsets and ensemble views.
//! - `transform`: log10 forward/inverse stage, optionally applied to
//!   observations.
//! - `spread`: post-analysis clipping, spread re-inflation and positivity.
//! - `covariance`: EOF resources, monthly vertical basis, and the forward /
//!   adjoint control-variable transform.
//! - `config` and `plugins`: validated option bundles and the host-facing
//!   plugin protocol tying the components into cycles.
//!
//! Invariants & assumptions
//! ------------------------
//! - The host owns every buffer; the crate mutates ensembles and observation
//!   values in place and never resizes them.
//! - Every offset is 0-based and every variable occupies a contiguous slice
//!   of the state vector.
//!
//! Conventions
//! -----------
//! - Errors are [`errors::AssimError`] everywhere; numeric-domain warnings go
//!   through the `log` facade and are left to the host's logger.
//! - Python-facing classes live under `bgc_assim.plugins`.
//!
//! Downstream usage
//! ----------------
//! - Rust hosts implement their cycle on top of
//!   [`plugins::AssimilationPlugin`] and [`plugins::CvtHandler`].
//! - Python hosts import `_bgc_assim.plugins` and pass numpy arrays, which
//!   are modified in place.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each component; full cycles are exercised in
//!   `tests/integration_assimilation_cycle.rs`.

pub mod config;
pub mod covariance;
pub mod errors;
pub mod plugins;
pub mod spread;
pub mod state;
pub mod transform;
pub mod utils;

pub mod prelude {
    pub use crate::config::{AssimConfig, Preset, Selection};
    pub use crate::covariance::{CovarianceOperator, CvtOptions, EofLoader, TextEofLoader};
    pub use crate::errors::{AssimError, AssimResult, ErrorKind};
    pub use crate::plugins::{
        AssimilationPlugin, CvtHandler, CycleReport, EnsemblePlugin, VariationalPlugin,
    };
    pub use crate::spread::{SpreadController, SpreadOptions};
    pub use crate::state::{ObservationBatch, RetainedCatalog, VariableCatalog, VariableEntry};
    pub use crate::transform::{TransformOptions, TransformStage};
}

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyReadwriteArray1, PyReadwriteArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::PyValueError,
    prelude::*,
    types::{PyAny, PyDict},
};

#[cfg(feature = "python-bindings")]
use crate::{
    covariance::eof::TextEofLoader,
    plugins::{AssimilationPlugin, CvtHandler, EnsemblePlugin, VariationalPlugin},
    state::observations::ObservationBatch,
    utils::{build_config, extract_catalog, extract_f64_array, extract_obs_indices, parse_time},
};

/// EnsembleAssimilation — Python-facing wrapper for [`EnsemblePlugin`].
///
/// Purpose
/// -------
/// Let a Python ensemble filter call the log transform and spread control
/// around its analysis, on numpy buffers modified in place.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `EnsembleAssimilation(preset=None, keep=None, patterns=None,
/// log_variables=None, controlled=None, positive=None, check_finite=None)`:
/// - `preset`: one of `"parameter-sum"`, `"parameter-quota"`,
///   `"log-chlorophyll"`, `"ogs-3dvar"`.
/// - `keep` / `patterns`: replace the preset's selection.
/// - remaining keywords override the preset's role lists and flags.
///
/// Notes
/// -----
/// - `before_analysis` takes `iobs`, `obs` and `obs_sds` together or not at
///   all; `obs` must be a writable float64 array.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "bgc_assim.plugins")]
pub struct EnsembleAssimilation {
    inner: EnsemblePlugin,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl EnsembleAssimilation {
    #[new]
    #[pyo3(signature = (
        preset = None, keep = None, patterns = None, log_variables = None,
        controlled = None, positive = None, check_finite = None
    ))]
    pub fn new(
        preset: Option<&str>, keep: Option<Vec<String>>, patterns: Option<Vec<String>>,
        log_variables: Option<Vec<String>>, controlled: Option<Vec<String>>,
        positive: Option<Vec<String>>, check_finite: Option<bool>,
    ) -> PyResult<Self> {
        let config =
            build_config(preset, keep, patterns, log_variables, controlled, positive, check_finite)?;
        Ok(EnsembleAssimilation { inner: EnsemblePlugin::new(config) })
    }

    /// Retain variables from `{name: (start, length)}`; returns their names.
    pub fn initialize(
        &mut self, variables: &Bound<'_, PyDict>, state_len: usize, ensemble_size: usize,
    ) -> PyResult<Vec<String>> {
        let catalog = extract_catalog(variables, state_len)?;
        Ok(self.inner.initialize(&catalog, ensemble_size)?)
    }

    /// Forward transform; returns `(state_values, observations)` rewritten.
    #[pyo3(signature = (time, state, iobs = None, obs = None, obs_sds = None))]
    pub fn before_analysis<'py>(
        &mut self, py: Python<'py>, time: &str, mut state: PyReadwriteArray2<'py, f64>,
        iobs: Option<&Bound<'py, PyAny>>, obs: Option<PyReadwriteArray1<'py, f64>>,
        obs_sds: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<(usize, usize)> {
        let time = parse_time(time)?;
        let report = match (iobs, obs, obs_sds) {
            (Some(iobs), Some(mut obs), Some(obs_sds)) => {
                let iobs = extract_obs_indices(iobs)?;
                let sds = extract_f64_array(py, obs_sds)?;
                let mut batch = ObservationBatch::new(iobs.view(), obs.as_array_mut(), sds.as_array())?;
                self.inner.before_analysis(time, state.as_array_mut(), Some(&mut batch))?
            }
            (None, None, None) => self.inner.before_analysis(time, state.as_array_mut(), None)?,
            _ => {
                return Err(PyValueError::new_err(
                    "iobs, obs and obs_sds must be passed together",
                ));
            }
        };
        Ok((report.transform.state_values, report.transform.observations))
    }

    /// Inverse transform and spread pass; returns the number of floored values.
    pub fn after_analysis(&mut self, mut state: PyReadwriteArray2<'_, f64>) -> PyResult<usize> {
        let report = self.inner.after_analysis(state.as_array_mut())?;
        Ok(report.spread.map_or(0, |s| s.total_floored()))
    }

    #[getter]
    pub fn retained(&self) -> Option<Vec<String>> {
        self.inner.catalog().map(|c| c.names())
    }
}

/// VariationalAssimilation — Python-facing wrapper for [`VariationalPlugin`].
///
/// Purpose
/// -------
/// Expose the forward and adjoint control-variable transform to a Python
/// 3D-Var minimizer.
///
/// Parameters
/// ----------
/// Constructed via `VariationalAssimilation(preset="ogs-3dvar", keep=None,
/// patterns=None, eof_prefix=None, depth_file=None, dim_cvec=None,
/// total_variable=None)`. The depth table is read at construction; monthly
/// EOF tables are read lazily by `before_analysis`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "bgc_assim.plugins")]
pub struct VariationalAssimilation {
    inner: VariationalPlugin<TextEofLoader>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl VariationalAssimilation {
    #[new]
    #[pyo3(signature = (
        preset = Some("ogs-3dvar"), keep = None, patterns = None, eof_prefix = None,
        depth_file = None, dim_cvec = None, total_variable = None
    ))]
    pub fn new(
        preset: Option<&str>, keep: Option<Vec<String>>, patterns: Option<Vec<String>>,
        eof_prefix: Option<String>, depth_file: Option<String>, dim_cvec: Option<usize>,
        total_variable: Option<String>,
    ) -> PyResult<Self> {
        let mut config = build_config(preset, keep, patterns, None, None, None, None)?;
        if let Some(prefix) = eof_prefix {
            config.eof.prefix = prefix;
        }
        if let Some(path) = depth_file {
            config.eof.depth_file = path.into();
        }
        if let Some(dim) = dim_cvec {
            config.cvt.dim_cvec = dim;
        }
        if let Some(name) = total_variable {
            config.cvt.total_variable = name;
        }
        config.validate()?;
        Ok(VariationalAssimilation { inner: VariationalPlugin::new(config)? })
    }

    pub fn initialize(
        &mut self, variables: &Bound<'_, PyDict>, state_len: usize, ensemble_size: usize,
    ) -> PyResult<Vec<String>> {
        let catalog = extract_catalog(variables, state_len)?;
        Ok(self.inner.initialize(&catalog, ensemble_size)?)
    }

    /// Start a cycle; returns `True` when the monthly basis was reloaded.
    pub fn before_analysis(
        &mut self, time: &str, mut state: PyReadwriteArray2<'_, f64>,
    ) -> PyResult<bool> {
        let time = parse_time(time)?;
        Ok(self.inner.before_analysis(time, state.as_array_mut(), None)?.basis_reloaded)
    }

    pub fn cvt<'py>(
        &mut self, py: Python<'py>, iteration: i32, state: &Bound<'py, PyAny>,
        control: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let state = extract_f64_array(py, state)?;
        let control = extract_f64_array(py, control)?;
        let out = self.inner.cvt(iteration, state.as_array(), control.as_array())?;
        Ok(out.into_pyarray(py))
    }

    pub fn cvt_adj<'py>(
        &mut self, py: Python<'py>, iteration: i32, state: &Bound<'py, PyAny>,
        perturbation: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let state = extract_f64_array(py, state)?;
        let perturbation = extract_f64_array(py, perturbation)?;
        let out = self.inner.cvt_adj(iteration, state.as_array(), perturbation.as_array())?;
        Ok(out.into_pyarray(py))
    }
}

/// _bgc_assim — PyO3 module initializer.
///
/// Registers the `plugins` submodule and inserts it into `sys.modules` so
/// that `import bgc_assim.plugins` resolves.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _bgc_assim<'py>(py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let plugins_mod = PyModule::new(py, "plugins")?;
    plugins_mod.add_class::<EnsembleAssimilation>()?;
    plugins_mod.add_class::<VariationalAssimilation>()?;
    m.add_submodule(&plugins_mod)?;

    py.import("sys")?.getattr("modules")?.set_item("bgc_assim.plugins", plugins_mod)?;
    Ok(())
}
