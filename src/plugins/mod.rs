//! plugins — cycle-level wiring of the catalog, transform, spread and
//! covariance components.
//!
//! Purpose
//! -------
//! Mirror the host filter's plugin protocol: one `initialize` call with the
//! full variable set, then `before_analysis` / `after_analysis` around every
//! analysis and, for variational filters, repeated `cvt` / `cvt_adj` calls
//! inside the minimization.
//!
//! Key behaviors
//! -------------
//! - [`AssimilationPlugin`] is the per-cycle seam; [`CvtHandler`] the
//!   variational one.
//! - [`EnsemblePlugin`] applies the log transform before the analysis and
//!   the inverse transform plus spread control after it.
//! - [`VariationalPlugin`] keeps the vertical basis current and exposes the
//!   covariance operator.
//!
//! Invariants & assumptions
//! ------------------------
//! - `initialize` returns the retained variable names; the host consults
//!   that list (or [`EnsemblePlugin::catalog`]) instead of a mutated map.
//! - Every other method fails with `AssimError::PluginNotInitialized` until
//!   `initialize` has succeeded.
//!
//! Conventions
//! -----------
//! - Ensemble buffers are `(M, D)`; a single analysis state is passed as a
//!   one-row ensemble.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each plugin; a full cycle is exercised in
//!   `tests/integration_assimilation_cycle.rs`.
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayView1, ArrayViewMut2};

use crate::{
    errors::AssimResult,
    spread::controller::SpreadReport,
    state::{catalog::VariableCatalog, observations::ObservationBatch},
    transform::log_transform::TransformReport,
};

pub mod ensemble;
pub mod variational;

pub use self::ensemble::EnsemblePlugin;
pub use self::variational::VariationalPlugin;

/// What a plugin did during one `before_analysis` / `after_analysis` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub transform: TransformReport,
    pub spread: Option<SpreadReport>,
    /// The vertical basis was rebuilt for a new month.
    pub basis_reloaded: bool,
}

/// Host-facing plugin protocol of one assimilation cycle.
pub trait AssimilationPlugin {
    /// Retain the variables this plugin works on.
    ///
    /// Parameters
    /// ----------
    /// - `variables`: every variable the host can expose.
    /// - `ensemble_size`: number of members the host will pass.
    ///
    /// Returns
    /// -------
    /// The retained names, in catalog order.
    fn initialize(
        &mut self, variables: &VariableCatalog, ensemble_size: usize,
    ) -> AssimResult<Vec<String>>;

    /// Called with the forecast ensemble right before the analysis.
    fn before_analysis(
        &mut self, time: NaiveDateTime, state: ArrayViewMut2<'_, f64>,
        observations: Option<&mut ObservationBatch<'_>>,
    ) -> AssimResult<CycleReport>;

    /// Called with the analysed ensemble before it goes back to the model.
    fn after_analysis(&mut self, state: ArrayViewMut2<'_, f64>) -> AssimResult<CycleReport>;
}

/// Control-variable transform used by variational filters.
pub trait CvtHandler {
    /// Forward transform of `control` for the minimization step `iteration`.
    fn cvt(
        &mut self, iteration: i32, state: ArrayView1<'_, f64>, control: ArrayView1<'_, f64>,
    ) -> AssimResult<Array1<f64>>;

    /// Adjoint transform of `perturbation`.
    fn cvt_adj(
        &mut self, iteration: i32, state: ArrayView1<'_, f64>, perturbation: ArrayView1<'_, f64>,
    ) -> AssimResult<Array1<f64>>;
}
