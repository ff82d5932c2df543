//! EnsemblePlugin — log transform around the analysis, spread control after.
//!
//! Purpose
//! -------
//! Run the ensemble-filter side of a cycle: retain the configured variables,
//! move log-space variables (and, optionally, their observations) to log10
//! before the analysis, and after it map them back, clip, re-inflate and
//! floor negatives.
//!
//! Key behaviors
//! -------------
//! - [`EnsemblePlugin::initialize`] validates the configuration, retains the
//!   selection, and binds the transform stage and spread controller.
//! - `before_analysis` checks the ensemble shape, optionally rejects
//!   non-finite states, then applies the forward transform.
//! - `after_analysis` applies the inverse transform, then the spread pass.
//!
//! Invariants & assumptions
//! ------------------------
//! - The ensemble passed to each call has the size announced at
//!   initialization.
use chrono::NaiveDateTime;
use ndarray::ArrayViewMut2;

use crate::{
    config::options::AssimConfig,
    errors::{AssimError, AssimResult},
    plugins::{AssimilationPlugin, CycleReport},
    spread::controller::SpreadController,
    state::{
        catalog::{RetainedCatalog, VariableCatalog},
        observations::ObservationBatch,
        validation::validate_members,
        view::StateView,
    },
    transform::log_transform::TransformStage,
};

#[derive(Debug, Clone)]
struct Stages {
    catalog: RetainedCatalog,
    ensemble_size: usize,
    transform: TransformStage,
    spread: SpreadController,
}

/// Ensemble-filter plugin built from an [`AssimConfig`].
#[derive(Debug, Clone)]
pub struct EnsemblePlugin {
    config: AssimConfig,
    stages: Option<Stages>,
}

impl EnsemblePlugin {
    pub fn new(config: AssimConfig) -> Self {
        EnsemblePlugin { config, stages: None }
    }

    pub fn config(&self) -> &AssimConfig {
        &self.config
    }

    /// Retained catalog, once initialized.
    pub fn catalog(&self) -> Option<&RetainedCatalog> {
        self.stages.as_ref().map(|s| &s.catalog)
    }

    pub fn transform(&self) -> Option<&TransformStage> {
        self.stages.as_ref().map(|s| &s.transform)
    }

    pub fn spread(&self) -> Option<&SpreadController> {
        self.stages.as_ref().map(|s| &s.spread)
    }

    fn stages(&self) -> AssimResult<&Stages> {
        self.stages.as_ref().ok_or(AssimError::PluginNotInitialized)
    }
}

impl AssimilationPlugin for EnsemblePlugin {
    /// Errors
    /// ------
    /// - Option errors from [`AssimConfig::validate`].
    /// - `AssimError::InvalidEnsembleSize` if `ensemble_size` contradicts the
    ///   configured size, `EmptyEnsemble` if it is zero.
    /// - Selection errors (`MissingVariable`, `UnmatchedPattern`, ...).
    fn initialize(
        &mut self, variables: &VariableCatalog, ensemble_size: usize,
    ) -> AssimResult<Vec<String>> {
        self.config.validate()?;
        validate_members(None, ensemble_size)?;
        if let Some(expected) = self.config.ensemble_size {
            validate_members(Some(expected), ensemble_size)?;
        }
        log::info!("Available variables: {}", variables.names().collect::<Vec<_>>().join(", "));

        let catalog = self.config.selection.apply(variables)?;
        let roles = self.config.resolve_roles(&catalog);
        let transform =
            TransformStage::new(&catalog, roles.log_variables.as_slice(), self.config.transform)?;
        let spread = SpreadController::new(
            &catalog,
            roles.controlled.as_slice(),
            roles.positive.as_slice(),
            self.config.spread,
        )?;

        let retained = catalog.names();
        log::info!("Retained variables: {}", retained.join(", "));
        self.stages = Some(Stages { catalog, ensemble_size, transform, spread });
        Ok(retained)
    }

    fn before_analysis(
        &mut self, time: NaiveDateTime, state: ArrayViewMut2<'_, f64>,
        observations: Option<&mut ObservationBatch<'_>>,
    ) -> AssimResult<CycleReport> {
        let stages = self.stages()?;
        let mut view = StateView::new(state, &stages.catalog)?;
        view.expect_members(stages.ensemble_size)?;
        if self.config.check_finite {
            view.check_finite()?;
        }
        let transform = stages.transform.forward(time, &mut view, observations);
        Ok(CycleReport { transform, ..CycleReport::default() })
    }

    fn after_analysis(&mut self, state: ArrayViewMut2<'_, f64>) -> AssimResult<CycleReport> {
        let stages = self.stages()?;
        let mut view = StateView::new(state, &stages.catalog)?;
        view.expect_members(stages.ensemble_size)?;
        let transform = stages.transform.inverse(&mut view);
        let spread = stages.spread.clip_and_inflate(&mut view)?;
        Ok(CycleReport { transform, spread: Some(spread), ..CycleReport::default() })
    }
}
