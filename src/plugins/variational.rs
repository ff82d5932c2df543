//! VariationalPlugin — covariance operator behind the host's 3D-Var hooks.
//!
//! `initialize` retains the selection and binds a [`CovarianceOperator`];
//! `before_analysis` refreshes the vertical basis when the month changes and
//! starts a new minimization; `cvt` / `cvt_adj` forward to the operator.
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayView1, ArrayViewMut2};

use crate::{
    config::options::AssimConfig,
    covariance::{
        cvt::{CovarianceOperator, CvtLayout},
        eof::{EofLoader, TextEofLoader},
    },
    errors::{AssimError, AssimResult},
    plugins::{AssimilationPlugin, CvtHandler, CycleReport},
    state::{
        catalog::{RetainedCatalog, VariableCatalog},
        observations::ObservationBatch,
        view::StateView,
    },
};

#[derive(Debug)]
struct Stages<L> {
    catalog: RetainedCatalog,
    operator: CovarianceOperator<L>,
}

/// Variational-filter plugin built from an [`AssimConfig`] and an EOF source.
#[derive(Debug)]
pub struct VariationalPlugin<L = TextEofLoader> {
    config: AssimConfig,
    loader: Option<L>,
    stages: Option<Stages<L>>,
}

impl VariationalPlugin<TextEofLoader> {
    /// Plugin reading EOF tables from `config.eof`.
    ///
    /// Errors
    /// ------
    /// - `AssimError::MalformedResource` if the depth table cannot be read.
    pub fn new(config: AssimConfig) -> AssimResult<Self> {
        let loader = TextEofLoader::new(config.eof.prefix.clone(), config.eof.depth_file.clone())?;
        Ok(Self::with_loader(config, loader))
    }
}

impl<L: EofLoader> VariationalPlugin<L> {
    pub fn with_loader(config: AssimConfig, loader: L) -> Self {
        VariationalPlugin { config, loader: Some(loader), stages: None }
    }

    pub fn config(&self) -> &AssimConfig {
        &self.config
    }

    pub fn catalog(&self) -> Option<&RetainedCatalog> {
        self.stages.as_ref().map(|s| &s.catalog)
    }

    pub fn operator(&self) -> Option<&CovarianceOperator<L>> {
        self.stages.as_ref().map(|s| &s.operator)
    }

    fn operator_mut(&mut self) -> AssimResult<&mut CovarianceOperator<L>> {
        self.stages.as_mut().map(|s| &mut s.operator).ok_or(AssimError::PluginNotInitialized)
    }
}

impl<L: EofLoader> AssimilationPlugin for VariationalPlugin<L> {
    /// Errors
    /// ------
    /// - Option and selection errors as for the ensemble plugin.
    /// - Role errors from [`CovarianceOperator::new`] (missing total or depth
    ///   variable, profile length mismatches).
    fn initialize(
        &mut self, variables: &VariableCatalog, ensemble_size: usize,
    ) -> AssimResult<Vec<String>> {
        self.config.validate()?;
        crate::state::validation::validate_members(None, ensemble_size)?;
        log::info!("Available variables: {}", variables.names().collect::<Vec<_>>().join(", "));

        let catalog = self.config.selection.apply(variables)?;
        // Resolve before releasing the loader so a rejected catalog leaves the
        // plugin as it was.
        let layout = CvtLayout::resolve(&catalog, &self.config.cvt)?;
        let loader = match (self.loader.take(), self.stages.take()) {
            (Some(loader), _) => loader,
            (None, Some(stages)) => stages.operator.into_loader(),
            (None, None) => return Err(AssimError::PluginNotInitialized),
        };
        let operator = CovarianceOperator::from_layout(layout, self.config.cvt.clone(), loader);

        let retained = catalog.names();
        log::info!(
            "Covariance transform on '{}' with groups [{}]",
            self.config.cvt.total_variable,
            operator.group_names().collect::<Vec<_>>().join(", ")
        );
        self.stages = Some(Stages { catalog, operator });
        Ok(retained)
    }

    fn before_analysis(
        &mut self, time: NaiveDateTime, state: ArrayViewMut2<'_, f64>,
        _observations: Option<&mut ObservationBatch<'_>>,
    ) -> AssimResult<CycleReport> {
        let check_finite = self.config.check_finite;
        let stages = self.stages.as_mut().ok_or(AssimError::PluginNotInitialized)?;
        let view = StateView::new(state, &stages.catalog)?;
        if check_finite {
            view.check_finite()?;
        }
        let basis_reloaded = stages.operator.begin_cycle(time, view.member(0))?;
        Ok(CycleReport { basis_reloaded, ..CycleReport::default() })
    }

    fn after_analysis(&mut self, state: ArrayViewMut2<'_, f64>) -> AssimResult<CycleReport> {
        let stages = self.stages.as_ref().ok_or(AssimError::PluginNotInitialized)?;
        StateView::new(state, &stages.catalog)?;
        Ok(CycleReport::default())
    }
}

impl<L: EofLoader> CvtHandler for VariationalPlugin<L> {
    fn cvt(
        &mut self, iteration: i32, state: ArrayView1<'_, f64>, control: ArrayView1<'_, f64>,
    ) -> AssimResult<Array1<f64>> {
        self.operator_mut()?.forward(iteration, state, control)
    }

    fn cvt_adj(
        &mut self, iteration: i32, state: ArrayView1<'_, f64>, perturbation: ArrayView1<'_, f64>,
    ) -> AssimResult<Array1<f64>> {
        self.operator_mut()?.adjoint(iteration, state, perturbation)
    }
}
