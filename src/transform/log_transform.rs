//! Log-space transform stage — reversible per-variable transforms applied
//! around the analysis step.
//!
//! Purpose
//! -------
//! Move selected variables (and, optionally, the observations that map into
//! them) to base-10 log space before the analysis, and back afterwards, so
//! that strictly positive quantities such as chlorophyll are analysed with
//! multiplicative errors.
//!
//! Key behaviors
//! -------------
//! - [`TransformStage::forward`] rewrites, for every log-transformed variable,
//!   first the affected observations and then the variable's slice in every
//!   ensemble member, all in place.
//! - [`TransformStage::inverse`] maps the same slices back with `10^x`.
//! - Non-positive inputs follow IEEE `log10` semantics (`-inf` for zero, NaN
//!   for negatives); they are counted, reported in the returned
//!   [`TransformReport`], and logged as a numeric-domain warning. The cycle is
//!   never aborted for them.
//!
//! Invariants & assumptions
//! ------------------------
//! - `inverse(forward(x)) == x` to floating-point precision for every
//!   `x >= minimum` (`x > 0` when no minimum is configured).
//! - Observations are transformed only when `transform_obs` is set, and only
//!   those with `start <= iobs < start + length` for a transformed variable.
//! - Observation standard deviations are left untouched.
//!
//! Conventions
//! -----------
//! - Transforms are elementwise; the `(M, length)` shape of the slice does
//!   not matter.
//! - Log messages go through the `log` facade under this module's target.
use chrono::NaiveDateTime;

use crate::{
    errors::AssimResult,
    state::{
        catalog::{RetainedCatalog, VariableEntry},
        observations::ObservationBatch,
        validation::{validate_positive, validate_unique_names},
        view::StateView,
    },
};

/// TransformOptions — knobs for the log-space stage.
///
/// Fields
/// ------
/// - `transform_obs`: `bool`
///   Whether observations mapped into a transformed variable are moved to log
///   space as well. Defaults to `true`.
/// - `minimum`: `Option<f64>`
///   Optional floor applied to state and observation values before taking
///   the log. `None` (default) leaves non-positive values to IEEE semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformOptions {
    pub transform_obs: bool,
    pub minimum: Option<f64>,
}

impl TransformOptions {
    /// Errors
    /// ------
    /// - `AssimError::InvalidThreshold` if `minimum` is non-finite or `<= 0`.
    pub fn new(transform_obs: bool, minimum: Option<f64>) -> AssimResult<Self> {
        if let Some(value) = minimum {
            validate_positive("log-transform minimum", value)?;
        }
        Ok(TransformOptions { transform_obs, minimum })
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions { transform_obs: true, minimum: None }
    }
}

/// Counts reported by [`TransformStage::forward`] / [`TransformStage::inverse`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// State values rewritten (all members).
    pub state_values: usize,
    /// Observation values rewritten.
    pub observations: usize,
    /// Non-positive state values encountered before the log.
    pub non_positive_state: usize,
    /// Non-positive observation values encountered before the log.
    pub non_positive_obs: usize,
}

/// TransformStage — the set of variables moved to log space each cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStage {
    variables: Vec<VariableEntry>,
    options: TransformOptions,
}

impl TransformStage {
    /// Build a stage log-transforming `names`.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidOption` if a name is listed twice.
    /// - `AssimError::MissingVariable` if a name is not retained.
    pub fn new<S: AsRef<str>>(
        catalog: &RetainedCatalog, names: &[S], options: TransformOptions,
    ) -> AssimResult<Self> {
        validate_unique_names("log_variables", names)?;
        let variables = names
            .iter()
            .map(|name| catalog.require(name.as_ref()).cloned())
            .collect::<AssimResult<Vec<_>>>()?;
        Ok(TransformStage { variables, options })
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn options(&self) -> TransformOptions {
        self.options
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|entry| entry.name.as_str())
    }

    /// Move the configured variables (and affected observations) to log space.
    ///
    /// Parameters
    /// ----------
    /// - `time`: cycle time, used for diagnostics only.
    /// - `state`: ensemble view; every member's slice is rewritten in place.
    /// - `observations`: optional batch; affected `obs` entries are rewritten
    ///   in place when `transform_obs` is set.
    ///
    /// Returns
    /// -------
    /// A [`TransformReport`] with the number of rewritten and non-positive
    /// values. Non-positive inputs are not errors.
    pub fn forward(
        &self, time: NaiveDateTime, state: &mut StateView<'_, '_>,
        mut observations: Option<&mut ObservationBatch<'_>>,
    ) -> TransformReport {
        let mut report = TransformReport::default();
        let floor = self.options.minimum;
        // NaN compares false and passes through unfloored.
        let prepare = |x: f64| floor.map_or(x, |m| if x < m { m } else { x });

        for entry in &self.variables {
            if self.options.transform_obs {
                if let Some(batch) = observations.as_deref_mut() {
                    let before = report.non_positive_obs;
                    report.non_positive_obs += batch
                        .affected(entry)
                        .iter()
                        .filter(|&&k| prepare(batch.obs()[k]) <= 0.0)
                        .count();
                    report.observations +=
                        batch.map_affected_inplace(entry, |x| prepare(x).log10());
                    if report.non_positive_obs > before {
                        log::warn!(
                            "{time}: {} non-positive observation(s) of '{}' moved to log space",
                            report.non_positive_obs - before,
                            entry.name
                        );
                    }
                }
            }

            let mut values = state.entry_mut(entry);
            let non_positive = values.iter().filter(|&&x| prepare(x) <= 0.0).count();
            values.mapv_inplace(|x| prepare(x).log10());
            report.state_values += values.len();
            report.non_positive_state += non_positive;
            if non_positive > 0 {
                log::warn!(
                    "{time}: {non_positive} non-positive value(s) of '{}' moved to log space",
                    entry.name
                );
            }
        }
        report
    }

    /// Map the configured variables back from log space, in place.
    pub fn inverse(&self, state: &mut StateView<'_, '_>) -> TransformReport {
        let mut report = TransformReport::default();
        for entry in &self.variables {
            let mut values = state.entry_mut(entry);
            values.mapv_inplace(|y| 10f64.powf(y));
            report.state_values += values.len();
        }
        report
    }
}
