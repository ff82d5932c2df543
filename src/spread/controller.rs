//! SpreadController — post-analysis clipping, spread inflation and
//! positivity enforcement over an ensemble.
//!
//! Purpose
//! -------
//! Keep analysed ensembles physically plausible before they go back to the
//! model: the last-level ensemble mean of each controlled variable is held
//! inside `[lower_threshold, upper_threshold]`, a collapsed ensemble is
//! re-inflated relative to its last-level spread, and positivity-constrained
//! variables never leave the analysis negative.
//!
//! Key behaviors
//! -------------
//! - [`clip_last_level`] shifts the last level of one variable so its mean
//!   meets the violated threshold, then clamps stragglers. At most one branch
//!   fires per call.
//! - [`inflate_profile`] rescales every level's spread around its own mean
//!   when the last-level mean absolute deviation falls below
//!   `spread_fraction * mean`.
//! - [`enforce_positivity`] replaces negative values with the floor and
//!   returns how many were replaced.
//! - [`SpreadController::clip_and_inflate`] runs the three steps in that
//!   order over a [`StateView`] and logs what happened.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every statistic is computed over the whole member axis before any value
//!   at that level is written.
//! - Inflation preserves each level's ensemble mean (up to rounding).
//! - Levels with zero spread are never divided by; they are skipped and
//!   reported.
//!
//! Conventions
//! -----------
//! - Within a variable's `(M, length)` view, column `length - 1` is the last
//!   level, the one clipping and the inflation trigger are evaluated on.
//!
//! Testing notes
//! -------------
//! - Unit tests cover both clipping branches and their clamps, the
//!   idempotence of the full pass on compliant ensembles, mean preservation
//!   under inflation, zero-spread guards, and the positivity floor.
use ndarray::{ArrayViewMut2, Axis};

use crate::{
    errors::AssimResult,
    spread::{
        options::SpreadOptions,
        stats::{LevelStats, level_stats},
    },
    state::{
        catalog::{RetainedCatalog, VariableEntry},
        validation::validate_unique_names,
        view::StateView,
    },
};

/// Which clipping branch fired on the last level, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipOutcome {
    Unchanged,
    /// The mean was raised by `shift`; `clamped` members were then lifted to
    /// the lower floor.
    Raised { shift: f64, clamped: usize },
    /// The mean was lowered by `shift`; `clamped` members were then cut to
    /// the upper ceiling.
    Lowered { shift: f64, clamped: usize },
}

/// Result of the inflation step for one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum InflationOutcome {
    /// Last-level spread already at or above the target.
    NotNeeded,
    /// The last level has no spread; nothing can be rescaled.
    SkippedZeroSpread,
    /// Levels were rescaled; `skipped_levels` lists levels left untouched
    /// because their own spread was zero.
    Inflated { levels: usize, skipped_levels: Vec<usize> },
}

/// Per-variable summary of one [`SpreadController::clip_and_inflate`] pass.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpreadReport {
    pub name: String,
    pub clip: ClipOutcome,
    pub inflation: InflationOutcome,
}

/// Summary of one full pass over the ensemble.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadReport {
    pub controlled: Vec<VariableSpreadReport>,
    /// `(name, count)` of negative values replaced by the positivity floor.
    pub floored: Vec<(String, usize)>,
}

impl SpreadReport {
    pub fn total_floored(&self) -> usize {
        self.floored.iter().map(|(_, count)| count).sum()
    }
}

/// SpreadController — bound set of controlled and positivity-constrained
/// variables plus the options applied to them.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadController {
    controlled: Vec<VariableEntry>,
    positive: Vec<VariableEntry>,
    options: SpreadOptions,
}

impl SpreadController {
    /// Bind the controller to retained variables.
    ///
    /// Parameters
    /// ----------
    /// - `controlled`: variables clipped and inflated after each analysis.
    /// - `positive`: variables whose negative values are floored.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidOption` if a list names a variable twice.
    /// - `AssimError::MissingVariable` if a name is not in `catalog`.
    pub fn new<S: AsRef<str>, T: AsRef<str>>(
        catalog: &RetainedCatalog, controlled: &[S], positive: &[T], options: SpreadOptions,
    ) -> AssimResult<Self> {
        validate_unique_names("controlled", controlled)?;
        validate_unique_names("positive", positive)?;
        let resolve = |name: &str| catalog.require(name).cloned();
        let controlled =
            controlled.iter().map(|n| resolve(n.as_ref())).collect::<AssimResult<Vec<_>>>()?;
        let positive =
            positive.iter().map(|n| resolve(n.as_ref())).collect::<AssimResult<Vec<_>>>()?;
        Ok(SpreadController { controlled, positive, options })
    }

    pub fn options(&self) -> &SpreadOptions {
        &self.options
    }

    pub fn controlled_names(&self) -> impl Iterator<Item = &str> {
        self.controlled.iter().map(|e| e.name.as_str())
    }

    pub fn positive_names(&self) -> impl Iterator<Item = &str> {
        self.positive.iter().map(|e| e.name.as_str())
    }

    /// Clip, inflate, then enforce positivity on `state`, in place.
    ///
    /// Controlled variables are processed in the order they were given at
    /// construction; positivity runs last over every positive variable.
    ///
    /// Errors
    /// ------
    /// Currently infallible once the controller is built; the `Result` is
    /// kept so buffer checks can surface through the same path as the other
    /// stages.
    pub fn clip_and_inflate(&self, state: &mut StateView<'_, '_>) -> AssimResult<SpreadReport> {
        let mut report = SpreadReport::default();

        for entry in &self.controlled {
            let mut values = state.entry_mut(entry);
            let clip = clip_last_level(values.view_mut(), &self.options);
            match clip {
                ClipOutcome::Unchanged => {}
                ClipOutcome::Raised { shift, clamped } => log::info!(
                    "Raised last-level mean of '{}' by {shift:.4e} ({clamped} member(s) clamped)",
                    entry.name
                ),
                ClipOutcome::Lowered { shift, clamped } => log::info!(
                    "Lowered last-level mean of '{}' by {shift:.4e} ({clamped} member(s) clamped)",
                    entry.name
                ),
            }

            let inflation = inflate_profile(values, self.options.spread_fraction);
            match &inflation {
                InflationOutcome::NotNeeded => {}
                InflationOutcome::SkippedZeroSpread => log::warn!(
                    "Ensemble spread of '{}' is zero at the last level; inflation skipped",
                    entry.name
                ),
                InflationOutcome::Inflated { levels, skipped_levels } => {
                    log::info!("Increasing spread of the ensemble for '{}'", entry.name);
                    if !skipped_levels.is_empty() {
                        log::warn!(
                            "'{}': {} of {levels} level(s) have zero spread and were left as is",
                            entry.name,
                            skipped_levels.len()
                        );
                    }
                }
            }

            report.controlled.push(VariableSpreadReport { name: entry.name.clone(), clip, inflation });
        }

        for entry in &self.positive {
            let count = enforce_positivity(state.entry_mut(entry), self.options.positivity_floor);
            log::info!("Number of negative values in '{}': {count}", entry.name);
            report.floored.push((entry.name.clone(), count));
        }

        Ok(report)
    }
}

/// Hold the last-level ensemble mean of one variable inside the thresholds.
///
/// Parameters
/// ----------
/// - `values`: `(M, length)` view of one variable; only column `length - 1`
///   is read or written.
///
/// Returns
/// -------
/// The branch that fired. With `m` the last-level mean: if `m < lower`
/// (and `clip_below`), every member is shifted by `lower - m` and values
/// below `lower_floor()` are raised to it; else if `m > upper` (and
/// `clip_above`), every member is shifted by `-(m - upper)` and values above
/// `upper_ceiling` are cut to it.
///
/// Notes
/// -----
/// - A NaN mean matches neither branch.
pub fn clip_last_level(mut values: ArrayViewMut2<'_, f64>, options: &SpreadOptions) -> ClipOutcome {
    let Some(last) = values.ncols().checked_sub(1) else {
        return ClipOutcome::Unchanged;
    };
    let mut level = values.column_mut(last);
    let mean = level_stats(level.view()).mean;

    if options.clip_below && mean < options.lower_threshold {
        let shift = options.lower_threshold - mean;
        let floor = options.lower_floor();
        let mut clamped = 0;
        level.mapv_inplace(|x| {
            let shifted = x + shift;
            if shifted < floor {
                clamped += 1;
                floor
            } else {
                shifted
            }
        });
        ClipOutcome::Raised { shift, clamped }
    } else if options.clip_above && mean > options.upper_threshold {
        let shift = mean - options.upper_threshold;
        let ceiling = options.upper_ceiling;
        let mut clamped = 0;
        level.mapv_inplace(|x| {
            let shifted = x - shift;
            if shifted > ceiling {
                clamped += 1;
                ceiling
            } else {
                shifted
            }
        });
        ClipOutcome::Lowered { shift, clamped }
    } else {
        ClipOutcome::Unchanged
    }
}

/// Re-inflate a collapsed ensemble profile.
///
/// Inflation fires when `mad_s < spread_fraction * mean_s`, where `mean_s` and
/// `mad_s` are the mean and mean absolute deviation of the last level. Each
/// level `d` is then rewritten as `mean_d + coeff_d * (x - mean_d)` with
/// `coeff_d = spread_fraction * (mad_d / mad_s) * mean_d / mad_d`, which leaves
/// `mean_d` unchanged and sets the level's spread to
/// `spread_fraction * mean_d * mad_d / mad_s`.
///
/// Notes
/// -----
/// - Statistics of every level are gathered before the first write.
/// - A single-level profile is the degenerate case where the last level is
///   the only level.
pub fn inflate_profile(mut values: ArrayViewMut2<'_, f64>, spread_fraction: f64) -> InflationOutcome {
    let Some(last) = values.ncols().checked_sub(1) else {
        return InflationOutcome::NotNeeded;
    };
    let stats: Vec<LevelStats> = values.axis_iter(Axis(1)).map(level_stats).collect();
    let surface = stats[last];

    if !(surface.mean_abs_dev < spread_fraction * surface.mean) {
        return InflationOutcome::NotNeeded;
    }
    if surface.mean_abs_dev == 0.0 {
        return InflationOutcome::SkippedZeroSpread;
    }

    let mut skipped_levels = Vec::new();
    for (d, (mut level, level_stat)) in
        values.axis_iter_mut(Axis(1)).zip(stats.iter()).enumerate()
    {
        let LevelStats { mean, mean_abs_dev } = *level_stat;
        if mean_abs_dev == 0.0 {
            skipped_levels.push(d);
            continue;
        }
        let coeff = spread_fraction * (mean_abs_dev / surface.mean_abs_dev) * mean / mean_abs_dev;
        level.mapv_inplace(|x| mean + coeff * (x - mean));
    }

    InflationOutcome::Inflated { levels: stats.len(), skipped_levels }
}

/// Replace every negative value with `floor`; returns the number replaced.
pub fn enforce_positivity(mut values: ArrayViewMut2<'_, f64>, floor: f64) -> usize {
    let mut count = 0;
    values.mapv_inplace(|x| {
        if x < 0.0 {
            count += 1;
            floor
        } else {
            x
        }
    });
    count
}
