//! Spread-control options — clipping thresholds, inflation target and
//! positivity floor.
//!
//! Purpose
//! -------
//! Collect every constant used by the post-analysis spread controller in one
//! validated structure, so no threshold is hard-wired in the algorithms.
//!
//! Key behaviors
//! -------------
//! - [`SpreadOptions::new`] validates the lower/upper thresholds and derives
//!   the reference defaults for everything else.
//! - `with_*` methods adjust one knob at a time and re-validate it.
//!
//! Invariants & assumptions
//! ------------------------
//! - `0 < lower_threshold < upper_threshold`, both finite.
//! - `0 < lower_floor_factor < 1`, `upper_ceiling > 0`,
//!   `0 < spread_fraction < 1`, `positivity_floor > 0`.
//! - `upper_ceiling` defaults to `5 * lower_threshold`, which is what the
//!   controller applies after lowering an ensemble mean. It is kept
//!   as an explicit option rather than tied to `upper_threshold`.
//!
//! Conventions
//! -----------
//! - Thresholds are in the controlled variable's own units.
use crate::{
    errors::{AssimError, AssimResult},
    state::validation::{validate_open_interval, validate_positive},
};

/// Default lower threshold on the last-level ensemble mean.
pub const DEFAULT_LOWER_THRESHOLD: f64 = 0.1;
/// Default upper threshold on the last-level ensemble mean.
pub const DEFAULT_UPPER_THRESHOLD: f64 = 5.0;
/// Members are never left below this fraction of the lower threshold.
pub const DEFAULT_LOWER_FLOOR_FACTOR: f64 = 0.2;
/// Multiple of the lower threshold used as the default ceiling.
pub const DEFAULT_CEILING_FACTOR: f64 = 5.0;
/// Minimum relative spread (mean |dev| / mean) at the last level.
pub const DEFAULT_SPREAD_FRACTION: f64 = 0.15;
/// Replacement for negative values of positivity-constrained variables.
pub const POSITIVITY_FLOOR: f64 = 1.0e-8;

/// SpreadOptions — configuration of [`SpreadController`](crate::spread::SpreadController).
///
/// Fields
/// ------
/// - `lower_threshold` / `upper_threshold`: bounds on the last-level mean.
/// - `clip_below` / `clip_above`: enable each clipping branch.
/// - `lower_floor_factor`: after raising the mean, members below
///   `lower_floor_factor * lower_threshold` are set to that value.
/// - `upper_ceiling`: after lowering the mean, members above it are set to it.
/// - `spread_fraction`: inflation fires when the last-level mean absolute
///   deviation falls below `spread_fraction * mean`.
/// - `positivity_floor`: value substituted for negatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadOptions {
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub clip_below: bool,
    pub clip_above: bool,
    pub lower_floor_factor: f64,
    pub upper_ceiling: f64,
    pub spread_fraction: f64,
    pub positivity_floor: f64,
}

impl SpreadOptions {
    /// Build options for the given thresholds with the reference defaults for
    /// every other knob.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidThreshold` if a threshold is non-finite, not
    ///   strictly positive, or `lower_threshold >= upper_threshold`.
    pub fn new(lower_threshold: f64, upper_threshold: f64) -> AssimResult<Self> {
        validate_positive("lower threshold", lower_threshold)?;
        validate_positive("upper threshold", upper_threshold)?;
        if lower_threshold >= upper_threshold {
            return Err(AssimError::InvalidThreshold {
                name: "upper threshold",
                value: upper_threshold,
                reason: "Must be greater than the lower threshold.",
            });
        }
        Ok(SpreadOptions {
            lower_threshold,
            upper_threshold,
            clip_below: true,
            clip_above: true,
            lower_floor_factor: DEFAULT_LOWER_FLOOR_FACTOR,
            upper_ceiling: DEFAULT_CEILING_FACTOR * lower_threshold,
            spread_fraction: DEFAULT_SPREAD_FRACTION,
            positivity_floor: POSITIVITY_FLOOR,
        })
    }

    pub fn with_clipping(mut self, clip_below: bool, clip_above: bool) -> Self {
        self.clip_below = clip_below;
        self.clip_above = clip_above;
        self
    }

    pub fn with_lower_floor_factor(mut self, factor: f64) -> AssimResult<Self> {
        self.lower_floor_factor =
            validate_open_interval("lower floor factor", factor, 0.0, 1.0, "Must lie in (0, 1).")?;
        Ok(self)
    }

    pub fn with_upper_ceiling(mut self, ceiling: f64) -> AssimResult<Self> {
        self.upper_ceiling = validate_positive("upper ceiling", ceiling)?;
        Ok(self)
    }

    pub fn with_spread_fraction(mut self, fraction: f64) -> AssimResult<Self> {
        self.spread_fraction =
            validate_open_interval("spread fraction", fraction, 0.0, 1.0, "Must lie in (0, 1).")?;
        Ok(self)
    }

    pub fn with_positivity_floor(mut self, floor: f64) -> AssimResult<Self> {
        self.positivity_floor = validate_positive("positivity floor", floor)?;
        Ok(self)
    }

    /// Members are raised to at least this value after the mean is raised.
    #[inline]
    pub fn lower_floor(&self) -> f64 {
        self.lower_floor_factor * self.lower_threshold
    }
}

impl Default for SpreadOptions {
    fn default() -> Self {
        SpreadOptions {
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            upper_threshold: DEFAULT_UPPER_THRESHOLD,
            clip_below: true,
            clip_above: true,
            lower_floor_factor: DEFAULT_LOWER_FLOOR_FACTOR,
            upper_ceiling: DEFAULT_CEILING_FACTOR * DEFAULT_LOWER_THRESHOLD,
            spread_fraction: DEFAULT_SPREAD_FRACTION,
            positivity_floor: POSITIVITY_FLOOR,
        }
    }
}
