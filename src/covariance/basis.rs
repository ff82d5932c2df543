//! Vertical basis — EOF modes interpolated onto the model's depth grid, and
//! the month-keyed cache that keeps it current.
//!
//! Purpose
//! -------
//! Build `Vmat` (`dim_cvec × nz`) from an [`EofTable`] and the model's current
//! depth coordinate, and rebuild it exactly once whenever the assimilation
//! month changes.
//!
//! Key behaviors
//! -------------
//! - [`VerticalBasis::interpolate`] interpolates the first `dim_cvec` modes
//!   piecewise-linearly onto the model depths with constant extrapolation
//!   beyond the table's end levels.
//! - [`BasisCache::ensure_current`] is the single entry point that compares
//!   the cached [`MonthKey`] and reloads through an [`EofLoader`] on change.
//!
//! Invariants & assumptions
//! ------------------------
//! - Interpolation abscissae are sorted ascending before use; a positive-down
//!   table is negated first so it lines up with an elevation coordinate.
//! - A failed reload leaves the cache empty so later calls cannot silently
//!   use the previous month's basis.
//!
//! Testing notes
//! -------------
//! - Unit tests cover interior/extrapolated interpolation, mode truncation,
//!   and the reload counter across month changes.
use chrono::{Datelike, NaiveDateTime};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{
    covariance::{
        eof::{EofLoader, EofTable},
        errors::EofError,
    },
    errors::{AssimError, AssimResult},
};

/// Calendar month (1–12) the basis was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey(u32);

impl MonthKey {
    pub fn new(month: u32) -> AssimResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AssimError::InvalidOption {
                name: "month",
                reason: format!("Calendar months run from 1 to 12; got {month}."),
            });
        }
        Ok(MonthKey(month))
    }

    pub fn month(self) -> u32 {
        self.0
    }
}

impl From<&NaiveDateTime> for MonthKey {
    fn from(time: &NaiveDateTime) -> Self {
        MonthKey(time.month())
    }
}

/// `Vmat`: one row per control mode, one column per model level.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalBasis {
    matrix: Array2<f64>,
}

impl VerticalBasis {
    /// Interpolate the first `dim_cvec` modes of `table` onto `model_depth`.
    ///
    /// Parameters
    /// ----------
    /// - `model_depth`: the model's current vertical coordinate, one value per
    ///   level, in the state's level order.
    /// - `positive_down`: the table's depths are positive downward and are
    ///   negated before interpolation.
    ///
    /// Errors
    /// ------
    /// - `AssimError::MalformedResource` if the table has fewer than
    ///   `dim_cvec` modes.
    pub fn interpolate(
        table: &EofTable, dim_cvec: usize, model_depth: ArrayView1<'_, f64>, positive_down: bool,
    ) -> AssimResult<Self> {
        if table.n_modes() < dim_cvec {
            return Err(EofError::TooFewModes {
                path: format!("EOF table ({} levels)", table.levels()),
                required: dim_cvec,
                available: table.n_modes(),
            }
            .into());
        }

        let sign = if positive_down { -1.0 } else { 1.0 };
        let mut order: Vec<usize> = (0..table.levels()).collect();
        let xp_raw: Vec<f64> = table.depth().iter().map(|z| sign * z).collect();
        order.sort_by(|&a, &b| xp_raw[a].total_cmp(&xp_raw[b]));
        let xp: Vec<f64> = order.iter().map(|&i| xp_raw[i]).collect();

        let mut matrix = Array2::<f64>::zeros((dim_cvec, model_depth.len()));
        for (mode, mut row) in matrix.outer_iter_mut().enumerate() {
            let eof = table.modes().row(mode);
            let fp: Vec<f64> = order.iter().map(|&i| eof[i]).collect();
            for (out, &z) in row.iter_mut().zip(model_depth.iter()) {
                *out = interp_clamped(z, &xp, &fp);
            }
        }
        Ok(VerticalBasis { matrix })
    }

    /// Wrap a precomputed `dim_cvec × nz` matrix.
    pub fn from_matrix(matrix: Array2<f64>) -> Self {
        VerticalBasis { matrix }
    }

    pub fn matrix(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn dim_cvec(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn levels(&self) -> usize {
        self.matrix.ncols()
    }

    /// `control · Vmat`, a depth profile of length `nz`.
    pub fn project(&self, control: ArrayView1<'_, f64>) -> Array1<f64> {
        control.dot(&self.matrix)
    }

    /// `Vmat · profile`, a control vector of length `dim_cvec`.
    pub fn project_transpose(&self, profile: ArrayView1<'_, f64>) -> Array1<f64> {
        self.matrix.dot(&profile)
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`, holding the end
/// values outside `[xp[0], xp[n-1]]`.
///
/// `xp` must be sorted ascending and non-empty. NaN `x` yields NaN.
pub fn interp_clamped(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len();
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // first index with xp[hi] > x; 1 <= hi <= n - 1 here
    let hi = xp.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xp[lo]) / (xp[hi] - xp[lo]);
    fp[lo] + t * (fp[hi] - fp[lo])
}

/// Month-keyed cache around a [`VerticalBasis`].
#[derive(Debug, Clone, Default)]
pub struct BasisCache {
    key: Option<MonthKey>,
    basis: Option<VerticalBasis>,
    reloads: usize,
}

impl BasisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the cached basis belongs to `key`, reloading through
    /// `loader` if it does not.
    ///
    /// Returns `true` if a reload happened.
    ///
    /// Errors
    /// ------
    /// - Whatever `loader` or [`VerticalBasis::interpolate`] report; the cache
    ///   is emptied in that case.
    pub fn ensure_current<L: EofLoader + ?Sized>(
        &mut self, key: MonthKey, loader: &mut L, model_depth: ArrayView1<'_, f64>, dim_cvec: usize,
        positive_down: bool,
    ) -> AssimResult<bool> {
        if self.key == Some(key) && self.basis.is_some() {
            return Ok(false);
        }
        self.key = None;
        self.basis = None;

        let table = loader.load(key.month())?;
        let basis = VerticalBasis::interpolate(&table, dim_cvec, model_depth, positive_down)?;
        log::info!(
            "Vertical basis rebuilt for month {:02} ({} modes on {} levels)",
            key.month(),
            basis.dim_cvec(),
            basis.levels()
        );
        self.basis = Some(basis);
        self.key = Some(key);
        self.reloads += 1;
        Ok(true)
    }

    pub fn basis(&self) -> Option<&VerticalBasis> {
        self.basis.as_ref()
    }

    pub fn key(&self) -> Option<MonthKey> {
        self.key
    }

    /// Number of successful rebuilds since construction.
    pub fn reloads(&self) -> usize {
        self.reloads
    }
}
