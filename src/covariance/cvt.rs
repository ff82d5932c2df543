//! CovarianceOperator — forward and adjoint control-variable transform for
//! parameterized 3D-Var.
//!
//! Purpose
//! -------
//! Map a `dim_cvec` control vector to a full-state perturbation (forward) and
//! a full-state perturbation back to control space (adjoint). The vertical
//! structure comes from the month's [`VerticalBasis`]; the split between
//! dependent groups follows each group's share of a total quantity captured
//! at the first iteration of a minimization.
//!
//! Key behaviors
//! -------------
//! - [`CovarianceOperator::begin_cycle`] refreshes the basis for the cycle's
//!   month and starts a new minimization (drops the total reference).
//! - [`CovarianceOperator::forward`] snapshots the total reference at
//!   `iteration == 1`, writes `v · Vmat` into the total slice and
//!   `max(ratio, ratio_floor) * state[g]` into every dependent group slice.
//! - [`CovarianceOperator::adjoint`] accumulates
//!   `Σ_g q[g] * state[g] / total_ref` plus `q[total]` and projects through
//!   `Vmat`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Total, depth and every dependent group have exactly `nz` levels (the
//!   depth variable's length); checked at construction.
//! - The total reference is reused unmodified for every call of the same
//!   minimization, regardless of later `state` values.
//! - Each group's contribution is divided by the reference before it is
//!   added, which makes the pair a true adjoint wherever the ratio floor is
//!   inactive. The adjoint does not mask floored levels.
//! - Dependent groups are processed in catalog order.
//!
//! Conventions
//! -----------
//! - Iterations count from 1. Any call with `iteration < 1` is a usage error,
//!   as is any call before the iteration-1 snapshot of the minimization.
//! - Zero values in the total reference are warned about once per snapshot;
//!   the resulting ratios follow IEEE semantics.
//!
//! Testing notes
//! -------------
//! - Unit tests include the randomized inner-product adjoint test, the
//!   ratio floor, snapshot reuse, and every usage error.
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayView1, s};

use crate::{
    covariance::{
        basis::{BasisCache, MonthKey, VerticalBasis},
        eof::EofLoader,
    },
    errors::{AssimError, AssimResult},
    state::{
        catalog::{RetainedCatalog, VariableEntry},
        validation::{validate_open_interval, validate_state_len},
    },
};

/// Default control-vector dimension.
pub const DEFAULT_DIM_CVEC: usize = 26;
/// Default lower bound on the total-to-group ratio.
pub const DEFAULT_RATIO_FLOOR: f64 = -0.99;

/// CvtOptions — variable roles and numerical knobs of the operator.
///
/// Fields
/// ------
/// - `total_variable`: name of the total quantity (e.g. total chlorophyll).
/// - `depth_variable`: name of the model's vertical coordinate in the state.
/// - `group_patterns`: shell-style patterns selecting dependent groups; the
///   total and depth variables are never groups.
/// - `dim_cvec`: control-vector dimension; the first `dim_cvec` EOF modes
///   are used.
/// - `ratio_floor`: lower clamp of `vertical / total_ref`, in `(-1, 0]`.
/// - `eof_depth_positive_down`: negate EOF depths before interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct CvtOptions {
    pub total_variable: String,
    pub depth_variable: String,
    pub group_patterns: Vec<String>,
    pub dim_cvec: usize,
    pub ratio_floor: f64,
    pub eof_depth_positive_down: bool,
}

impl CvtOptions {
    /// Options for `total_variable` with every other field at its default.
    pub fn new(total_variable: impl Into<String>) -> Self {
        CvtOptions { total_variable: total_variable.into(), ..Self::default() }
    }

    /// Check the numerical knobs.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidOption` if `dim_cvec == 0` or a role name is
    ///   empty.
    /// - `AssimError::InvalidThreshold` if `ratio_floor` is outside `(-1, 0]`.
    pub fn validate(&self) -> AssimResult<()> {
        if self.dim_cvec == 0 {
            return Err(AssimError::InvalidOption {
                name: "dim_cvec",
                reason: "The control vector needs at least one mode.".to_string(),
            });
        }
        if self.total_variable.is_empty() || self.depth_variable.is_empty() {
            return Err(AssimError::InvalidOption {
                name: "variables",
                reason: "Total and depth variable names must be non-empty.".to_string(),
            });
        }
        if self.ratio_floor != 0.0 {
            validate_open_interval(
                "ratio floor",
                self.ratio_floor,
                -1.0,
                0.0,
                "Must lie in (-1, 0] so dependent groups keep their sign.",
            )?;
        }
        Ok(())
    }
}

impl Default for CvtOptions {
    fn default() -> Self {
        CvtOptions {
            total_variable: "total_chlorophyll".to_string(),
            depth_variable: "z".to_string(),
            group_patterns: vec!["P*".to_string()],
            dim_cvec: DEFAULT_DIM_CVEC,
            ratio_floor: DEFAULT_RATIO_FLOOR,
            eof_depth_positive_down: true,
        }
    }
}

/// Forward/adjoint CVT bound to a retained catalog and an EOF source.
#[derive(Debug)]
pub struct CovarianceOperator<L> {
    options: CvtOptions,
    total: VariableEntry,
    depth: VariableEntry,
    groups: Vec<VariableEntry>,
    state_len: usize,
    loader: L,
    cache: BasisCache,
    total_ref: Option<Array1<f64>>,
}

/// Variable roles of a [`CovarianceOperator`], resolved against a catalog.
///
/// Resolving the layout first lets a caller validate a catalog without
/// giving up its loader.
#[derive(Debug, Clone, PartialEq)]
pub struct CvtLayout {
    total: VariableEntry,
    depth: VariableEntry,
    groups: Vec<VariableEntry>,
    state_len: usize,
}

impl CvtLayout {
    /// Resolve the total, depth and group variables of `options` in `catalog`.
    ///
    /// Errors
    /// ------
    /// - Option errors from [`CvtOptions::validate`].
    /// - `AssimError::MissingVariable` if the total or depth variable is not
    ///   retained.
    /// - `AssimError::InvalidPattern` for an unusable group pattern.
    /// - `AssimError::ProfileLengthMismatch` if the total or a group does not
    ///   have one value per depth level.
    pub fn resolve(catalog: &RetainedCatalog, options: &CvtOptions) -> AssimResult<Self> {
        options.validate()?;
        let total = catalog.require(&options.total_variable)?.clone();
        let depth = catalog.require(&options.depth_variable)?.clone();
        let nz = depth.length;
        check_profile(&total, nz)?;

        let groups = catalog
            .matching(options.group_patterns.as_slice())?
            .into_iter()
            .filter(|e| e.name != total.name && e.name != depth.name)
            .cloned()
            .collect::<Vec<_>>();
        for group in &groups {
            check_profile(group, nz)?;
        }
        if groups.is_empty() {
            log::warn!(
                "No dependent group matches {:?}; only '{}' will be perturbed",
                options.group_patterns,
                total.name
            );
        }

        Ok(CvtLayout { total, depth, groups, state_len: catalog.state_len() })
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }
}

impl<L: EofLoader> CovarianceOperator<L> {
    /// Resolve variable roles in `catalog` and bind `loader`.
    ///
    /// Errors
    /// ------
    /// - Everything [`CvtLayout::resolve`] rejects; `loader` is dropped.
    pub fn new(catalog: &RetainedCatalog, options: CvtOptions, loader: L) -> AssimResult<Self> {
        let layout = CvtLayout::resolve(catalog, &options)?;
        Ok(Self::from_layout(layout, options, loader))
    }

    /// Bind `loader` to a layout resolved with the same `options`.
    pub(crate) fn from_layout(layout: CvtLayout, options: CvtOptions, loader: L) -> Self {
        let CvtLayout { total, depth, groups, state_len } = layout;
        CovarianceOperator {
            options,
            total,
            depth,
            groups,
            state_len,
            loader,
            cache: BasisCache::new(),
            total_ref: None,
        }
    }

    pub fn options(&self) -> &CvtOptions {
        &self.options
    }

    /// Number of vertical levels.
    pub fn levels(&self) -> usize {
        self.depth.length
    }

    pub fn dim_cvec(&self) -> usize {
        self.options.dim_cvec
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    pub fn basis(&self) -> Option<&VerticalBasis> {
        self.cache.basis()
    }

    pub fn cache(&self) -> &BasisCache {
        &self.cache
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Release the loader, dropping the cached basis.
    pub fn into_loader(self) -> L {
        self.loader
    }

    /// Total reference of the current minimization, if captured.
    pub fn total_reference(&self) -> Option<ArrayView1<'_, f64>> {
        self.total_ref.as_ref().map(|r| r.view())
    }

    /// Prepare for a new analysis at `time`.
    ///
    /// Reloads the basis if `time` falls in a different month than the cached
    /// one, interpolating onto the depth variable's current values in
    /// `state`, and starts a new minimization.
    ///
    /// Returns
    /// -------
    /// `true` if the basis was rebuilt.
    ///
    /// Errors
    /// ------
    /// - `AssimError::StateLengthMismatch` for a wrongly sized `state`.
    /// - Resource errors from the loader.
    pub fn begin_cycle(&mut self, time: NaiveDateTime, state: ArrayView1<'_, f64>) -> AssimResult<bool> {
        validate_state_len(self.state_len, state.len())?;
        self.total_ref = None;
        let depth = state.slice(s![self.depth.range()]);
        self.cache.ensure_current(
            MonthKey::from(&time),
            &mut self.loader,
            depth,
            self.options.dim_cvec,
            self.options.eof_depth_positive_down,
        )
    }

    /// Forward transform: control vector → full-state perturbation.
    ///
    /// Parameters
    /// ----------
    /// - `iteration`: 1 on the first call of a minimization (captures the
    ///   total reference from `state`), larger afterwards.
    /// - `state`: current analysis state, length `D`.
    /// - `control`: control vector, length `dim_cvec`.
    ///
    /// Returns
    /// -------
    /// A length-`D` vector, zero outside the total and group slices.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidIteration` if `iteration < 1`.
    /// - `AssimError::StateLengthMismatch` / `ControlLengthMismatch` for
    ///   wrongly sized inputs.
    /// - `AssimError::BasisNotReady` before [`Self::begin_cycle`].
    /// - `AssimError::MinimizationNotStarted` if no iteration-1 call preceded.
    pub fn forward(
        &mut self, iteration: i32, state: ArrayView1<'_, f64>, control: ArrayView1<'_, f64>,
    ) -> AssimResult<Array1<f64>> {
        self.check_call(iteration, state, control.len(), self.options.dim_cvec, true)?;
        if iteration == 1 {
            let snapshot = state.slice(s![self.total.range()]).to_owned();
            let zeros = snapshot.iter().filter(|&&x| x == 0.0).count();
            if zeros > 0 {
                log::warn!(
                    "Total reference '{}' has {zeros} zero level(s); ratios there are not finite",
                    self.total.name
                );
            }
            self.total_ref = Some(snapshot);
        }
        let total_ref =
            self.total_ref.as_ref().ok_or(AssimError::MinimizationNotStarted { iteration })?;
        let basis = self.cache.basis().ok_or(AssimError::BasisNotReady)?;

        let vertical = basis.project(control);
        let floor = self.options.ratio_floor;
        let ratio = (&vertical / total_ref).mapv(|r| if r < floor { floor } else { r });

        let mut out = Array1::<f64>::zeros(self.state_len);
        out.slice_mut(s![self.total.range()]).assign(&vertical);
        for group in &self.groups {
            let values = state.slice(s![group.range()]);
            out.slice_mut(s![group.range()]).assign(&(&ratio * &values));
        }
        Ok(out)
    }

    /// Adjoint transform: full-state perturbation → control vector.
    ///
    /// Errors
    /// ------
    /// As [`Self::forward`], with `perturbation` checked against `D`. The
    /// adjoint never captures the total reference itself.
    pub fn adjoint(
        &self, iteration: i32, state: ArrayView1<'_, f64>, perturbation: ArrayView1<'_, f64>,
    ) -> AssimResult<Array1<f64>> {
        self.check_call(iteration, state, perturbation.len(), self.state_len, false)?;
        let total_ref =
            self.total_ref.as_ref().ok_or(AssimError::MinimizationNotStarted { iteration })?;
        let basis = self.cache.basis().ok_or(AssimError::BasisNotReady)?;

        let mut mv = Array1::<f64>::zeros(self.levels());
        for group in &self.groups {
            let q = perturbation.slice(s![group.range()]);
            let values = state.slice(s![group.range()]);
            mv += &(&(&q * &values) / total_ref);
        }
        mv += &perturbation.slice(s![self.total.range()]);

        Ok(basis.project_transpose(mv.view()))
    }

    fn check_call(
        &self, iteration: i32, state: ArrayView1<'_, f64>, input_len: usize, expected_input: usize,
        control_input: bool,
    ) -> AssimResult<()> {
        if iteration < 1 {
            return Err(AssimError::InvalidIteration { iteration });
        }
        validate_state_len(self.state_len, state.len())?;
        if input_len != expected_input {
            return Err(if control_input {
                AssimError::ControlLengthMismatch { expected: expected_input, actual: input_len }
            } else {
                AssimError::StateLengthMismatch { expected: expected_input, actual: input_len }
            });
        }
        Ok(())
    }
}

fn check_profile(entry: &VariableEntry, nz: usize) -> AssimResult<()> {
    if entry.length != nz {
        return Err(AssimError::ProfileLengthMismatch {
            name: entry.name.clone(),
            expected: nz,
            actual: entry.length,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{covariance::eof::EofTable, state::catalog::VariableCatalog};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::{Array2, array};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The inner-product adjoint test on random inputs.
    // - Slice placement, ratio flooring and snapshot reuse in `forward`.
    // - Usage errors: bad iteration, no snapshot, no basis.
    // - Role resolution and profile checks in `CovarianceOperator::new`.
    //
    // They intentionally DO NOT cover:
    // - EOF parsing and interpolation; see `covariance::eof` and
    //   `covariance::basis`.
    // -------------------------------------------------------------------------

    const NZ: usize = 4;

    /// Deterministic modes on a 4-level table, any month.
    #[derive(Debug)]
    struct FixedLoader {
        modes: Array2<f64>,
        calls: usize,
    }

    impl EofLoader for FixedLoader {
        fn load(&mut self, _month: u32) -> AssimResult<EofTable> {
            self.calls += 1;
            Ok(EofTable::new("mem", array![0.0, 10.0, 20.0, 30.0], self.modes.clone())?)
        }
    }

    // Layout: P1_Chl [0,4), P2_Chl [4,8), total_chlorophyll [8,12),
    // N1p [12,16), z [16,20).
    fn catalog() -> RetainedCatalog {
        VariableCatalog::new(
            vec![
                VariableEntry::new("P1_Chl", 0, NZ),
                VariableEntry::new("P2_Chl", NZ, NZ),
                VariableEntry::new("total_chlorophyll", 2 * NZ, NZ),
                VariableEntry::new("N1p", 3 * NZ, NZ),
                VariableEntry::new("z", 4 * NZ, NZ),
            ],
            5 * NZ,
        )
        .unwrap()
        .retain(&["P1_Chl", "P2_Chl", "total_chlorophyll", "N1p", "z"])
        .unwrap()
    }

    fn options(dim_cvec: usize) -> CvtOptions {
        CvtOptions { dim_cvec, ..CvtOptions::default() }
    }

    fn state() -> Array1<f64> {
        let mut x = Array1::<f64>::zeros(5 * NZ);
        x.slice_mut(s![0..4]).assign(&array![0.6, 0.5, 0.3, 0.1]);
        x.slice_mut(s![4..8]).assign(&array![0.4, 0.3, 0.2, 0.1]);
        x.slice_mut(s![8..12]).assign(&array![1.0, 0.8, 0.5, 0.2]);
        x.slice_mut(s![12..16]).assign(&array![7.0, 7.0, 7.0, 7.0]);
        x.slice_mut(s![16..20]).assign(&array![-30.0, -20.0, -10.0, 0.0]);
        x
    }

    fn time(month: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, month, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn operator(modes: Array2<f64>) -> CovarianceOperator<FixedLoader> {
        let dim = modes.nrows();
        let mut op =
            CovarianceOperator::new(&catalog(), options(dim), FixedLoader { modes, calls: 0 })
                .unwrap();
        op.begin_cycle(time(3), state().view()).unwrap();
        op
    }

    fn dot(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        a.dot(b)
    }

    #[test]
    // Purpose
    // -------
    // Verify `<forward(p), q> == <p, adjoint(q)>` for random inputs.
    //
    // Given
    // -----
    // - 3 random modes, seeded RNG; 20 random (p, q) pairs with small `p` so
    //   the ratio floor never binds.
    //
    // Expect
    // ------
    // - Both inner products agree to 1e-10 relative tolerance.
    fn adjoint_passes_inner_product_test() {
        let mut rng = StdRng::seed_from_u64(7);
        let modes = Array2::from_shape_fn((3, NZ), |_| rng.gen_range(-1.0..1.0));
        let mut op = operator(modes);
        let x = state();

        for _ in 0..20 {
            let p = Array1::from_shape_fn(3, |_| rng.gen_range(-0.01..0.01));
            let q = Array1::from_shape_fn(5 * NZ, |_| rng.gen_range(-1.0..1.0));

            let fp = op.forward(1, x.view(), p.view()).unwrap();
            let aq = op.adjoint(1, x.view(), q.view()).unwrap();

            assert_relative_eq!(dot(&fp, &q), dot(&p, &aq), epsilon = 1e-14, max_relative = 1e-10);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify slice placement: total gets `v · Vmat`, groups get
    // `ratio * state`, everything else stays zero.
    //
    // Given
    // -----
    // - One mode equal to 0.1 everywhere; control [1.0].
    //
    // Expect
    // ------
    // - total slice = 0.1; P1_Chl = (0.1 / total_ref) * P1_Chl; N1p and z
    //   slices zero.
    fn forward_writes_total_and_group_slices() {
        let mut op = operator(Array2::from_elem((1, NZ), 0.1));
        let x = state();

        let out = op.forward(1, x.view(), array![1.0].view()).unwrap();

        for k in 0..NZ {
            assert_relative_eq!(out[8 + k], 0.1);
            assert_relative_eq!(out[k], 0.1 / x[8 + k] * x[k], max_relative = 1e-12);
            assert_relative_eq!(out[4 + k], 0.1 / x[8 + k] * x[4 + k], max_relative = 1e-12);
            assert_eq!(out[12 + k], 0.0);
            assert_eq!(out[16 + k], 0.0);
        }
        assert_eq!(op.group_names().collect::<Vec<_>>(), vec!["P1_Chl", "P2_Chl"]);
    }

    #[test]
    // Purpose
    // -------
    // Ensure the ratio floor stops a group from flipping sign.
    //
    // Given
    // -----
    // - Mode -1 everywhere; control [5.0] so every ratio is far below -0.99.
    //
    // Expect
    // ------
    // - Every group perturbation equals -0.99 * value, i.e. the perturbed
    //   group keeps 1% of its value.
    fn forward_floors_ratio() {
        let mut op = operator(Array2::from_elem((1, NZ), -1.0));
        let x = state();

        let out = op.forward(1, x.view(), array![5.0].view()).unwrap();

        for k in 0..2 * NZ {
            assert_relative_eq!(out[k], -0.99 * x[k], max_relative = 1e-12);
            assert!(x[k] + out[k] >= 0.01 * x[k] - 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the total reference captured at iteration 1 is reused for later
    // iterations even when the state changes.
    //
    // Given
    // -----
    // - Iteration 1 on `x`, iteration 2 on `x` with total doubled.
    //
    // Expect
    // ------
    // - Group outputs of iteration 2 equal those of iteration 1.
    fn forward_reuses_iteration_one_snapshot() {
        let mut op = operator(Array2::from_elem((1, NZ), 0.1));
        let x = state();
        let mut moved = x.clone();
        moved.slice_mut(s![8..12]).mapv_inplace(|v| 2.0 * v);

        let first = op.forward(1, x.view(), array![1.0].view()).unwrap();
        let second = op.forward(2, moved.view(), array![1.0].view()).unwrap();

        assert_eq!(first.slice(s![0..8]), second.slice(s![0..8]));
        assert_eq!(op.total_reference().unwrap().to_vec(), vec![1.0, 0.8, 0.5, 0.2]);
    }

    #[test]
    // Purpose
    // -------
    // Ensure call-order violations are usage errors.
    //
    // Given
    // -----
    // - (a) adjoint right after `begin_cycle`; (b) forward at iteration 2
    //   before any iteration 1; (c) iteration 0; (d) no `begin_cycle` at all.
    //
    // Expect
    // ------
    // - (a)/(b) `MinimizationNotStarted`, (c) `InvalidIteration`,
    //   (d) `BasisNotReady`; all classified as `ErrorKind::Usage`.
    fn call_order_violations_are_usage_errors() {
        let mut op = operator(Array2::from_elem((1, NZ), 0.1));
        let x = state();
        let q = Array1::<f64>::zeros(5 * NZ);
        let p = array![1.0];

        let a = op.adjoint(1, x.view(), q.view()).unwrap_err();
        let b = op.forward(2, x.view(), p.view()).unwrap_err();
        let c = op.forward(0, x.view(), p.view()).unwrap_err();

        let mut fresh = CovarianceOperator::new(
            &catalog(),
            options(1),
            FixedLoader { modes: Array2::from_elem((1, NZ), 0.1), calls: 0 },
        )
        .unwrap();
        let d = fresh.forward(1, x.view(), p.view()).unwrap_err();

        assert_eq!(a, AssimError::MinimizationNotStarted { iteration: 1 });
        assert_eq!(b, AssimError::MinimizationNotStarted { iteration: 2 });
        assert_eq!(c, AssimError::InvalidIteration { iteration: 0 });
        assert_eq!(d, AssimError::BasisNotReady);
        for err in [a, b, c, d] {
            assert_eq!(err.kind(), crate::errors::ErrorKind::Usage);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify `begin_cycle` reloads only on month changes and always starts a
    // new minimization.
    //
    // Given
    // -----
    // - Cycles in months 3, 3, 4, 4 with a forward call in between.
    //
    // Expect
    // ------
    // - Two loader calls in total; the snapshot is dropped at every cycle.
    fn begin_cycle_reloads_on_month_change_only() {
        let mut op = operator(Array2::from_elem((1, NZ), 0.1));
        let x = state();

        op.forward(1, x.view(), array![1.0].view()).unwrap();
        assert!(!op.begin_cycle(time(3), x.view()).unwrap());
        assert!(op.total_reference().is_none());
        assert!(op.begin_cycle(time(4), x.view()).unwrap());
        assert!(!op.begin_cycle(time(4), x.view()).unwrap());

        assert_eq!(op.loader().calls, 2);
        assert_eq!(op.cache().key(), Some(MonthKey::new(4).unwrap()));
    }

    #[test]
    // Purpose
    // -------
    // Ensure mis-sized inputs and inconsistent roles are rejected.
    //
    // Given
    // -----
    // - A control of length 2 for dim_cvec 1; a state of length 3.
    // - A catalog whose total has 3 levels while z has 4.
    //
    // Expect
    // ------
    // - `ControlLengthMismatch`, `StateLengthMismatch`,
    //   `ProfileLengthMismatch`.
    fn rejects_mis_sized_inputs_and_roles() {
        let mut op = operator(Array2::from_elem((1, NZ), 0.1));
        let x = state();

        assert_eq!(
            op.forward(1, x.view(), array![1.0, 2.0].view()).unwrap_err(),
            AssimError::ControlLengthMismatch { expected: 1, actual: 2 }
        );
        assert_eq!(
            op.forward(1, array![1.0, 2.0, 3.0].view(), array![1.0].view()).unwrap_err(),
            AssimError::StateLengthMismatch { expected: 20, actual: 3 }
        );

        let bad = VariableCatalog::new(
            vec![VariableEntry::new("total_chlorophyll", 0, 3), VariableEntry::new("z", 3, 4)],
            7,
        )
        .unwrap()
        .retain(&["total_chlorophyll", "z"])
        .unwrap();
        let err = CovarianceOperator::new(
            &bad,
            options(1),
            FixedLoader { modes: Array2::from_elem((1, NZ), 0.1), calls: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, AssimError::ProfileLengthMismatch { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Verify option validation of the ratio floor and control dimension.
    //
    // Given
    // -----
    // - ratio_floor = -1.0 and dim_cvec = 0.
    //
    // Expect
    // ------
    // - `InvalidThreshold` and `InvalidOption`.
    fn options_validate_knobs() {
        let floor = CvtOptions { ratio_floor: -1.0, ..CvtOptions::default() };
        let dim = CvtOptions { dim_cvec: 0, ..CvtOptions::default() };

        assert!(matches!(floor.validate(), Err(AssimError::InvalidThreshold { .. })));
        assert!(matches!(dim.validate(), Err(AssimError::InvalidOption { name: "dim_cvec", .. })));
        assert_eq!(CvtOptions::new("total_chlorophyll"), CvtOptions::default());
    }
}
