//! Integration tests for full assimilation cycles.
//!
//! Purpose
//! -------
//! - Drive both plugins through the host protocol (`initialize`, then
//!   `before_analysis` / `after_analysis`, and `cvt` / `cvt_adj` for the
//!   variational side) the way a filter would over several cycles.
//! - Exercise the on-disk EOF resources end to end, including the monthly
//!   basis reload.
//!
//! Coverage
//! --------
//! - `plugins::EnsemblePlugin` with the parameter-sum preset: selection,
//!   clipping, inflation and the positivity floor on a 4-member ensemble.
//! - `plugins::VariationalPlugin` with `TextEofLoader` over temporary files:
//!   month changes, the iteration-1 snapshot, and the adjoint identity.
//!
//! Exclusions
//! ----------
//! - Fine-grained behavior of individual stages (thresholds, clamps, log
//!   edge cases, table parsing); those are covered by unit tests.
//! - The Python bindings.
use std::{fs, path::Path};

use approx::assert_relative_eq;
use bgc_assim::{
    config::{AssimConfig, Preset},
    covariance::TextEofLoader,
    errors::AssimError,
    plugins::{AssimilationPlugin, CvtHandler, EnsemblePlugin, VariationalPlugin},
    spread::{ClipOutcome, InflationOutcome},
    state::{VariableCatalog, VariableEntry},
};
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{Array1, Array2, array, s};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Noon on the given day of 2019.
fn at(month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, month, day).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

/// Purpose
/// -------
/// Host catalog of the parameter-sum setup plus one unrelated variable.
///
/// Layout: five 2-level P1 state variables, a 1-level `sum` parameter, and
/// a 2-level temperature; D = 13.
fn parameter_host() -> VariableCatalog {
    let mut entries: Vec<VariableEntry> = ["P1_Chl", "P1_c", "P1_p", "P1_n", "P1_s"]
        .iter()
        .enumerate()
        .map(|(i, name)| VariableEntry::new(*name, 2 * i, 2))
        .collect();
    entries.push(VariableEntry::new("instances_P1_parameters_sum", 10, 1));
    entries.push(VariableEntry::new("votemper", 11, 2));
    VariableCatalog::new(entries, 13).unwrap()
}

/// Purpose
/// -------
/// Write the depth table and two monthly EOF tables into `dir`.
///
/// Layout
/// ------
/// - `z.txt`: 3 depths, positive down (0, 10, 20 m), one per line.
/// - `eof.03.txt` / `eof.04.txt`: 2 modes × 3 levels, distinct per month.
///
/// Returns the EOF prefix to configure.
fn write_eof_resources(dir: &Path) -> String {
    fs::write(dir.join("z.txt"), "# depth [m]\n0.0\n10.0\n20.0\n").unwrap();
    fs::write(dir.join("eof.03.txt"), "0.5 0.25 0.0\n0.0 0.5 0.25\n").unwrap();
    fs::write(dir.join("eof.04.txt"), "1.0 0.5 0.25\n\n0.25 0.0 -0.5\n").unwrap();
    format!("{}/eof.", dir.display())
}

/// Purpose
/// -------
/// Host catalog of the 3D-Var setup: two chlorophyll groups, the total, a
/// temperature field the selection drops, and the depth coordinate. Every
/// profile has 3 levels; D = 15.
fn variational_host() -> VariableCatalog {
    VariableCatalog::new(
        vec![
            VariableEntry::new("P1_Chl", 0, 3),
            VariableEntry::new("P2_Chl", 3, 3),
            VariableEntry::new("total_chlorophyll", 6, 3),
            VariableEntry::new("votemper", 9, 3),
            VariableEntry::new("z", 12, 3),
        ],
        15,
    )
    .unwrap()
}

/// A single-member analysis state for `variational_host`.
fn variational_state() -> Array1<f64> {
    array![
        0.2, 0.1, 0.05, // P1_Chl
        0.3, 0.2, 0.1, // P2_Chl
        0.5, 0.3, 0.15, // total_chlorophyll
        15.0, 14.0, 13.0, // votemper
        -2.0, -10.0, -18.0, // z
    ]
}

#[test]
// Purpose
// -------
// Run two ensemble cycles of the parameter-sum setup and check that the
// analysed parameter is brought back above the lower threshold with its
// spread re-inflated, while negative state values are floored.
//
// Given
// -----
// - `parameter_host()` with 4 members; the preset retains the P1 state and
//   the `sum` parameter and drops `votemper`.
// - After the first analysis the parameter reads [0.05, 0.06, 0.04, 0.05]
//   and one P1_Chl value is negative.
// - The second analysis leaves the parameter at [0.125, 0.375, 0.25, 0.25]
//   (mean 0.25, enough spread).
//
// Expect
// ------
// - Retained names exclude `votemper`.
// - Cycle 1: clip raises the mean to 0.1, inflation brings the mean absolute
//   deviation to 0.15 * 0.1 with the mean preserved, one value is floored.
// - Cycle 2: the compliant parameter is left untouched and nothing is
//   floored.
fn ensemble_cycles_keep_parameter_in_range() {
    let mut plugin = EnsemblePlugin::new(Preset::ParameterSum.config());
    let retained = plugin.initialize(&parameter_host(), 4).unwrap();
    assert_eq!(retained.len(), 6);
    assert!(!retained.iter().any(|n| n == "votemper"));

    let mut ensemble = Array2::<f64>::from_elem((4, 13), 0.5);
    plugin.before_analysis(at(3, 1), ensemble.view_mut(), None).unwrap();

    ensemble.column_mut(10).assign(&array![0.05, 0.06, 0.04, 0.05]);
    ensemble[[2, 1]] = -0.02;
    let report = plugin.after_analysis(ensemble.view_mut()).unwrap();

    let spread = report.spread.unwrap();
    let sum = &spread.controlled[0];
    assert_eq!(sum.name, "instances_P1_parameters_sum");
    assert!(matches!(sum.clip, ClipOutcome::Raised { clamped: 0, .. }));
    assert!(matches!(sum.inflation, InflationOutcome::Inflated { levels: 1, .. }));
    let param = ensemble.column(10).to_owned();
    let mean = param.mean().unwrap();
    let mad = param.iter().map(|x| (x - mean).abs()).sum::<f64>() / 4.0;
    assert_relative_eq!(mean, 0.1, max_relative = 1e-12);
    assert_relative_eq!(mad, 0.015, max_relative = 1e-9);
    assert_eq!(spread.total_floored(), 1);
    assert_eq!(ensemble[[2, 1]], 1e-8);
    assert!(ensemble.column(11).iter().all(|&x| x == 0.5));

    plugin.before_analysis(at(3, 2), ensemble.view_mut(), None).unwrap();
    ensemble.column_mut(10).assign(&array![0.125, 0.375, 0.25, 0.25]);
    let second = plugin.after_analysis(ensemble.view_mut()).unwrap().spread.unwrap();

    assert_eq!(second.controlled[0].clip, ClipOutcome::Unchanged);
    assert_eq!(second.controlled[0].inflation, InflationOutcome::NotNeeded);
    assert_eq!(ensemble.column(10).to_vec(), vec![0.125, 0.375, 0.25, 0.25]);
    assert_eq!(second.total_floored(), 0);
}

#[test]
// Purpose
// -------
// Run the 3D-Var setup over a month boundary with EOF tables read from disk
// and verify the covariance transform at every step of each minimization.
//
// Given
// -----
// - `write_eof_resources` in a temporary directory; `dim_cvec = 2`.
// - Cycles on Mar 20, Mar 31, Apr 1; each runs `cvt(1)`, `cvt(2)` and
//   `cvt_adj(3)` with random control vectors and perturbations.
//
// Expect
// ------
// - Basis reloads on [true, false, true].
// - The forward output is zero on `votemper` and `z`.
// - Group slices equal `max(vertical / total_ref, -0.99) * state[g]`, with
//   `total_ref` captured at iteration 1 even when `state` changes after it.
// - `<cvt(v), q> == <v, cvt_adj(q)>` whenever the ratio floor is inactive.
fn variational_cycles_follow_monthly_basis() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Preset::Ogs3dVar.config();
    config.eof.prefix = write_eof_resources(dir.path());
    config.eof.depth_file = dir.path().join("z.txt");
    config.cvt.dim_cvec = 2;
    let mut plugin = VariationalPlugin::new(config).unwrap();

    let retained = plugin.initialize(&variational_host(), 1).unwrap();
    assert_eq!(retained, vec!["P1_Chl", "P2_Chl", "total_chlorophyll", "z"]);

    let mut rng = StdRng::seed_from_u64(20190320);
    let mut reloads = Vec::new();
    for time in [at(3, 20), at(3, 31), at(4, 1)] {
        let mut ensemble = variational_state().insert_axis(ndarray::Axis(0));
        reloads.push(plugin.before_analysis(time, ensemble.view_mut(), None).unwrap().basis_reloaded);
        let state = variational_state();

        let v1 = Array1::from_iter((0..2).map(|_| rng.gen_range(-0.05..0.05)));
        let dx1 = plugin.cvt(1, state.view(), v1.view()).unwrap();
        assert!(dx1.slice(s![9..15]).iter().all(|&x| x == 0.0));

        // Later iterations keep the iteration-1 reference.
        let mut moved = state.clone();
        moved.slice_mut(s![6..9]).mapv_inplace(|x| 2.0 * x);
        let v2 = Array1::from_iter((0..2).map(|_| rng.gen_range(-0.05..0.05)));
        let dx2 = plugin.cvt(2, moved.view(), v2.view()).unwrap();
        for k in 0..3 {
            let ratio = (dx2[6 + k] / state[6 + k]).max(-0.99);
            assert_relative_eq!(dx2[k], ratio * moved[k], max_relative = 1e-12);
            assert_relative_eq!(dx2[3 + k], ratio * moved[3 + k], max_relative = 1e-12);
        }

        let q = Array1::from_iter((0..15).map(|_| rng.gen_range(-1.0..1.0)));
        let adj = plugin.cvt_adj(3, state.view(), q.view()).unwrap();
        let lhs = dx1.dot(&q);
        let rhs = v1.dot(&adj);
        assert_relative_eq!(lhs, rhs, epsilon = 1e-14, max_relative = 1e-10);
    }

    assert_eq!(reloads, vec![true, false, true]);
}

#[test]
// Purpose
// -------
// Ensure resource and configuration problems surface as errors at the
// point the host would hit them.
//
// Given
// -----
// - A missing depth file; a month whose EOF table is missing; a keep-list
//   naming a variable the host does not have.
//
// Expect
// ------
// - `MalformedResource` at plugin construction and at `before_analysis`;
//   `MissingVariable` at `initialize`.
fn resource_and_selection_errors_surface() {
    let dir = tempfile::tempdir().unwrap();

    let mut missing_depth = Preset::Ogs3dVar.config();
    missing_depth.eof.depth_file = dir.path().join("absent.txt");
    assert!(matches!(
        VariationalPlugin::new(missing_depth),
        Err(AssimError::MalformedResource { .. })
    ));

    let prefix = write_eof_resources(dir.path());
    let loader = TextEofLoader::new(prefix, dir.path().join("z.txt")).unwrap();
    let mut config = Preset::Ogs3dVar.config();
    config.cvt.dim_cvec = 2;
    let mut plugin = VariationalPlugin::with_loader(config, loader);
    plugin.initialize(&variational_host(), 1).unwrap();
    let mut ensemble = variational_state().insert_axis(ndarray::Axis(0));
    assert!(matches!(
        plugin.before_analysis(at(7, 1), ensemble.view_mut(), None),
        Err(AssimError::MalformedResource { .. })
    ));

    let mut ensemble_plugin = EnsemblePlugin::new(AssimConfig::new(
        bgc_assim::config::Selection::Names(vec!["P1_Chl".into(), "O2_o".into()]),
    ));
    assert_eq!(
        ensemble_plugin.initialize(&parameter_host(), 2).unwrap_err(),
        AssimError::MissingVariable { name: "O2_o".to_string() }
    );
}
