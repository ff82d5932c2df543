//! spread — post-analysis ensemble constraints.
//!
//! Purpose
//! -------
//! Host the clipping, spread-inflation and positivity rules applied to an
//! analysed ensemble before it is handed back to the model.
//!
//! Key behaviors
//! -------------
//! - [`SpreadController`] binds controlled and positivity-constrained
//!   variables of a retained catalog and runs the full pass.
//! - [`SpreadOptions`] carries every threshold, validated at construction.
//! - [`stats`] provides the member-axis reductions used by the controller.
//!
//! Invariants & assumptions
//! ------------------------
//! - Statistics are computed over the whole ensemble axis before any member
//!   is written (read-all-then-write-all).
//! - Zero spread is a numeric-domain warning, never an error.
//!
//! Downstream usage
//! ----------------
//! - `EnsemblePlugin::after_analysis` runs the controller after the inverse
//!   log transform.

pub mod controller;
pub mod options;
pub mod stats;

pub use self::controller::{
    ClipOutcome, InflationOutcome, SpreadController, SpreadReport, VariableSpreadReport,
    clip_last_level, enforce_positivity, inflate_profile,
};
pub use self::options::SpreadOptions;
