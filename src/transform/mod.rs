//! transform — reversible variable transforms around the analysis step.
//!
//! Purpose
//! -------
//! Host the log-space stage applied to selected state variables (and their
//! observations) before the analysis and undone after it.
//!
//! Key behaviors
//! -------------
//! - [`TransformStage`] owns the list of transformed variables and applies
//!   log10 / `10^y` in place on a [`StateView`](crate::state::StateView).
//! - [`TransformOptions`] selects whether observations follow the state and
//!   whether a positive floor is applied before the log.
//!
//! Invariants & assumptions
//! ------------------------
//! - Transforms are elementwise and invertible on their domain; the round
//!   trip is exact to floating-point precision for positive inputs.
//! - Log transform and spread control are independent: a variable may be
//!   subject to either, both, or neither.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`log_transform`] cover the round trip, observation
//!   masking and IEEE behaviour for non-positive inputs.

pub mod log_transform;

pub use self::log_transform::{TransformOptions, TransformReport, TransformStage};
