//! state — variable catalog, typed state views, and observation batches.
//!
//! Purpose
//! -------
//! Provide the bookkeeping every other component relies on: which variables
//! live where in the flat state vector, bounds-checked views onto the
//! caller's ensemble buffer, and the parallel observation arrays of a cycle.
//!
//! Key behaviors
//! -------------
//! - [`VariableCatalog`] validates the host's layout once; [`RetainedCatalog`]
//!   is the immutable subset selected by name or pattern.
//! - [`StateView`] slices an `(M, D)` buffer per variable without copying.
//! - [`ObservationBatch`] couples `iobs`, `obs` and `obs_sds` and selects the
//!   observations that map into a variable's range.
//!
//! Invariants & assumptions
//! ------------------------
//! - Catalog entries never overlap and never reach past the state length.
//! - Buffers are owned by the caller for the duration of a cycle; nothing in
//!   this module retains or resizes them.
//!
//! Conventions
//! -----------
//! - Offsets are 0-based; ranges are half-open `[start, start + length)`.
//! - Validation helpers live in [`validation`] and return `AssimResult`.
//!
//! Downstream usage
//! ----------------
//! - Plugins build a `VariableCatalog` at initialization, retain the working
//!   set, and wrap each cycle's buffers in a `StateView` / `ObservationBatch`
//!   before handing them to the transform, spread and covariance components.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its validation and slicing rules;
//!   end-to-end cycles are exercised in the integration tests.

pub mod catalog;
pub mod observations;
pub mod validation;
pub mod view;

pub use self::catalog::{RetainedCatalog, VariableCatalog, VariableEntry};
pub use self::observations::ObservationBatch;
pub use self::view::StateView;
