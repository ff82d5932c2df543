//! covariance — parameterized 3D-Var control-variable transform.
//!
//! Purpose
//! -------
//! Provide the forward/adjoint operator pair that maps a low-dimensional
//! control vector to full-state perturbations, together with the EOF
//! resources and the month-keyed vertical basis it is built on.
//!
//! Key behaviors
//! -------------
//! - [`eof`] reads depth and per-month EOF tables behind the [`EofLoader`]
//!   seam.
//! - [`basis`] interpolates EOF modes onto the model's depth grid and caches
//!   the result per calendar month.
//! - [`cvt`] hosts [`CovarianceOperator`] and its [`CvtOptions`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The basis and the total reference are the only state retained across
//!   calls, scoped to the current month and the current minimization.
//! - Calls are strictly sequential; the iteration-1 snapshot makes
//!   reordering incorrect.
//!
//! Downstream usage
//! ----------------
//! - `VariationalPlugin` calls `begin_cycle` from `before_analysis` and
//!   exposes `forward` / `adjoint` as its `cvt` / `cvt_adj`.
//!
//! Testing notes
//! -------------
//! - The inner-product adjoint test lives in [`cvt`]; resource parsing tests
//!   use temporary files.

pub mod basis;
pub mod cvt;
pub mod eof;
pub mod errors;

pub use self::basis::{BasisCache, MonthKey, VerticalBasis};
pub use self::cvt::{CovarianceOperator, CvtLayout, CvtOptions};
pub use self::eof::{EofLoader, EofTable, TextEofLoader};
pub use self::errors::EofError;
