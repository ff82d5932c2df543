//! config — validated assimilation settings and named presets.
//!
//! Purpose
//! -------
//! Select, at startup, one explicit configuration of variable roles and
//! thresholds instead of toggling module-level lists.
//!
//! Key behaviors
//! -------------
//! - [`AssimConfig`] bundles selection, transform, spread and covariance
//!   options and validates them together.
//! - [`Preset`] names the reference setups and parses from strings.
//!
//! Downstream usage
//! ----------------
//! - `EnsemblePlugin::new` and `VariationalPlugin::new` take an
//!   `AssimConfig`; Python callers pick a preset by name.

pub mod options;
pub mod preset;

pub use self::options::{AssimConfig, EofResources, ResolvedRoles, Selection};
pub use self::preset::Preset;
