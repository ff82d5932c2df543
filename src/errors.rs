//! Errors for the assimilation core (catalog and buffer validation, option
//! checks, resource loading, and call-order violations).
//!
//! This module defines the crate-wide error type, [`AssimError`], together
//! with its coarse classification [`ErrorKind`]. Every fallible operation in
//! the crate returns [`AssimResult`]; numeric-domain problems that can be
//! recovered locally (non-positive log input, zero ensemble spread) are *not*
//! errors and are reported through the `log` facade instead.
//!
//! ## Conventions
//! - **Offsets are 0-based** positions in the flat state vector.
//! - Configuration errors are fatal for the cycle and are surfaced to the
//!   caller immediately; nothing in the crate retries.
//! - Usage errors indicate an integration bug in the caller (e.g. calling the
//!   adjoint before the first forward transform of a minimization).
//! - Resource parsing failures from [`EofError`] are normalized to
//!   [`AssimError::MalformedResource`] with a human-readable reason.
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::covariance::errors::EofError;

/// Crate-wide result alias for operations that may produce [`AssimError`].
pub type AssimResult<T> = Result<T, AssimError>;

/// Coarse classification of an [`AssimError`].
///
/// - `Configuration`: bad inputs, options or resources. Fatal for the cycle.
/// - `Usage`: the caller violated the required call order. Fatal, since it
///   points at a bug in the host rather than in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Usage,
}

/// Unified error type for the assimilation core.
#[derive(Debug, Clone, PartialEq)]
pub enum AssimError {
    // ---- Catalog ----
    /// A catalog entry has an empty name.
    EmptyVariableName,

    /// A catalog entry covers zero state elements.
    ZeroLengthVariable { name: String },

    /// A catalog entry reaches past the end of the state vector.
    VariableOutOfBounds { name: String, start: usize, length: usize, state_len: usize },

    /// Two catalog entries share at least one state offset.
    OverlappingVariables { first: String, second: String },

    /// The same name was registered twice.
    DuplicateVariable { name: String },

    /// A required variable is absent from the catalog.
    MissingVariable { name: String },

    /// A selection pattern matched no variable.
    UnmatchedPattern { pattern: String },

    /// A selection pattern could not be compiled.
    InvalidPattern { pattern: String, reason: String },

    // ---- Buffers ----
    /// The state buffer does not have the catalog's state length.
    StateLengthMismatch { expected: usize, actual: usize },

    /// The state buffer holds no ensemble member.
    EmptyEnsemble,

    /// The ensemble does not have the announced number of members.
    InvalidEnsembleSize { expected: usize, actual: usize },

    /// `iobs`, `obs` and `obs_sds` must have equal lengths.
    ObservationLengthMismatch { iobs: usize, obs: usize, obs_sds: usize },

    /// The control vector does not have length `dim_cvec`.
    ControlLengthMismatch { expected: usize, actual: usize },

    /// A variable's profile length differs from the vertical level count.
    ProfileLengthMismatch { name: String, expected: usize, actual: usize },

    /// A state value is NaN/±inf.
    NonFiniteState { name: String, member: usize, offset: usize, value: f64 },

    // ---- Options ----
    /// A threshold or scale factor is non-finite or out of range.
    InvalidThreshold { name: &'static str, value: f64, reason: &'static str },

    /// A structural option (dimension, variable role) is unusable.
    InvalidOption { name: &'static str, reason: String },

    /// No preset with this name exists.
    UnknownPreset { name: String },

    // ---- Resources ----
    /// An EOF or depth table could not be read or parsed.
    MalformedResource { reason: String },

    // ---- Usage ----
    /// Forward/adjoint called before the iteration-1 snapshot.
    MinimizationNotStarted { iteration: i32 },

    /// Iteration counters start at 1.
    InvalidIteration { iteration: i32 },

    /// The vertical basis has not been built for the current month yet.
    BasisNotReady,

    /// A plugin method ran before `initialize`.
    PluginNotInitialized,
}

impl AssimError {
    /// Classify the error as a configuration or a usage problem.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssimError::MinimizationNotStarted { .. }
            | AssimError::InvalidIteration { .. }
            | AssimError::BasisNotReady
            | AssimError::PluginNotInitialized => ErrorKind::Usage,
            _ => ErrorKind::Configuration,
        }
    }
}

impl std::error::Error for AssimError {}

impl std::fmt::Display for AssimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Catalog ----
            AssimError::EmptyVariableName => {
                write!(f, "Variable names must be non-empty.")
            }
            AssimError::ZeroLengthVariable { name } => {
                write!(f, "Variable '{name}' must cover at least one state element.")
            }
            AssimError::VariableOutOfBounds { name, start, length, state_len } => {
                write!(
                    f,
                    "Variable '{name}' spans [{start}, {}) beyond state length {state_len}.",
                    start + length
                )
            }
            AssimError::OverlappingVariables { first, second } => {
                write!(f, "Variables '{first}' and '{second}' overlap in the state vector.")
            }
            AssimError::DuplicateVariable { name } => {
                write!(f, "Variable '{name}' is registered more than once.")
            }
            AssimError::MissingVariable { name } => {
                write!(f, "Required variable '{name}' is not available.")
            }
            AssimError::UnmatchedPattern { pattern } => {
                write!(f, "Selection pattern '{pattern}' matches no variable.")
            }
            AssimError::InvalidPattern { pattern, reason } => {
                write!(f, "Selection pattern '{pattern}' is invalid: {reason}")
            }
            // ---- Buffers ----
            AssimError::StateLengthMismatch { expected, actual } => {
                write!(f, "State length mismatch: expected {expected}, got {actual}")
            }
            AssimError::EmptyEnsemble => {
                write!(f, "State buffer must hold at least one ensemble member.")
            }
            AssimError::InvalidEnsembleSize { expected, actual } => {
                write!(f, "Ensemble size mismatch: expected {expected} members, got {actual}")
            }
            AssimError::ObservationLengthMismatch { iobs, obs, obs_sds } => {
                write!(
                    f,
                    "Observation arrays must have equal lengths; got iobs={iobs}, obs={obs}, obs_sds={obs_sds}"
                )
            }
            AssimError::ControlLengthMismatch { expected, actual } => {
                write!(f, "Control vector length mismatch: expected {expected}, got {actual}")
            }
            AssimError::ProfileLengthMismatch { name, expected, actual } => {
                write!(
                    f,
                    "Variable '{name}' must have one value per vertical level: expected {expected}, got {actual}"
                )
            }
            AssimError::NonFiniteState { name, member, offset, value } => {
                write!(f, "Variable '{name}' of member {member} is non-finite at offset {offset}: {value}")
            }
            // ---- Options ----
            AssimError::InvalidThreshold { name, value, reason } => {
                write!(f, "Invalid {name}: {value}. {reason}")
            }
            AssimError::InvalidOption { name, reason } => {
                write!(f, "Invalid option '{name}': {reason}")
            }
            AssimError::UnknownPreset { name } => {
                write!(f, "Unknown configuration preset '{name}'.")
            }
            // ---- Resources ----
            AssimError::MalformedResource { reason } => {
                write!(f, "Malformed resource: {reason}")
            }
            // ---- Usage ----
            AssimError::MinimizationNotStarted { iteration } => {
                write!(
                    f,
                    "Covariance transform called at iteration {iteration} before the iteration-1 reference snapshot."
                )
            }
            AssimError::InvalidIteration { iteration } => {
                write!(f, "Iteration counters start at 1; got {iteration}.")
            }
            AssimError::BasisNotReady => {
                write!(f, "Vertical basis has not been prepared for the current month.")
            }
            AssimError::PluginNotInitialized => {
                write!(f, "Plugin used before initialize().")
            }
        }
    }
}

impl From<EofError> for AssimError {
    fn from(err: EofError) -> AssimError {
        AssimError::MalformedResource { reason: err.to_string() }
    }
}

/// Convert an [`AssimError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<AssimError> for PyErr {
    fn from(err: AssimError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
