//! State validation helpers — reusable checks for layouts, buffers and options.
//!
//! Purpose
//! -------
//! Centralize the small checks that every component performs at its API
//! boundary, so constructors can fail fast with structured errors and the hot
//! paths can assume well-formed inputs.
//!
//! Key behaviors
//! -------------
//! - Validate catalog layouts (names, lengths, bounds, uniqueness, overlap).
//! - Validate buffer shapes against a catalog (state length, member count,
//!   observation array lengths).
//! - Reject repeated names in role lists.
//! - Validate scalar thresholds and compile shell-style selection patterns.
//!
//! Conventions
//! -----------
//! - Every helper returns [`AssimResult`] and never panics on invalid inputs.
//! - This module performs no I/O and no logging.
use regex::Regex;

use crate::{
    errors::{AssimError, AssimResult},
    state::catalog::VariableEntry,
};

/// Validate a catalog layout against the state length.
///
/// Errors
/// ------
/// - `AssimError::EmptyVariableName` if a name is empty.
/// - `AssimError::ZeroLengthVariable` if an entry covers no element.
/// - `AssimError::VariableOutOfBounds` if `start + length > state_len`.
/// - `AssimError::DuplicateVariable` if a name appears twice.
/// - `AssimError::OverlappingVariables` for the first overlapping pair in
///   start order, lower start first.
pub fn validate_entries(entries: &[VariableEntry], state_len: usize) -> AssimResult<()> {
    for (i, entry) in entries.iter().enumerate() {
        if entry.name.is_empty() {
            return Err(AssimError::EmptyVariableName);
        }
        if entry.length == 0 {
            return Err(AssimError::ZeroLengthVariable { name: entry.name.clone() });
        }
        if entry.start.checked_add(entry.length).map_or(true, |stop| stop > state_len) {
            return Err(AssimError::VariableOutOfBounds {
                name: entry.name.clone(),
                start: entry.start,
                length: entry.length,
                state_len,
            });
        }
        if entries[..i].iter().any(|other| other.name == entry.name) {
            return Err(AssimError::DuplicateVariable { name: entry.name.clone() });
        }
    }

    let mut by_start: Vec<&VariableEntry> = entries.iter().collect();
    by_start.sort_by_key(|entry| entry.start);
    for pair in by_start.windows(2) {
        if pair[0].stop() > pair[1].start {
            return Err(AssimError::OverlappingVariables {
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }
    Ok(())
}

/// Validate that a buffer row has the catalog's state length.
pub fn validate_state_len(expected: usize, actual: usize) -> AssimResult<()> {
    if expected != actual {
        return Err(AssimError::StateLengthMismatch { expected, actual });
    }
    Ok(())
}

/// Validate the member count of an ensemble buffer.
///
/// `expected = None` only requires at least one member.
pub fn validate_members(expected: Option<usize>, actual: usize) -> AssimResult<()> {
    if actual == 0 {
        return Err(AssimError::EmptyEnsemble);
    }
    match expected {
        Some(expected) if expected != actual => {
            Err(AssimError::InvalidEnsembleSize { expected, actual })
        }
        _ => Ok(()),
    }
}

/// Validate that the three observation arrays are parallel.
pub fn validate_observation_lengths(iobs: usize, obs: usize, obs_sds: usize) -> AssimResult<()> {
    if iobs != obs || obs != obs_sds {
        return Err(AssimError::ObservationLengthMismatch { iobs, obs, obs_sds });
    }
    Ok(())
}

/// Validate a strictly positive, finite threshold.
pub fn validate_positive(name: &'static str, value: f64) -> AssimResult<f64> {
    if !value.is_finite() {
        return Err(AssimError::InvalidThreshold { name, value, reason: "Must be finite." });
    }
    if value <= 0.0 {
        return Err(AssimError::InvalidThreshold {
            name,
            value,
            reason: "Must be strictly positive.",
        });
    }
    Ok(value)
}

/// Validate a finite value inside the open interval `(low, high)`.
pub fn validate_open_interval(
    name: &'static str, value: f64, low: f64, high: f64, reason: &'static str,
) -> AssimResult<f64> {
    if !value.is_finite() || value <= low || value >= high {
        return Err(AssimError::InvalidThreshold { name, value, reason });
    }
    Ok(value)
}

/// Reject a role list that names the same variable twice.
///
/// Errors
/// ------
/// - `AssimError::InvalidOption` naming `role` and the repeated variable.
pub fn validate_unique_names<S: AsRef<str>>(role: &'static str, names: &[S]) -> AssimResult<()> {
    for (i, name) in names.iter().enumerate() {
        let name = name.as_ref();
        if names[..i].iter().any(|prior| prior.as_ref() == name) {
            return Err(AssimError::InvalidOption {
                name: role,
                reason: format!("'{name}' is listed more than once."),
            });
        }
    }
    Ok(())
}

/// Compile a shell-style pattern (`*` = any run, `?` = one character) into an
/// anchored regular expression. All other characters match literally.
pub fn compile_pattern(pattern: &str) -> AssimResult<Regex> {
    let body = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    Regex::new(&format!("^{body}$")).map_err(|err| AssimError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}
