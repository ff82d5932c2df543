//! Errors raised while reading EOF and depth resources.
//!
//! `EofError` keeps the path and, where it helps, the line of the offending
//! table so the message points the operator straight at the bad file. At the
//! crate boundary it converts into `AssimError::MalformedResource`.

/// Resource parsing and shape errors for the vertical basis.
#[derive(Debug, Clone, PartialEq)]
pub enum EofError {
    // ---- I/O ----
    /// The file could not be opened or read.
    Io { path: String, message: String },

    // ---- Parsing ----
    /// The file contains no numeric row.
    EmptyTable { path: String },

    /// A token is not a floating-point number.
    Parse { path: String, line: usize, token: String },

    /// Rows have different numbers of columns.
    Ragged { path: String, line: usize, expected: usize, actual: usize },

    /// A value in the table is NaN/±inf.
    NonFiniteValue { path: String, line: usize },

    // ---- Shape ----
    /// The depth table is not strictly monotone.
    NonMonotoneDepth { path: String, index: usize },

    /// The EOF table has fewer modes than the control dimension.
    TooFewModes { path: String, required: usize, available: usize },

    /// EOF profiles and the depth table disagree on the level count.
    DepthMismatch { path: String, depth_levels: usize, eof_levels: usize },
}

pub type EofResult<T> = Result<T, EofError>;

impl std::error::Error for EofError {}

impl std::fmt::Display for EofError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- I/O ----
            EofError::Io { path, message } => {
                write!(f, "EOF Error: cannot read '{path}': {message}")
            }

            // ---- Parsing ----
            EofError::EmptyTable { path } => {
                write!(f, "EOF Error: '{path}' contains no numeric rows")
            }
            EofError::Parse { path, line, token } => {
                write!(f, "EOF Error: '{path}' line {line}: '{token}' is not a number")
            }
            EofError::Ragged { path, line, expected, actual } => write!(
                f,
                "EOF Error: '{path}' line {line} has {actual} columns, expected {expected}"
            ),
            EofError::NonFiniteValue { path, line } => {
                write!(f, "EOF Error: '{path}' line {line} contains a non-finite value")
            }

            // ---- Shape ----
            EofError::NonMonotoneDepth { path, index } => write!(
                f,
                "EOF Error: depth table '{path}' is not strictly monotone at index {index}"
            ),
            EofError::TooFewModes { path, required, available } => write!(
                f,
                "EOF Error: '{path}' holds {available} modes but the control dimension is {required}"
            ),
            EofError::DepthMismatch { path, depth_levels, eof_levels } => write!(
                f,
                "EOF Error: '{path}' has {eof_levels} levels but the depth table has {depth_levels}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Ensure messages name the offending file and location.
    //
    // Given
    // -----
    // - A `Parse` error at line 3 of "eof.04.txt".
    //
    // Expect
    // ------
    // - The message contains the path, the line and the token.
    fn display_names_path_and_line() {
        let err = EofError::Parse { path: "eof.04.txt".into(), line: 3, token: "abc".into() };

        let msg = err.to_string();

        assert!(msg.contains("eof.04.txt"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("'abc'"));
    }
}
