//! EOF resources — per-month vertical modes and their depth coordinate.
//!
//! Purpose
//! -------
//! Read the whitespace-delimited numeric tables that describe the vertical
//! correlation structure: one depth table (`nz_eof` values, shared by every
//! month) and one EOF table per calendar month (`n_modes × nz_eof`).
//!
//! Key behaviors
//! -------------
//! - [`parse_table`] / [`read_table`] turn text into an `Array2<f64>`,
//!   skipping blank lines and `#` comments and rejecting ragged rows.
//! - [`EofLoader`] is the seam the basis cache loads through; the default
//!   implementation, [`TextEofLoader`], resolves `"{prefix}{month:02}.txt"`
//!   and reads the depth table once at construction.
//! - [`EofTable::new`] checks that the modes and the depth table agree on the
//!   level count and that depths are strictly monotone.
//!
//! Conventions
//! -----------
//! - Depth tables may be written as one column or one row; they are flattened
//!   in reading order.
//! - EOF rows are modes, columns are depth levels in the depth table's order.
use std::{fs, path::PathBuf};

use ndarray::{Array1, Array2, ArrayView1};

use crate::{
    covariance::errors::{EofError, EofResult},
    errors::AssimResult,
};

/// One month's EOF modes on their native depth grid.
#[derive(Debug, Clone, PartialEq)]
pub struct EofTable {
    depth: Array1<f64>,
    modes: Array2<f64>,
}

impl EofTable {
    /// Pair `modes` (`n_modes × nz_eof`) with their depth coordinate.
    ///
    /// Errors
    /// ------
    /// - `EofError::DepthMismatch` if `modes.ncols() != depth.len()`.
    /// - `EofError::NonMonotoneDepth` if depths are not strictly increasing
    ///   or strictly decreasing.
    pub fn new(path: &str, depth: Array1<f64>, modes: Array2<f64>) -> EofResult<Self> {
        if modes.ncols() != depth.len() {
            return Err(EofError::DepthMismatch {
                path: path.to_string(),
                depth_levels: depth.len(),
                eof_levels: modes.ncols(),
            });
        }
        check_monotone(path, depth.view())?;
        Ok(EofTable { depth, modes })
    }

    pub fn depth(&self) -> ArrayView1<'_, f64> {
        self.depth.view()
    }

    pub fn modes(&self) -> &Array2<f64> {
        &self.modes
    }

    pub fn n_modes(&self) -> usize {
        self.modes.nrows()
    }

    pub fn levels(&self) -> usize {
        self.depth.len()
    }
}

/// Source of per-month EOF tables.
pub trait EofLoader {
    /// Load the table for calendar `month` (1–12).
    fn load(&mut self, month: u32) -> AssimResult<EofTable>;
}

impl<L: EofLoader + ?Sized> EofLoader for Box<L> {
    fn load(&mut self, month: u32) -> AssimResult<EofTable> {
        (**self).load(month)
    }
}

/// Loads `"{prefix}{month:02}.txt"` from disk against a fixed depth table.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEofLoader {
    prefix: String,
    depth: Array1<f64>,
}

impl TextEofLoader {
    /// Read the depth table at `depth_path` and remember `prefix`.
    ///
    /// Errors
    /// ------
    /// - `AssimError::MalformedResource` if the depth table is unreadable,
    ///   empty, or not strictly monotone.
    pub fn new(prefix: impl Into<String>, depth_path: impl Into<PathBuf>) -> AssimResult<Self> {
        let depth_path = depth_path.into();
        let label = depth_path.display().to_string();
        log::info!("Reading z levels from file: {label}");
        let depth: Array1<f64> = read_table(&depth_path)?.iter().copied().collect();
        check_monotone(&label, depth.view())?;
        Ok(TextEofLoader { prefix: prefix.into(), depth })
    }

    /// Path of the EOF table for `month`.
    pub fn path_for(&self, month: u32) -> PathBuf {
        PathBuf::from(format!("{}{month:02}.txt", self.prefix))
    }

    pub fn depth(&self) -> ArrayView1<'_, f64> {
        self.depth.view()
    }
}

impl EofLoader for TextEofLoader {
    fn load(&mut self, month: u32) -> AssimResult<EofTable> {
        let path = self.path_for(month);
        let label = path.display().to_string();
        log::info!("Reading EOFs from file: {label}");
        let modes = read_table(&path)?;
        Ok(EofTable::new(&label, self.depth.clone(), modes)?)
    }
}

/// Read and parse a numeric table from `path`.
pub fn read_table(path: &std::path::Path) -> EofResult<Array2<f64>> {
    let label = path.display().to_string();
    let text = fs::read_to_string(path)
        .map_err(|e| EofError::Io { path: label.clone(), message: e.to_string() })?;
    parse_table(&label, &text)
}

/// Parse whitespace-delimited rows of floats.
///
/// Blank lines and lines starting with `#` are ignored; everything after a
/// `#` on a data line is a comment. Line numbers in errors are 1-based.
pub fn parse_table(path: &str, text: &str) -> EofResult<Array2<f64>> {
    let mut values = Vec::new();
    let mut ncols: Option<usize> = None;
    let mut nrows = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| EofError::Parse {
                    path: path.to_string(),
                    line: idx + 1,
                    token: token.to_string(),
                })
            })
            .collect::<EofResult<Vec<f64>>>()?;

        match ncols {
            None => ncols = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(EofError::Ragged {
                    path: path.to_string(),
                    line: idx + 1,
                    expected,
                    actual: row.len(),
                });
            }
            Some(_) => {}
        }
        if row.iter().any(|x| !x.is_finite()) {
            return Err(EofError::NonFiniteValue { path: path.to_string(), line: idx + 1 });
        }
        values.extend(row);
        nrows += 1;
    }

    let Some(ncols) = ncols else {
        return Err(EofError::EmptyTable { path: path.to_string() });
    };
    Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| EofError::Io { path: path.to_string(), message: e.to_string() })
}

fn check_monotone(path: &str, depth: ArrayView1<'_, f64>) -> EofResult<()> {
    if depth.is_empty() {
        return Err(EofError::EmptyTable { path: path.to_string() });
    }
    let increasing = depth.len() < 2 || depth[1] > depth[0];
    for i in 1..depth.len() {
        let ok = if increasing { depth[i] > depth[i - 1] } else { depth[i] < depth[i - 1] };
        if !ok {
            return Err(EofError::NonMonotoneDepth { path: path.to_string(), index: i });
        }
    }
    Ok(())
}
