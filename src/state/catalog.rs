//! Variable catalog — named, non-overlapping slices of the flat state vector.
//!
//! Purpose
//! -------
//! Describe where each model variable lives inside the flat state vector
//! reported by the host, and turn the host's full variable set into the
//! retained subset the assimilation actually manipulates.
//!
//! Key behaviors
//! -------------
//! - [`VariableCatalog::new`] validates every entry once (non-empty name,
//!   positive length, in-bounds, unique, non-overlapping) so downstream views
//!   never re-check offsets.
//! - [`VariableCatalog::retain`] selects by exact name and fails on a name the
//!   host does not provide; [`VariableCatalog::retain_matching`] selects by
//!   shell-style patterns (`*`, `?`).
//! - Both return a new immutable [`RetainedCatalog`]; the full catalog is
//!   never mutated, and the host consults the returned view to decide what to
//!   serialize/restore.
//!
//! Invariants & assumptions
//! ------------------------
//! - For any two entries `a != b`: `[a.start, a.stop())` and
//!   `[b.start, b.stop())` are disjoint, and `stop() <= state_len`.
//! - Entries keep the host's registration order. Every iteration over a
//!   catalog (including the covariance transform's group order) follows it.
//!
//! Conventions
//! -----------
//! - Offsets are 0-based positions within one ensemble member's state.
//! - The catalog carries no data; buffers are attached by
//!   [`StateView`](crate::state::view::StateView).
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction failures (overlap, bounds, duplicates),
//!   exact and pattern retention, and the missing-name error path.
use std::ops::Range;

use crate::{
    errors::{AssimError, AssimResult},
    state::validation::{compile_pattern, validate_entries},
};

/// One variable's slice of the state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: String,
    pub start: usize,
    pub length: usize,
}

impl VariableEntry {
    pub fn new(name: impl Into<String>, start: usize, length: usize) -> Self {
        VariableEntry { name: name.into(), start, length }
    }

    /// One past the last offset covered by the variable.
    #[inline]
    pub fn stop(&self) -> usize {
        self.start + self.length
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.stop()
    }

    /// Whether the state offset `offset` falls inside this variable.
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.stop()
    }
}

/// VariableCatalog — the host's full, validated variable set.
///
/// Purpose
/// -------
/// Hold every variable the host reports together with the state length `D`,
/// and produce retained subsets for the assimilation components.
///
/// Fields
/// ------
/// - `entries`: `Vec<VariableEntry>`
///   Entries in host registration order.
/// - `state_len`: `usize`
///   Length `D` of a single member's state vector.
///
/// Invariants
/// ----------
/// - Established by [`VariableCatalog::new`]; see the module docs.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableCatalog {
    entries: Vec<VariableEntry>,
    state_len: usize,
}

impl VariableCatalog {
    /// Build a catalog and validate its layout against `state_len`.
    ///
    /// Errors
    /// ------
    /// - `AssimError::EmptyVariableName`, `ZeroLengthVariable`,
    ///   `VariableOutOfBounds`, `DuplicateVariable`, `OverlappingVariables`
    ///   for the first offending entry.
    pub fn new(entries: Vec<VariableEntry>, state_len: usize) -> AssimResult<Self> {
        validate_entries(&entries, state_len)?;
        Ok(VariableCatalog { entries, state_len })
    }

    pub fn state_len(&self) -> usize {
        self.state_len
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VariableEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Keep exactly the variables named in `keep`.
    ///
    /// Parameters
    /// ----------
    /// - `keep`: names to retain. Order and repetitions are irrelevant; the
    ///   result follows the catalog's registration order.
    ///
    /// Returns
    /// -------
    /// `AssimResult<RetainedCatalog>` holding only the named entries.
    ///
    /// Errors
    /// ------
    /// - `AssimError::MissingVariable` naming the first `keep` entry the host
    ///   does not provide. Nothing is skipped silently.
    pub fn retain<S: AsRef<str>>(&self, keep: &[S]) -> AssimResult<RetainedCatalog> {
        if let Some(missing) = keep.iter().find(|name| self.get(name.as_ref()).is_none()) {
            return Err(AssimError::MissingVariable { name: missing.as_ref().to_string() });
        }
        let entries = self
            .entries
            .iter()
            .filter(|entry| keep.iter().any(|name| name.as_ref() == entry.name))
            .cloned()
            .collect();
        Ok(RetainedCatalog { entries, state_len: self.state_len })
    }

    /// Keep every variable matching at least one shell-style pattern.
    ///
    /// Errors
    /// ------
    /// - `AssimError::InvalidPattern` if a pattern cannot be compiled.
    /// - `AssimError::UnmatchedPattern` if a pattern selects nothing.
    pub fn retain_matching<S: AsRef<str>>(&self, patterns: &[S]) -> AssimResult<RetainedCatalog> {
        let mut keep = vec![false; self.entries.len()];
        for pattern in patterns {
            let regex = compile_pattern(pattern.as_ref())?;
            let mut matched = false;
            for (flag, entry) in keep.iter_mut().zip(&self.entries) {
                if regex.is_match(&entry.name) {
                    *flag = true;
                    matched = true;
                }
            }
            if !matched {
                return Err(AssimError::UnmatchedPattern { pattern: pattern.as_ref().to_string() });
            }
        }
        let entries = self
            .entries
            .iter()
            .zip(keep)
            .filter_map(|(entry, flag)| flag.then(|| entry.clone()))
            .collect();
        Ok(RetainedCatalog { entries, state_len: self.state_len })
    }
}

/// RetainedCatalog — immutable view of the variables the assimilation owns.
///
/// Produced by [`VariableCatalog::retain`] / [`VariableCatalog::retain_matching`].
/// Entries inherit the parent catalog's validation, so views built from a
/// `RetainedCatalog` can slice buffers of length `state_len` without further
/// bounds checks.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedCatalog {
    entries: Vec<VariableEntry>,
    state_len: usize,
}

impl RetainedCatalog {
    pub fn state_len(&self) -> usize {
        self.state_len
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VariableEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Like [`RetainedCatalog::get`], but a missing name is a configuration error.
    pub fn require(&self, name: &str) -> AssimResult<&VariableEntry> {
        self.get(name).ok_or_else(|| AssimError::MissingVariable { name: name.to_string() })
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    /// Retained entries matching any of `patterns`, in catalog order.
    ///
    /// Unlike [`VariableCatalog::retain_matching`], an empty match is not an
    /// error; callers decide whether an empty role is acceptable.
    pub fn matching<S: AsRef<str>>(&self, patterns: &[S]) -> AssimResult<Vec<&VariableEntry>> {
        let compiled =
            patterns.iter().map(|p| compile_pattern(p.as_ref())).collect::<AssimResult<Vec<_>>>()?;
        Ok(self
            .entries
            .iter()
            .filter(|entry| compiled.iter().any(|regex| regex.is_match(&entry.name)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Layout validation in `VariableCatalog::new`.
    // - Exact-name retention, including the missing-name error.
    // - Pattern retention and the unmatched-pattern error.
    // - Lookups on `RetainedCatalog`.
    //
    // They intentionally DO NOT cover:
    // - Buffer slicing; that lives in `state::view`.
    // -------------------------------------------------------------------------

    fn bgc_catalog() -> VariableCatalog {
        VariableCatalog::new(
            vec![
                VariableEntry::new("z", 0, 3),
                VariableEntry::new("P1_Chl", 3, 3),
                VariableEntry::new("P2_Chl", 6, 3),
                VariableEntry::new("total_chlorophyll", 9, 3),
                VariableEntry::new("temp", 12, 3),
            ],
            15,
        )
        .expect("layout is valid")
    }

    #[test]
    // Purpose
    // -------
    // Verify the reference selection scenario: keeping "chl" drops "temp".
    //
    // Given
    // -----
    // - Catalog {"chl": (0, 1), "temp": (1, 1)} and keep-list ["chl"].
    //
    // Expect
    // ------
    // - "temp" is absent from the retained catalog.
    // - "chl" is present with its original start and length.
    fn retain_keeps_only_listed_names() {
        let catalog = VariableCatalog::new(
            vec![VariableEntry::new("chl", 0, 1), VariableEntry::new("temp", 1, 1)],
            2,
        )
        .unwrap();

        let retained = catalog.retain(&["chl"]).unwrap();

        assert!(!retained.contains("temp"));
        assert_eq!(retained.get("chl"), Some(&VariableEntry::new("chl", 0, 1)));
        assert_eq!(retained.state_len(), 2);
        // The full catalog itself is untouched.
        assert!(catalog.get("temp").is_some());
    }

    #[test]
    // Purpose
    // -------
    // Ensure a keep-list name the host does not provide is reported, not
    // skipped.
    //
    // Given
    // -----
    // - The BGC catalog and keep-list ["P1_Chl", "P3_Chl"].
    //
    // Expect
    // ------
    // - `Err(AssimError::MissingVariable { name: "P3_Chl" })`.
    fn retain_rejects_unknown_names() {
        let catalog = bgc_catalog();

        let err = catalog.retain(&["P1_Chl", "P3_Chl"]).unwrap_err();

        assert_eq!(err, AssimError::MissingVariable { name: "P3_Chl".to_string() });
    }

    #[test]
    // Purpose
    // -------
    // Verify pattern selection with the variational include list.
    //
    // Given
    // -----
    // - Patterns ["P?_*", "total_chlorophyll", "z"].
    //
    // Expect
    // ------
    // - Everything except "temp" is kept, in registration order.
    fn retain_matching_selects_by_pattern_in_catalog_order() {
        let catalog = bgc_catalog();

        let retained = catalog.retain_matching(&["P?_*", "total_chlorophyll", "z"]).unwrap();

        assert_eq!(retained.names(), vec!["z", "P1_Chl", "P2_Chl", "total_chlorophyll"]);
    }

    #[test]
    // Purpose
    // -------
    // Ensure a pattern that selects nothing is a configuration error.
    //
    // Given
    // -----
    // - Pattern "N?_*" against the BGC catalog.
    //
    // Expect
    // ------
    // - `Err(AssimError::UnmatchedPattern)`.
    fn retain_matching_rejects_unmatched_pattern() {
        let catalog = bgc_catalog();

        let err = catalog.retain_matching(&["z", "N?_*"]).unwrap_err();

        assert_eq!(err, AssimError::UnmatchedPattern { pattern: "N?_*".to_string() });
    }

    #[test]
    // Purpose
    // -------
    // Ensure overlapping entries are rejected at construction time.
    //
    // Given
    // -----
    // - "a" on [0, 4) and "b" on [3, 5).
    //
    // Expect
    // ------
    // - `Err(AssimError::OverlappingVariables)` naming both variables.
    fn new_rejects_overlapping_entries() {
        let err = VariableCatalog::new(
            vec![VariableEntry::new("b", 3, 2), VariableEntry::new("a", 0, 4)],
            5,
        )
        .unwrap_err();

        assert_eq!(
            err,
            AssimError::OverlappingVariables { first: "a".to_string(), second: "b".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Ensure entries past the end of the state are rejected.
    //
    // Given
    // -----
    // - "a" on [2, 6) with a state length of 5.
    //
    // Expect
    // ------
    // - `Err(AssimError::VariableOutOfBounds)`.
    fn new_rejects_out_of_bounds_entries() {
        let err = VariableCatalog::new(vec![VariableEntry::new("a", 2, 4)], 5).unwrap_err();

        assert!(matches!(err, AssimError::VariableOutOfBounds { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Verify `matching` returns an empty list rather than failing.
    //
    // Given
    // -----
    // - A retained catalog without any "N*" variables.
    //
    // Expect
    // ------
    // - `Ok(vec![])` for pattern "N*"; two entries for "P*".
    fn retained_matching_allows_empty_roles() {
        let retained = bgc_catalog().retain(&["P1_Chl", "P2_Chl", "z"]).unwrap();

        assert!(retained.matching(&["N*"]).unwrap().is_empty());
        assert_eq!(retained.matching(&["P*"]).unwrap().len(), 2);
    }
}
