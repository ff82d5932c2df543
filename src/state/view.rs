//! StateView — bounds-checked, zero-copy access to variables of an ensemble
//! state buffer.
//!
//! Purpose
//! -------
//! Attach a caller-owned `(M, D)` state buffer to a [`RetainedCatalog`] and
//! hand out per-variable `(M, length)` views. All offset arithmetic happens
//! here, once, against a layout that was validated at catalog build time.
//!
//! Key behaviors
//! -------------
//! - [`StateView::new`] checks the buffer's row length against the catalog's
//!   state length and rejects empty ensembles.
//! - [`StateView::from_member`] treats a single `(D,)` analysis state as a
//!   one-member ensemble.
//! - [`StateView::variable`] / [`StateView::variable_mut`] return views into
//!   the buffer; nothing is copied and the buffer is never resized.
//! - [`StateView::check_finite`] reports the first NaN/±inf in any retained
//!   variable.
//!
//! Conventions
//! -----------
//! - Axis 0 is the ensemble member, axis 1 the state offset. Within a
//!   variable's view, column `length - 1` is the variable's last level.
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, s};

use crate::{
    errors::{AssimError, AssimResult},
    state::{
        catalog::{RetainedCatalog, VariableEntry},
        validation::{validate_members, validate_state_len},
    },
};

/// Mutable view of an ensemble state, addressed by variable name.
#[derive(Debug)]
pub struct StateView<'a, 'c> {
    data: ArrayViewMut2<'a, f64>,
    catalog: &'c RetainedCatalog,
}

impl<'a, 'c> StateView<'a, 'c> {
    /// Attach an `(M, D)` ensemble buffer to `catalog`.
    ///
    /// Errors
    /// ------
    /// - `AssimError::EmptyEnsemble` if `M == 0`.
    /// - `AssimError::StateLengthMismatch` if `D != catalog.state_len()`.
    pub fn new(data: ArrayViewMut2<'a, f64>, catalog: &'c RetainedCatalog) -> AssimResult<Self> {
        validate_members(None, data.nrows())?;
        validate_state_len(catalog.state_len(), data.ncols())?;
        Ok(StateView { data, catalog })
    }

    /// Attach a single `(D,)` state as a one-member ensemble.
    pub fn from_member(
        data: ArrayViewMut1<'a, f64>, catalog: &'c RetainedCatalog,
    ) -> AssimResult<Self> {
        Self::new(data.insert_axis(Axis(0)), catalog)
    }

    pub fn members(&self) -> usize {
        self.data.nrows()
    }

    pub fn catalog(&self) -> &'c RetainedCatalog {
        self.catalog
    }

    /// Require exactly `expected` members.
    pub fn expect_members(&self, expected: usize) -> AssimResult<()> {
        validate_members(Some(expected), self.members())
    }

    /// Full state row of member `index`.
    ///
    /// Panics
    /// ------
    /// - If `index >= self.members()`.
    pub fn member(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    /// `(M, length)` read-only view of a retained variable.
    pub fn variable(&self, name: &str) -> AssimResult<ArrayView2<'_, f64>> {
        let entry = self.catalog.require(name)?;
        Ok(self.data.slice(s![.., entry.range()]))
    }

    /// `(M, length)` mutable view of a retained variable.
    pub fn variable_mut(&mut self, name: &str) -> AssimResult<ArrayViewMut2<'_, f64>> {
        let entry = self.catalog.require(name)?;
        Ok(self.data.slice_mut(s![.., entry.range()]))
    }

    /// Mutable view for an entry taken from this view's own catalog.
    pub(crate) fn entry_mut(&mut self, entry: &VariableEntry) -> ArrayViewMut2<'_, f64> {
        self.data.slice_mut(s![.., entry.range()])
    }

    /// Report the first non-finite value of any retained variable.
    ///
    /// Errors
    /// ------
    /// - `AssimError::NonFiniteState` with the variable, member and absolute
    ///   state offset of the offending value.
    pub fn check_finite(&self) -> AssimResult<()> {
        for entry in self.catalog.entries() {
            let values = self.data.slice(s![.., entry.range()]);
            if let Some(((member, col), value)) =
                values.indexed_iter().find(|(_, value)| !value.is_finite())
            {
                return Err(AssimError::NonFiniteState {
                    name: entry.name.clone(),
                    member,
                    offset: entry.start + col,
                    value: *value,
                });
            }
        }
        Ok(())
    }
}
