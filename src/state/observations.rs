//! Observation batch — parallel `iobs` / `obs` / `obs_sds` arrays for a cycle.
//!
//! The batch borrows the caller's arrays; `obs` is mutable because log-space
//! transforms rewrite observed values in place (the analysis step reads the
//! same array). Observation standard deviations are never modified here.
use ndarray::{ArrayView1, ArrayViewMut1};

use crate::{
    errors::AssimResult,
    state::{catalog::VariableEntry, validation::validate_observation_lengths},
};

/// Borrowed observation arrays for one assimilation cycle.
///
/// Invariant: `iobs.len() == obs.len() == obs_sds.len()`, checked by
/// [`ObservationBatch::new`].
#[derive(Debug)]
pub struct ObservationBatch<'a> {
    iobs: ArrayView1<'a, usize>,
    obs: ArrayViewMut1<'a, f64>,
    obs_sds: ArrayView1<'a, f64>,
}

impl<'a> ObservationBatch<'a> {
    /// Errors
    /// ------
    /// - `AssimError::ObservationLengthMismatch` if the arrays are not parallel.
    pub fn new(
        iobs: ArrayView1<'a, usize>, obs: ArrayViewMut1<'a, f64>, obs_sds: ArrayView1<'a, f64>,
    ) -> AssimResult<Self> {
        validate_observation_lengths(iobs.len(), obs.len(), obs_sds.len())?;
        Ok(ObservationBatch { iobs, obs, obs_sds })
    }

    pub fn len(&self) -> usize {
        self.iobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iobs.is_empty()
    }

    pub fn iobs(&self) -> ArrayView1<'_, usize> {
        self.iobs.view()
    }

    pub fn obs(&self) -> ArrayView1<'_, f64> {
        self.obs.view()
    }

    pub fn obs_sds(&self) -> ArrayView1<'_, f64> {
        self.obs_sds.view()
    }

    /// Indices `k` with `entry.start <= iobs[k] < entry.stop()`.
    pub fn affected(&self, entry: &VariableEntry) -> Vec<usize> {
        self.iobs
            .iter()
            .enumerate()
            .filter_map(|(k, &offset)| entry.contains(offset).then_some(k))
            .collect()
    }

    /// Apply `f` in place to every observed value mapped into `entry`.
    ///
    /// Returns the number of observations touched.
    pub fn map_affected_inplace<F>(&mut self, entry: &VariableEntry, f: F) -> usize
    where
        F: Fn(f64) -> f64,
    {
        let affected = self.affected(entry);
        for &k in &affected {
            self.obs[k] = f(self.obs[k]);
        }
        affected.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AssimError;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Length validation in `ObservationBatch::new`.
    // - Half-open range selection in `affected` and in-place mapping.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure non-parallel arrays are rejected.
    //
    // Given
    // -----
    // - iobs of length 2, obs of length 2, obs_sds of length 1.
    //
    // Expect
    // ------
    // - `ObservationLengthMismatch { iobs: 2, obs: 2, obs_sds: 1 }`.
    fn new_rejects_mismatched_lengths() {
        let iobs = array![0_usize, 1];
        let mut obs = array![1.0, 2.0];
        let sds = array![0.1];

        let err = ObservationBatch::new(iobs.view(), obs.view_mut(), sds.view()).unwrap_err();

        assert_eq!(err, AssimError::ObservationLengthMismatch { iobs: 2, obs: 2, obs_sds: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Verify the `[start, stop)` mask and that only affected values change.
    //
    // Given
    // -----
    // - Entry on [2, 4); iobs = [1, 2, 3, 4]; obs = [1, 2, 3, 4].
    //
    // Expect
    // ------
    // - Affected indices [1, 2]; doubling yields [1, 4, 6, 4]; sds untouched.
    fn map_affected_inplace_uses_half_open_range() {
        let entry = VariableEntry::new("chl", 2, 2);
        let iobs = array![1_usize, 2, 3, 4];
        let mut obs = array![1.0, 2.0, 3.0, 4.0];
        let sds = array![0.1, 0.2, 0.3, 0.4];
        {
            let mut batch = ObservationBatch::new(iobs.view(), obs.view_mut(), sds.view()).unwrap();
            assert_eq!(batch.affected(&entry), vec![1, 2]);

            let touched = batch.map_affected_inplace(&entry, |v| 2.0 * v);

            assert_eq!(touched, 2);
            assert_eq!(batch.obs_sds(), array![0.1, 0.2, 0.3, 0.4]);
        }
        assert_eq!(obs, array![1.0, 4.0, 6.0, 4.0]);
    }
}
