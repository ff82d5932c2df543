//! Ensemble statistics over the member axis.
//!
//! All reductions here run over a full column (every member) and return plain
//! scalars, so callers can compute every statistic they need before writing
//! anything back into the buffer.
use ndarray::ArrayView1;

/// Mean and mean absolute deviation of one level across members.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelStats {
    pub mean: f64,
    /// `mean(|x_m - mean|)` over members.
    pub mean_abs_dev: f64,
}

/// Ensemble mean of one level. An empty column yields NaN.
#[inline]
pub fn member_mean(level: ArrayView1<'_, f64>) -> f64 {
    level.sum() / level.len() as f64
}

/// Mean absolute deviation of one level around `mean`.
#[inline]
pub fn mean_abs_deviation(level: ArrayView1<'_, f64>, mean: f64) -> f64 {
    level.iter().map(|x| (x - mean).abs()).sum::<f64>() / level.len() as f64
}

pub fn level_stats(level: ArrayView1<'_, f64>) -> LevelStats {
    let mean = member_mean(level);
    LevelStats { mean, mean_abs_dev: mean_abs_deviation(level, mean) }
}
