//! Small numeric helpers shared by the aggregation and fitting layers.
use crate::prelude::Real;
use ndarray::prelude::*;

/// Linear-interpolation percentile of a slice, matching the convention used
/// by most array libraries: rank = p/100 * (n - 1), interpolated between the
/// two nearest order statistics. A single-element slice returns that element
/// at every percentile.
pub fn percentile(values: &[Real], p: Real) -> Real {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] but assumes `sorted` is already ascending. An
/// empty slice has no order statistics and yields NaN.
pub fn percentile_sorted(sorted: &[Real], p: Real) -> Real {
    let n = sorted.len();
    if n == 0 {
        return crate::prelude::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as Real;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as Real;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Column-wise percentile over a runs x timesteps matrix. Each timestep is
/// reduced independently across runs.
pub fn column_percentiles(stack: &Array2<Real>, p: Real) -> Vec<Real> {
    stack
        .columns()
        .into_iter()
        .map(|col| percentile(&col.to_vec(), p))
        .collect()
}

/// Index of the maximum value. Ties resolve to the earliest index.
pub fn argmax(values: &[Real]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

pub fn mean(values: &[Real]) -> Real {
    values.iter().sum::<Real>() / values.len() as Real
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: Real, stop: Real, n: usize) -> Vec<Real> {
    if n <= 1 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as Real;
    (0..n).map(|i| start + step * i as Real).collect()
}
