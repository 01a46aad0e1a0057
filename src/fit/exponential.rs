//! The exponential growth model and its chi-square-like loss.
use crate::prelude::Real;

/// `norm * exp((t - t0) / scale)`.
pub fn exponential_model(norm: Real, t0: Real, scale: Real, t: Real) -> Real {
    norm * ((t - t0) / scale).exp()
}

pub fn predictions(norm: Real, t0: Real, scale: Real, t: &[Real]) -> Vec<Real> {
    t.iter()
        .map(|&ti| exponential_model(norm, t0, scale, ti))
        .collect()
}

/// Reduced chi-square restricted to strictly positive observations. Counts
/// of zero carry no information for a multiplicative model and would divide
/// by zero, so they are excluded from the loss.
pub fn reduced_chi2(y_pred: &[Real], y: &[Real]) -> Real {
    let mut chi2 = 0.0;
    let mut n = 0usize;
    for (&pred, &obs) in y_pred.iter().zip(y) {
        if obs > 0.0 {
            chi2 += (pred - obs) * (pred - obs) / obs;
            n += 1;
        }
    }
    chi2 / (n.saturating_sub(1)).max(1) as Real
}
