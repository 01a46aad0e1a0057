use super::{exponential::predictions, reduced_chi2, CaseSeries};
use crate::error::{Error, Result};
use crate::prelude::Real;
use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_MIN_DAYS: usize = 5;

/// Fitted exponential parameters plus the derived start-date estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub norm: Real,
    /// Fitted model offset parameter, in days on the observation axis.
    pub t0_param: Real,
    /// Growth timescale, in days.
    pub scale: Real,
    /// Reduced chi-square of the windowed fit evaluated on the full series.
    pub reduced_chi2: Real,
    /// Day offset at which the refit predictions cross the target case
    /// count.
    pub t0_days: Real,
    /// Calendar date of the threshold crossing.
    pub t0_date: NaiveDate,
}

/// Two-pass exponential fit of a region's early case growth.
///
/// Pass one fits all observations from a fixed initial guess. Pass two keeps
/// only observations within a window around the day the coarse fit predicts
/// the target case count, refits, and derives the start date from the refit
/// predictions. The windowing keeps late-epidemic flattening from dragging
/// the early-growth estimate.
#[derive(Debug, Clone)]
pub struct StartTimeFitter {
    /// Case count whose crossing defines the start date.
    pub t0_case_count: Real,
    /// Observations kept this many days before the predicted crossing.
    pub days_before: usize,
    /// Observations kept this many days after the predicted crossing.
    pub days_after: usize,
    /// Fewer distinct observation days than this is fit-infeasible.
    pub min_days_required: usize,
}

impl Default for StartTimeFitter {
    fn default() -> Self {
        StartTimeFitter {
            t0_case_count: 1.0,
            days_before: 2,
            days_after: 1000,
            min_days_required: DEFAULT_MIN_DAYS,
        }
    }
}

struct ExpLoss<'a> {
    t: &'a [Real],
    y: &'a [Real],
}

impl CostFunction for ExpLoss<'_> {
    type Param = Vec<Real>;
    type Output = Real;

    fn cost(&self, p: &Self::Param) -> std::result::Result<Real, argmin::core::Error> {
        let cost = reduced_chi2(&predictions(p[0], p[1], p[2], self.t), self.y);
        // Overflowed exponentials poison simplex ordering; treat them as a
        // very bad vertex instead.
        Ok(if cost.is_finite() { cost } else { 1e300 })
    }
}

impl StartTimeFitter {
    /// Run the two-pass fit. Fails with `DataInsufficient` when the series
    /// has too few days and `NonConvergence` when the optimizer cannot
    /// produce finite parameters; both are recoverable for the batch.
    pub fn fit(&self, series: &CaseSeries) -> Result<FitResult> {
        if series.len() < self.min_days_required {
            return Err(Error::DataInsufficient {
                fips: series.fips.clone(),
                days: series.len(),
                required: self.min_days_required,
            });
        }
        if !series.y.iter().any(|&c| c > 0.0) {
            return Err(Error::NonConvergence {
                fips: series.fips.clone(),
                reason: "no positive case counts".to_string(),
            });
        }

        let coarse = self.minimize(&series.t, &series.y, &series.fips)?;
        let coarse_pred = predictions(coarse[0], coarse[1], coarse[2], &series.t);

        // Window around the timestep the coarse fit predicts the target
        // count, clamped to the available range.
        let crossing = nearest_index(&coarse_pred, self.t0_case_count);
        let lo = crossing.saturating_sub(self.days_before);
        let hi = (crossing + self.days_after.max(1)).min(series.len());

        let refit = self.minimize(&series.t[lo..hi], &series.y[lo..hi], &series.fips)?;
        let [norm, t0_param, scale] = [refit[0], refit[1], refit[2]];

        let fit_pred = predictions(norm, t0_param, scale, &series.t);
        let chi2 = reduced_chi2(&fit_pred, &series.y);
        let t0_idx = nearest_index(&fit_pred, self.t0_case_count);
        let t0_days = series.t[t0_idx];

        Ok(FitResult {
            norm,
            t0_param,
            scale,
            reduced_chi2: chi2,
            t0_days,
            t0_date: series.start_date + Duration::days(t0_days as i64),
        })
    }

    /// Nelder-Mead minimization of the chi-square loss from the fixed
    /// initial guess (norm=1, t0=5, scale=20).
    fn minimize(&self, t: &[Real], y: &[Real], fips: &str) -> Result<Vec<Real>> {
        let nonconvergence = |reason: String| Error::NonConvergence {
            fips: fips.to_string(),
            reason,
        };

        let x0 = vec![1.0, 5.0, 20.0];
        let simplex = vec![
            x0.clone(),
            vec![x0[0] + 0.5, x0[1], x0[2]],
            vec![x0[0], x0[1] + 2.0, x0[2]],
            vec![x0[0], x0[1], x0[2] + 5.0],
        ];
        let solver = NelderMead::new(simplex)
            .with_sd_tolerance(1e-10)
            .map_err(|e| nonconvergence(e.to_string()))?;

        let result = Executor::new(ExpLoss { t, y }, solver)
            .configure(|state| state.max_iters(2000))
            .run()
            .map_err(|e| nonconvergence(e.to_string()))?;

        let best = result
            .state()
            .get_best_param()
            .cloned()
            .ok_or_else(|| nonconvergence("no best parameters".to_string()))?;
        if best.iter().any(|v| !v.is_finite()) {
            return Err(nonconvergence(format!("non-finite parameters {:?}", best)));
        }
        Ok(best)
    }
}

fn nearest_index(predictions: &[Real], target: Real) -> usize {
    let mut best = 0;
    let mut best_dist = Real::INFINITY;
    for (i, &p) in predictions.iter().enumerate() {
        let dist = (p - target).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn doubling_series() -> CaseSeries {
        CaseSeries::new(
            "06075",
            date("2020-03-01"),
            &[(0, 1.0), (1, 2.0), (2, 4.0), (3, 8.0), (4, 16.0)],
        )
    }

    #[test]
    fn recovers_doubling_growth() {
        let fit = StartTimeFitter::default().fit(&doubling_series()).unwrap();
        // Doubling once per day means scale = 1 / ln 2.
        assert_approx_eq!(fit.scale, 1.0 / 2.0f64.ln(), 0.1);
        assert_eq!(fit.t0_days, 0.0);
        assert_eq!(fit.t0_date, date("2020-03-01"));
        assert!(fit.reduced_chi2.is_finite());
        assert!(fit.reduced_chi2 < 0.05);
    }

    #[test]
    fn crossing_day_shifts_with_later_growth() {
        // Same doubling curve delayed so the count reaches 1 at day 3.
        let series = CaseSeries::new(
            "06075",
            date("2020-03-01"),
            &[
                (0, 0.0),
                (1, 0.0),
                (2, 0.0),
                (3, 1.0),
                (4, 2.0),
                (5, 4.0),
                (6, 8.0),
                (7, 16.0),
            ],
        );
        let fit = StartTimeFitter::default().fit(&series).unwrap();
        assert_approx_eq!(fit.t0_days, 3.0, 1.0);
        assert_eq!(
            fit.t0_date,
            date("2020-03-01") + Duration::days(fit.t0_days as i64)
        );
    }

    #[test]
    fn too_few_days_is_fit_infeasible() {
        let series = CaseSeries::new(
            "06075",
            date("2020-03-01"),
            &[(0, 1.0), (1, 2.0), (2, 4.0), (3, 8.0)],
        );
        let err = StartTimeFitter::default().fit(&series).unwrap_err();
        assert!(matches!(
            err,
            Error::DataInsufficient {
                days: 4,
                required: 5,
                ..
            }
        ));
    }

    #[test]
    fn enough_days_never_raises() {
        // Noisy but positive growth data at exactly the minimum day count.
        let series = CaseSeries::new(
            "06075",
            date("2020-03-01"),
            &[(0, 1.0), (1, 3.0), (2, 3.0), (3, 9.0), (4, 14.0)],
        );
        assert!(StartTimeFitter::default().fit(&series).is_ok());
    }

    #[test]
    fn all_zero_counts_cannot_converge() {
        let series = CaseSeries::new(
            "06075",
            date("2020-03-01"),
            &[(0, 0.0), (1, 0.0), (2, 0.0), (3, 0.0), (4, 0.0)],
        );
        let err = StartTimeFitter::default().fit(&series).unwrap_err();
        assert!(matches!(err, Error::NonConvergence { .. }));
    }
}
