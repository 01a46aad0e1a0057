//! Outbreak start-time inference from early case counts.
//!
//! Each region's cumulative case series is fit with an exponential growth
//! model in two passes (coarse, then windowed around the threshold crossing)
//! and the crossing day is converted to a calendar start date. Regions with
//! too little data are recorded as unfitted and left to the imputer.
mod exponential;
mod fitter;

pub use exponential::*;
pub use fitter::*;

use crate::data::ReferenceData;
use crate::error::{Error, Result};
use crate::prelude::Real;
use chrono::NaiveDate;
use log::warn;

/// One region's case observations, time axis normalized to days since the
/// first observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSeries {
    pub fips: String,
    pub start_date: NaiveDate,
    pub t: Vec<Real>,
    pub y: Vec<Real>,
}

impl CaseSeries {
    pub fn new(fips: &str, start_date: NaiveDate, observations: &[(i64, Real)]) -> Self {
        CaseSeries {
            fips: fips.to_string(),
            start_date,
            t: observations.iter().map(|(d, _)| *d as Real).collect(),
            y: observations.iter().map(|(_, c)| *c).collect(),
        }
    }

    pub fn from_reference(reference: &ReferenceData, fips: &str) -> Result<Self> {
        let (start_date, observations) =
            reference
                .case_series(fips)
                .ok_or_else(|| Error::DataInsufficient {
                    fips: fips.to_string(),
                    days: 0,
                    required: DEFAULT_MIN_DAYS,
                })?;
        Ok(Self::new(fips, start_date, &observations))
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Fit outcome for one region; `None` when the fit was infeasible or did not
/// converge.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFit {
    pub fips: String,
    pub fit: Option<FitResult>,
}

/// Fit every county of a state. Recoverable per-region failures (too little
/// data, non-convergence) are logged and recorded as unfitted; the batch
/// always completes.
pub fn fit_state_start_times(
    state: &str,
    reference: &ReferenceData,
    fitter: &StartTimeFitter,
) -> Vec<RegionFit> {
    let mut fits = Vec::new();
    for county in reference.counties_in_state(state) {
        let fit = CaseSeries::from_reference(reference, &county.fips)
            .and_then(|series| fitter.fit(&series));
        let fit = match fit {
            Ok(result) => Some(result),
            Err(err) if err.is_recoverable() => {
                warn!("region {}: no start-time fit ({})", county.fips, err);
                None
            }
            Err(err) => {
                warn!("region {}: fit failed ({})", county.fips, err);
                None
            }
        };
        fits.push(RegionFit {
            fips: county.fips.clone(),
            fit,
        });
    }
    fits
}
