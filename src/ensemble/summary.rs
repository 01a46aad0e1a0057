//! Persisted summary documents.
//!
//! The wire layout mirrors the consuming report tooling: per compartment a
//! flat object holding `ci_<p>` percentile bands, `peak_value_ci<p>` /
//! `peak_time_ci<p>` / `peak_value_mean` scalars, and for capacity-bound
//! compartments the per-run `surge_start` / `surge_end` / `capacity` arrays.
use crate::error::Result;
use crate::prelude::{Real, NAN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A value inside a compartment summary: either a scalar or a series. NaN is
/// not representable in JSON, so non-finite values are stored as `None` and
/// serialize as `null`; [`SummaryValue::series_nan`] restores NaN on the way
/// back out for the plotting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Scalar(Option<Real>),
    Series(Vec<Option<Real>>),
}

impl SummaryValue {
    pub fn scalar(value: Real) -> Self {
        SummaryValue::Scalar(value.is_finite().then_some(value))
    }

    pub fn series<I: IntoIterator<Item = Real>>(values: I) -> Self {
        SummaryValue::Series(
            values
                .into_iter()
                .map(|v| v.is_finite().then_some(v))
                .collect(),
        )
    }

    /// Series view with `null` mapped back to NaN.
    pub fn series_nan(&self) -> Option<Vec<Real>> {
        match self {
            SummaryValue::Series(values) => {
                Some(values.iter().map(|v| v.unwrap_or(NAN)).collect())
            }
            SummaryValue::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Real> {
        match self {
            SummaryValue::Scalar(v) => *v,
            SummaryValue::Series(_) => None,
        }
    }
}

/// Flat keyed summary of one compartment across an ensemble.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompartmentSummary {
    pub fields: BTreeMap<String, SummaryValue>,
}

impl CompartmentSummary {
    pub fn insert(&mut self, key: impl Into<String>, value: SummaryValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn band(&self, percentile: u8) -> Option<Vec<Real>> {
        self.fields
            .get(&format!("ci_{}", percentile))
            .and_then(SummaryValue::series_nan)
    }

    pub fn peak_value(&self, percentile: u8) -> Option<Real> {
        self.fields
            .get(&format!("peak_value_ci{}", percentile))
            .and_then(SummaryValue::as_scalar)
    }

    pub fn peak_time(&self, percentile: u8) -> Option<Real> {
        self.fields
            .get(&format!("peak_time_ci{}", percentile))
            .and_then(SummaryValue::as_scalar)
    }
}

/// Reduction of one scenario's ensemble: one summary per compartment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnsembleSummary {
    pub compartments: BTreeMap<String, CompartmentSummary>,
}

/// The persisted output artifact for one region: per-scenario ensemble
/// summaries keyed `suppression_policy__<value>`, the shared time grid and
/// run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub fips: String,
    pub state: String,
    pub county: String,
    /// Generation timestamp, ISO-8601.
    pub generated: String,
    pub n_samples: usize,
    pub n_years: usize,
    pub t_list: Vec<Real>,
    pub policies: BTreeMap<String, EnsembleSummary>,
}

impl RegionSummary {
    /// Whole-document overwrite of the per-region output path. Writes are
    /// per-region, so concurrent regions never contend; two workers writing
    /// the same region would be last-writer-wins.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
