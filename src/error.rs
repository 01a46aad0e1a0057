//! Error taxonomy for the projection pipeline.
//!
//! Per-region failures (`DataInsufficient`, `NonConvergence`) are recoverable:
//! batch drivers record the region as unfitted and defer it to imputation.
//! `MissingReference` and `AggregationShape` are fatal for the region or
//! scenario that raised them but never abort sibling regions.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Too few distinct observation days to attempt a start-time fit.
    #[error("region {fips}: only {days} observation days, {required} required")]
    DataInsufficient {
        fips: String,
        days: usize,
        required: usize,
    },

    /// Region absent from the merged county/hospital reference tables.
    #[error("region {fips} missing from reference data")]
    MissingReference { fips: String },

    /// The start-time optimizer failed or produced non-finite parameters.
    #[error("start-time fit did not converge for region {fips}: {reason}")]
    NonConvergence { fips: String, reason: String },

    /// Model runs in one ensemble disagree on compartment keys or lengths.
    #[error("inconsistent ensemble shapes: {0}")]
    AggregationShape(String),

    /// A parameter override named a field that does not exist.
    #[error("unknown override field: {0}")]
    UnknownOverride(String),

    /// The imputation regression could not be trained or applied.
    #[error("regression failed: {0}")]
    Regression(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error leaves the region usable for downstream imputation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DataInsufficient { .. } | Error::NonConvergence { .. }
        )
    }
}
