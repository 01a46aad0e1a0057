//! County-level epidemic projections.
//!
//! The crate runs ensembles of stochastically parameterized compartmental
//! simulations under different suppression-policy scenarios and reduces them
//! into percentile-banded summaries, including hospital-capacity surge
//! windows. Upstream of the ensembles, an exponential-growth fitter infers
//! the outbreak start date of each region from early case counts, with a
//! regression-based imputation for regions that have too little data to fit.
pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod fit;
pub mod impute;
pub mod model;
pub mod models;
pub mod params;
pub mod policy;
pub mod prelude;
pub mod report;
pub mod utils;
