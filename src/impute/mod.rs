//! Start-date imputation for regions whose case data could not be fit.
//!
//! Regions with valid fits train a regression from demographic features to
//! days-since-anchor; the regression then predicts start dates for the
//! remaining regions. Several candidate estimators are cross-validated for
//! diagnostics, but the final model is always the Bayesian ridge.
mod estimators;
mod imputer;
mod validate;

pub use estimators::*;
pub use imputer::*;
pub use validate::*;
