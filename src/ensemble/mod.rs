//! Ensemble execution and reduction: run many stochastic parameterizations
//! per suppression scenario and reduce them into percentile-banded summaries.
mod aggregate;
mod runner;
mod summary;

pub use aggregate::*;
pub use runner::*;
pub use summary::*;
