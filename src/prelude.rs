pub use crate::data::{CountyMetadata, HospitalCapacity, MergedCounty, ReferenceData};
pub use crate::ensemble::{
    CompartmentSummary, EnsembleAggregator, EnsembleRunner, EnsembleSummary, RegionSummary,
    RunnerConfig, SummaryValue,
};
pub use crate::error::{Error, Result};
pub use crate::fit::{CaseSeries, FitResult, StartTimeFitter};
pub use crate::impute::{ImputedRow, StartTimeImputer};
pub use crate::model::{EpidemicModel, ModelRun};
pub use crate::params::{OverrideSet, ParameterSampler, ParameterSet};
pub use crate::policy::{
    PolicyFactory, RampPolicyFactory, Scenario, StartAlignedPolicyFactory, SuppressionPolicy,
};
pub use crate::report::ReportSink;

/// Base Real type used by this crate. Uses an alias to easily change precision
/// if necessary.
pub type Real = f64;

/// Calendar-day offsets. Case observations and fit outputs are measured in
/// whole days.
pub type Day = i64;

pub(crate) const NAN: Real = Real::NAN;
