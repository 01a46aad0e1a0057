//! The model-adapter boundary.
//!
//! The compartmental disease model is an external collaborator: the core
//! hands it a fully specified [`ParameterSet`] and gets back named
//! compartment series over the shared time grid. Everything past that
//! contract is opaque.
use crate::error::Result;
use crate::params::ParameterSet;
use crate::prelude::Real;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named, ordered compartment series over the shared time grid.
pub type CompartmentSeries = BTreeMap<String, Vec<Real>>;

/// One executed simulation: the parameter set used, the resulting series for
/// every compartment, and the grid they are defined on. Ephemeral; lives only
/// within one ensemble evaluation.
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub params: ParameterSet,
    pub results: CompartmentSeries,
    pub t_list: Arc<Vec<Real>>,
}

impl ModelRun {
    pub fn compartment(&self, name: &str) -> Option<&[Real]> {
        self.results.get(name).map(Vec::as_slice)
    }
}

/// Executes one parameterized simulation. Implementations must be callable
/// from parallel workers; runs are independent and order-insensitive.
pub trait EpidemicModel: Sync {
    fn run(&self, params: &ParameterSet) -> Result<ModelRun>;
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use crate::policy::SuppressionPolicy;

    /// Minimal parameter set for aggregator and orchestrator tests.
    pub fn stub_params(t_list: Arc<Vec<Real>>, beds: Real, icu: Real, vents: Real) -> ParameterSet {
        ParameterSet {
            t_list,
            suppression_policy: SuppressionPolicy::constant(1.0),
            n_population: 10_000.0,
            e_initial: 0.0,
            a_initial: 1.0,
            i_initial: 1.0,
            r_initial: 0.0,
            d_initial: 0.0,
            hgen_initial: 0.0,
            hicu_initial: 0.0,
            hicuvent_initial: 0.0,
            r0: 3.5,
            hospitalization_rate_general: 0.1,
            hospitalization_rate_icu: 0.03,
            fraction_icu_requiring_ventilator: 0.5,
            sigma: 0.2,
            delta: 0.2,
            kappa: 1.0,
            gamma: 0.5,
            symptoms_to_hospital_days: 6.5,
            symptoms_to_mortality_days: 18.8,
            los_general: 7.0,
            los_icu: 16.0,
            los_icu_ventilator: 17.0,
            mortality_rate: 0.01,
            mortality_rate_no_general_beds: 0.25,
            mortality_rate_no_icu_beds: 0.9,
            mortality_rate_no_ventilator: 1.0,
            beds_general: beds,
            beds_icu: icu,
            ventilators: vents,
        }
    }

    /// A run with fixed compartment series, for deterministic reductions.
    pub fn stub_run(
        t_list: &Arc<Vec<Real>>,
        series: &[(&str, Vec<Real>)],
        beds: Real,
    ) -> ModelRun {
        let mut results = CompartmentSeries::new();
        for (name, values) in series {
            results.insert(name.to_string(), values.clone());
        }
        ModelRun {
            params: stub_params(t_list.clone(), beds, beds, beds),
            results,
            t_list: t_list.clone(),
        }
    }
}
