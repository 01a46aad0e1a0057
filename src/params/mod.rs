//! Parameter sets and the stochastic sampler that draws them.
//!
//! A [`ParameterSet`] fully specifies one simulation run. Every field the
//! model adapter can see is enumerated explicitly here; there is no dynamic
//! keyword bag, and overrides naming an unknown field are rejected at
//! construction instead of passed through silently.
#[macro_use]
mod macros;

mod overrides;
mod sampler;

pub use overrides::*;
pub use sampler::*;

use crate::policy::SuppressionPolicy;
use crate::prelude::Real;
use std::sync::Arc;

/// Full specification of one simulation run. Immutable once constructed and
/// consumed exactly once by the model adapter. Within an ensemble every set
/// shares the same time grid, population and suppression policy; only the
/// stochastic rates and the derived initial conditions vary draw-to-draw.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    /// Shared simulation time grid, in days.
    pub t_list: Arc<Vec<Real>>,
    /// Time-varying transmission multiplier.
    pub suppression_policy: SuppressionPolicy,

    pub n_population: Real,
    pub e_initial: Real,
    pub a_initial: Real,
    pub i_initial: Real,
    pub r_initial: Real,
    pub d_initial: Real,
    pub hgen_initial: Real,
    pub hicu_initial: Real,
    pub hicuvent_initial: Real,

    /// Basic reproduction number.
    pub r0: Real,
    pub hospitalization_rate_general: Real,
    pub hospitalization_rate_icu: Real,
    pub fraction_icu_requiring_ventilator: Real,
    /// Incubation rate (1 / incubation period days).
    pub sigma: Real,
    /// Symptom-to-removal rate.
    pub delta: Real,
    /// Relative infectivity of asymptomatic carriers.
    pub kappa: Real,
    /// Fraction of infections that stay asymptomatic.
    pub gamma: Real,
    pub symptoms_to_hospital_days: Real,
    pub symptoms_to_mortality_days: Real,
    pub los_general: Real,
    pub los_icu: Real,
    pub los_icu_ventilator: Real,
    pub mortality_rate: Real,
    pub mortality_rate_no_general_beds: Real,
    pub mortality_rate_no_icu_beds: Real,
    pub mortality_rate_no_ventilator: Real,

    pub beds_general: Real,
    pub beds_icu: Real,
    pub ventilators: Real,
}

macro_rules! mean_impl {
    ($($field:ident => $name:literal,)+) => {
        /// Arithmetic mean of all scalar fields over an ensemble. The grid
        /// and policy are taken from the first set; they are shared across
        /// the ensemble by construction.
        pub fn mean_of(sets: &[ParameterSet]) -> ParameterSet {
            let n = sets.len() as Real;
            let mut out = sets[0].clone();
            $( out.$field = sets.iter().map(|p| p.$field).sum::<Real>() / n; )+
            out
        }
    };
}
with_scalar_params!(mean_impl);

impl ParameterSet {
    /// Capacity constant guarding the given compartment, if it is one of the
    /// capacity-bound resource compartments.
    pub fn capacity_for(&self, compartment: &str) -> Option<Real> {
        match compartment {
            "HGen" => Some(self.beds_general),
            "HICU" => Some(self.beds_icu),
            "HVent" => Some(self.ventilators),
            _ => None,
        }
    }
}
