use super::{OverrideSet, ParameterSet};
use crate::data::{MergedCounty, ReferenceData};
use crate::error::Result;
use crate::policy::SuppressionPolicy;
use crate::prelude::Real;
use rand::prelude::*;
use rand_distr::{Distribution, Gamma, Normal};
use std::sync::Arc;

/// Draws stochastic parameter sets for one region from the prior
/// distributions documented on [`sample`](ParameterSampler::sample), merged
/// with the region's hospital-capacity constants.
///
/// Construction fails fast with a missing-region error when the county is
/// absent from the reference tables; sampling never produces a parameter set
/// with an undefined population.
#[derive(Debug)]
pub struct ParameterSampler {
    merged: MergedCounty,
    t_list: Arc<Vec<Real>>,
    i_initial: Real,
    suppression_policy: SuppressionPolicy,
    overrides: OverrideSet,
    rng: SmallRng,
}

fn normal(rng: &mut SmallRng, loc: Real, scale: Real) -> Real {
    Normal::new(loc, scale).unwrap().sample(rng)
}

fn gamma(rng: &mut SmallRng, shape: Real, scale: Real) -> Real {
    Gamma::new(shape, scale).unwrap().sample(rng)
}

impl ParameterSampler {
    pub fn new(
        reference: &ReferenceData,
        fips: &str,
        t_list: Arc<Vec<Real>>,
        i_initial: Real,
        suppression_policy: SuppressionPolicy,
    ) -> Result<Self> {
        let merged = reference.merged_county(fips)?;
        Ok(Self::with_county(
            merged,
            t_list,
            i_initial,
            suppression_policy,
        ))
    }

    /// Build from an already-merged county record, for callers that resolved
    /// the region themselves.
    pub fn with_county(
        merged: MergedCounty,
        t_list: Arc<Vec<Real>>,
        i_initial: Real,
        suppression_policy: SuppressionPolicy,
    ) -> Self {
        ParameterSampler {
            merged,
            t_list,
            i_initial,
            suppression_policy,
            overrides: OverrideSet::default(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// Fix the RNG seed. Ensembles are otherwise not reproducible across
    /// invocations.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Overrides are applied to every draw after sampling, replacing the
    /// named fields verbatim.
    pub fn with_overrides(mut self, overrides: OverrideSet) -> Self {
        self.overrides = overrides;
        self
    }

    /// Draw `n` independent parameter sets.
    ///
    /// Priors:
    /// - `hospitalization_rate_general` ~ Normal(0.10, 0.03)
    /// - fraction asymptomatic ~ Uniform(0.4, 0.6); also sets `gamma` and
    ///   derives `A_initial` from the given initial infected count
    /// - `R0` ~ Uniform(3.0, 4.5)
    /// - `hospitalization_rate_icu` ~ Normal(0.29, 0.03) x general rate,
    ///   clamped at >= 0
    /// - `fraction_icu_requiring_ventilator` ~ Normal(0.54, 0.20), clamped
    ///   at >= 0
    /// - `sigma` = 1 / Normal(5.1, 0.86), `delta` = 1 / Gamma(5.0, 1.0)
    /// - symptom-onset delays and lengths of stay ~ Normal (see body)
    /// - `mortality_rate` ~ Normal(0.01, 0.0025); saturation multipliers
    ///   Uniform(0.2, 0.3) without general beds, Uniform(0.8, 1.0) without
    ///   ICU beds, 1.0 without a ventilator
    /// - beds from the merged hospital table (missing rows leave 0);
    ///   ventilators = ICU beds x Uniform(1.0, 1.2)
    pub fn sample(&mut self, n: usize) -> Vec<ParameterSet> {
        let mut sets = Vec::with_capacity(n);
        for _ in 0..n {
            let mut params = self.draw();
            self.overrides.apply(&mut params);
            sets.push(params);
        }
        sets
    }

    /// Arithmetic mean of all scalar parameters over one freshly drawn
    /// ensemble, for point-estimate runs.
    pub fn mean_parameters(&mut self, n: usize) -> ParameterSet {
        let sets = self.sample(n.max(1));
        super::mean_of(&sets)
    }

    pub fn merged_county(&self) -> &MergedCounty {
        &self.merged
    }

    fn draw(&mut self) -> ParameterSet {
        let rng = &mut self.rng;
        let capacity = &self.merged.capacity;

        let hospitalization_rate_general = normal(rng, 0.10, 0.03);
        let fraction_asymptomatic = rng.gen_range(0.4..0.6);

        ParameterSet {
            t_list: self.t_list.clone(),
            suppression_policy: self.suppression_policy.clone(),
            n_population: self.merged.metadata.total_population,
            e_initial: 0.0,
            // Asymptomatic cases are assumed untested, so the initial pool is
            // derived from the sampled asymptomatic fraction.
            a_initial: fraction_asymptomatic * self.i_initial / (1.0 - fraction_asymptomatic),
            i_initial: self.i_initial,
            r_initial: 0.0,
            d_initial: 0.0,
            hgen_initial: 0.0,
            hicu_initial: 0.0,
            hicuvent_initial: 0.0,
            r0: rng.gen_range(3.0..4.5),
            hospitalization_rate_general,
            hospitalization_rate_icu: (normal(rng, 0.29, 0.03) * hospitalization_rate_general)
                .max(0.0),
            fraction_icu_requiring_ventilator: normal(rng, 0.54, 0.20).max(0.0),
            sigma: 1.0 / normal(rng, 5.1, 0.86),
            delta: 1.0 / gamma(rng, 5.0, 1.0),
            kappa: 1.0,
            gamma: fraction_asymptomatic,
            symptoms_to_hospital_days: normal(rng, 6.5, 1.5),
            symptoms_to_mortality_days: normal(rng, 18.8, 0.45),
            los_general: normal(rng, 7.0, 2.0),
            los_icu: normal(rng, 16.0, 3.0),
            los_icu_ventilator: normal(rng, 17.0, 3.0),
            mortality_rate: normal(rng, 0.01, 0.0025),
            mortality_rate_no_general_beds: rng.gen_range(0.2..0.3),
            mortality_rate_no_icu_beds: rng.gen_range(0.8..1.0),
            mortality_rate_no_ventilator: 1.0,
            beds_general: capacity.num_licensed_beds - capacity.bed_utilization
                + capacity.potential_increase_in_bed_capac,
            beds_icu: capacity.num_icu_beds,
            ventilators: capacity.num_icu_beds * rng.gen_range(1.0..1.2),
        }
    }
}
