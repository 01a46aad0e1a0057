//! A compact discretized SEIR-style model implementing the adapter trait.
//!
//! This is a reference collaborator so the crate runs end to end without an
//! external simulator. The core never depends on its internals; ensemble
//! tests use fixed stub runs instead.
use crate::error::Result;
use crate::model::{CompartmentSeries, EpidemicModel, ModelRun};
use crate::params::ParameterSet;
use crate::prelude::Real;

/// Forward-Euler integration of an SEIR model extended with asymptomatic
/// carriers and three hospital-care levels (general, ICU, ICU + ventilator).
/// Transmission is scaled by the parameter set's suppression policy at each
/// step; mortality worsens when a care level saturates its capacity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeirModel;

impl EpidemicModel for SeirModel {
    fn run(&self, params: &ParameterSet) -> Result<ModelRun> {
        let t = &params.t_list;
        let steps = t.len();
        let n = params.n_population;

        let mut s = n
            - params.e_initial
            - params.a_initial
            - params.i_initial
            - params.r_initial
            - params.d_initial;
        let mut e = params.e_initial;
        let mut a = params.a_initial;
        let mut i = params.i_initial;
        let mut r = params.r_initial;
        let mut h_gen = params.hgen_initial;
        let mut h_icu = params.hicu_initial;
        let mut h_vent = params.hicuvent_initial;
        let mut d = params.d_initial;

        let mut series: CompartmentSeries = ["E", "A", "I", "R", "HGen", "HICU", "HVent", "D"]
            .iter()
            .map(|k| (k.to_string(), Vec::with_capacity(steps)))
            .collect();

        for (idx, &time) in t.iter().enumerate() {
            let dt = if idx + 1 < steps {
                t[idx + 1] - time
            } else if idx > 0 {
                time - t[idx - 1]
            } else {
                1.0
            };

            record(&mut series, e, a, i, r, h_gen, h_icu, h_vent, d);

            // R0 = beta / delta, reduced by the policy in effect.
            let beta = params.suppression_policy.at(time) * params.r0 * params.delta;
            let force = beta * (i + params.kappa * a) / n;

            let new_exposed = force * s;
            let incubated = params.sigma * e;
            let a_out = params.delta * a;
            let i_out = params.delta * i;

            let to_gen = params.hospitalization_rate_general * i_out;
            let to_icu = params.hospitalization_rate_icu * i_out;
            let to_vent = params.fraction_icu_requiring_ventilator * to_icu;

            let gen_out = h_gen / params.los_general.max(1.0);
            let icu_out = h_icu / params.los_icu.max(1.0);
            let vent_out = h_vent / params.los_icu_ventilator.max(1.0);

            // Saturation-dependent mortality: demand beyond capacity dies at
            // the no-resource rate instead of the baseline rate.
            let gen_mort = saturated_mortality(
                h_gen,
                params.beds_general,
                params.mortality_rate,
                params.mortality_rate_no_general_beds,
            );
            let icu_mort = saturated_mortality(
                h_icu,
                params.beds_icu,
                params.mortality_rate_no_general_beds,
                params.mortality_rate_no_icu_beds,
            );
            let vent_mort = saturated_mortality(
                h_vent,
                params.ventilators,
                params.mortality_rate_no_icu_beds,
                params.mortality_rate_no_ventilator,
            );

            let deaths = params.mortality_rate * i_out
                + gen_mort * gen_out
                + icu_mort * icu_out
                + vent_mort * vent_out;

            s = (s - dt * new_exposed).max(0.0);
            e = (e + dt * (new_exposed - incubated)).max(0.0);
            a = (a + dt * (params.gamma * incubated - a_out)).max(0.0);
            i = (i + dt * ((1.0 - params.gamma) * incubated - i_out)).max(0.0);
            h_gen = (h_gen + dt * (to_gen - gen_out)).max(0.0);
            h_icu = (h_icu + dt * (to_icu - to_vent - icu_out)).max(0.0);
            h_vent = (h_vent + dt * (to_vent - vent_out)).max(0.0);
            d += dt * deaths;
            r = (n - s - e - a - i - h_gen - h_icu - h_vent - d).max(0.0);
        }

        Ok(ModelRun {
            params: params.clone(),
            results: series,
            t_list: params.t_list.clone(),
        })
    }
}

fn saturated_mortality(occupancy: Real, capacity: Real, base: Real, saturated: Real) -> Real {
    if occupancy <= capacity || occupancy <= 0.0 {
        base
    } else {
        let over = ((occupancy - capacity) / occupancy).clamp(0.0, 1.0);
        base + over * (saturated - base)
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    series: &mut CompartmentSeries,
    e: Real,
    a: Real,
    i: Real,
    r: Real,
    h_gen: Real,
    h_icu: Real,
    h_vent: Real,
    d: Real,
) {
    for (key, value) in [
        ("E", e),
        ("A", a),
        ("I", i),
        ("R", r),
        ("HGen", h_gen),
        ("HICU", h_icu),
        ("HVent", h_vent),
        ("D", d),
    ] {
        if let Some(col) = series.get_mut(key) {
            col.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_fixtures::stub_params;
    use std::sync::Arc;

    fn grid(days: usize) -> Arc<Vec<Real>> {
        Arc::new((0..days).map(|d| d as Real).collect())
    }

    #[test]
    fn produces_full_length_nonnegative_series() {
        let params = stub_params(grid(120), 100.0, 10.0, 12.0);
        let run = SeirModel.run(&params).unwrap();
        for (name, values) in &run.results {
            assert_eq!(values.len(), 120, "compartment {}", name);
            assert!(values.iter().all(|v| *v >= 0.0 && v.is_finite()));
        }
    }

    #[test]
    fn epidemic_grows_then_declines() {
        let params = stub_params(grid(365), 100.0, 10.0, 12.0);
        let run = SeirModel.run(&params).unwrap();
        let infected = run.compartment("I").unwrap();
        let peak = crate::utils::argmax(infected);
        assert!(peak > 0 && peak < 364);
        assert!(infected[peak] > infected[0]);
        assert!(*infected.last().unwrap() < infected[peak]);
    }

    #[test]
    fn full_suppression_prevents_growth() {
        let mut params = stub_params(grid(120), 100.0, 10.0, 12.0);
        params.suppression_policy = crate::policy::SuppressionPolicy::constant(0.0);
        let run = SeirModel.run(&params).unwrap();
        let infected = run.compartment("I").unwrap();
        assert!(infected.iter().all(|v| *v <= params.i_initial + 1e-9));
    }
}
