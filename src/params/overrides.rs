use super::ParameterSet;
use crate::error::{Error, Result};
use crate::prelude::Real;

macro_rules! known_names {
    ($($field:ident => $name:literal,)+) => {
        const KNOWN_FIELDS: &[&str] = &[$($name),+];

        fn assign(params: &mut ParameterSet, name: &str, value: Real) {
            match name {
                $($name => params.$field = value,)+
                _ => unreachable!("override names are validated at construction"),
            }
        }
    };
}
with_scalar_params!(known_names);

/// A validated set of parameter overrides, applied verbatim to every draw
/// after sampling. Pinning fields this way is how tests get determinism out
/// of an otherwise stochastic sampler.
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    entries: Vec<(String, Real)>,
}

impl OverrideSet {
    /// Build from (wire name, value) pairs. Unknown names are rejected here
    /// rather than ignored downstream.
    pub fn new<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Real)>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        for (name, value) in pairs {
            let name = name.into();
            if !KNOWN_FIELDS.contains(&name.as_str()) {
                return Err(Error::UnknownOverride(name));
            }
            entries.push((name, value));
        }
        Ok(OverrideSet { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn apply(&self, params: &mut ParameterSet) {
        for (name, value) in &self.entries {
            assign(params, name, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SuppressionPolicy;
    use std::sync::Arc;

    fn baseline() -> ParameterSet {
        ParameterSet {
            t_list: Arc::new(vec![0.0, 1.0]),
            suppression_policy: SuppressionPolicy::constant(1.0),
            n_population: 1000.0,
            e_initial: 0.0,
            a_initial: 0.0,
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
            beds_general: 100.0,
            beds_icu: 10.0,
            ventilators: 12.0,
        }
    }

    #[test]
    fn applies_known_fields_verbatim() {
        let overrides = OverrideSet::new([("R0", 2.0), ("beds_ICU", 42.0)]).unwrap();
        let mut params = baseline();
        overrides.apply(&mut params);
        assert_eq!(params.r0, 2.0);
        assert_eq!(params.beds_icu, 42.0);
        assert_eq!(params.mortality_rate, 0.01);
    }

    #[test]
    fn rejects_unknown_fields_at_construction() {
        let err = OverrideSet::new([("R0_typo", 2.0)]).unwrap_err();
        assert!(matches!(err, Error::UnknownOverride(name) if name == "R0_typo"));
    }

    #[test]
    fn capacity_lookup_covers_resource_compartments() {
        let params = baseline();
        assert_eq!(params.capacity_for("HGen"), Some(100.0));
        assert_eq!(params.capacity_for("HICU"), Some(10.0));
        assert_eq!(params.capacity_for("HVent"), Some(12.0));
        assert_eq!(params.capacity_for("I"), None);
    }
}
