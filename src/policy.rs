//! Suppression-policy scenarios and the factory that turns a scenario into a
//! time-varying transmission multiplier.
use crate::prelude::{Real, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One suppression scenario: either a future transmission reduction factor
/// or the explicit no-intervention sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scenario {
    NoIntervention,
    Suppression(Real),
}

impl Scenario {
    /// Key used for this scenario in the persisted region summary.
    pub fn label(&self) -> String {
        format!("suppression_policy__{}", self.value_label())
    }

    fn value_label(&self) -> String {
        match self {
            Scenario::NoIntervention => "no_intervention".to_string(),
            Scenario::Suppression(v) => format!("{}", v),
        }
    }

    /// The multiplicative factor transmission settles at once the policy is
    /// fully rolled out. No intervention leaves transmission untouched.
    pub fn future_suppression(&self) -> Real {
        match self {
            Scenario::NoIntervention => 1.0,
            Scenario::Suppression(v) => *v,
        }
    }
}

impl Serialize for Scenario {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scenario::NoIntervention => serializer.serialize_str("no_intervention"),
            Scenario::Suppression(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for Scenario {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(Real),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(v) => Ok(Scenario::Suppression(v)),
            Raw::Str(s) if s == "no_intervention" => Ok(Scenario::NoIntervention),
            Raw::Str(s) => Err(D::Error::custom(format!("unknown scenario `{}`", s))),
        }
    }
}

/// A time-varying multiplicative factor on transmission. Shared by every run
/// of an ensemble, so it is reference counted rather than cloned per draw.
#[derive(Clone)]
pub struct SuppressionPolicy(Arc<dyn Fn(Real) -> Real + Send + Sync>);

impl SuppressionPolicy {
    pub fn from_fn(f: impl Fn(Real) -> Real + Send + Sync + 'static) -> Self {
        SuppressionPolicy(Arc::new(f))
    }

    /// A policy that applies the same factor at every time.
    pub fn constant(factor: Real) -> Self {
        Self::from_fn(move |_| factor)
    }

    pub fn at(&self, t: Real) -> Real {
        (self.0)(t)
    }
}

impl fmt::Debug for SuppressionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SuppressionPolicy(..)")
    }
}

/// Builds the suppression policy for one region and scenario over the shared
/// time grid. The orchestrator treats this as an opaque collaborator.
pub trait PolicyFactory: Sync {
    fn policy(&self, t_list: &[Real], fips: &str, scenario: Scenario) -> Result<SuppressionPolicy>;
}

/// Default factory: no reduction before the region's inferred outbreak start,
/// then a linear ramp from 1.0 down to the scenario's future suppression over
/// a fixed rollout period.
#[derive(Debug, Clone)]
pub struct RampPolicyFactory {
    /// Day offset (on the simulation grid) at which interventions begin.
    pub policy_start: Real,
    /// Days over which the reduction ramps in.
    pub rollout_days: Real,
}

impl Default for RampPolicyFactory {
    fn default() -> Self {
        RampPolicyFactory {
            policy_start: 0.0,
            rollout_days: 14.0,
        }
    }
}

impl PolicyFactory for RampPolicyFactory {
    fn policy(
        &self,
        _t_list: &[Real],
        _fips: &str,
        scenario: Scenario,
    ) -> Result<SuppressionPolicy> {
        let target = scenario.future_suppression();
        let start = self.policy_start;
        let rollout = self.rollout_days.max(1.0);
        Ok(SuppressionPolicy::from_fn(move |t| {
            if t <= start {
                1.0
            } else {
                let frac = ((t - start) / rollout).min(1.0);
                1.0 + frac * (target - 1.0)
            }
        }))
    }
}

/// Factory that aligns each region's ramp to its inferred outbreak start:
/// simulation day 0 is the region's start date, so a shared intervention
/// calendar day lands on a different simulation day per region.
#[derive(Debug, Clone)]
pub struct StartAlignedPolicyFactory {
    /// Days since the imputation anchor, per region.
    starts: BTreeMap<String, Real>,
    /// Calendar day (since the same anchor) interventions begin.
    pub intervention_day: Real,
    pub rollout_days: Real,
}

impl StartAlignedPolicyFactory {
    pub fn new(starts: BTreeMap<String, Real>, intervention_day: Real, rollout_days: Real) -> Self {
        StartAlignedPolicyFactory {
            starts,
            intervention_day,
            rollout_days,
        }
    }

    /// Build from the combined start-time table produced by the imputer.
    pub fn from_table(
        rows: &[crate::impute::ImputedRow],
        intervention_day: Real,
        rollout_days: Real,
    ) -> Self {
        let starts = rows
            .iter()
            .map(|r| (r.fips.clone(), r.days_from_anchor))
            .collect();
        Self::new(starts, intervention_day, rollout_days)
    }
}

impl PolicyFactory for StartAlignedPolicyFactory {
    fn policy(&self, t_list: &[Real], fips: &str, scenario: Scenario) -> Result<SuppressionPolicy> {
        // Regions that started before the intervention date see the ramp
        // begin mid-simulation; later regions are suppressed from day 0.
        let start = self.starts.get(fips).copied().unwrap_or(0.0);
        let ramp = RampPolicyFactory {
            policy_start: (self.intervention_day - start).max(0.0),
            rollout_days: self.rollout_days,
        };
        ramp.policy(t_list, fips, scenario)
    }
}
