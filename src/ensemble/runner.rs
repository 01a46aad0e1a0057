//! Top-level ensemble orchestration.
//!
//! For each suppression scenario the runner samples a parameter ensemble,
//! executes it through the model adapter, reduces it with the aggregator and
//! stores the result under the scenario's key. Runs within an ensemble are
//! independent and evaluated in parallel; regions are independent of each
//! other and driven in parallel by [`run_state`].
use super::{EnsembleAggregator, RegionSummary};
use crate::data::{MergedCounty, ReferenceData};
use crate::error::{Error, Result};
use crate::model::{EpidemicModel, ModelRun};
use crate::params::{OverrideSet, ParameterSampler};
use crate::policy::{PolicyFactory, Scenario};
use crate::prelude::Real;
use crate::report::ReportSink;
use crate::utils::linspace;
use chrono::Utc;
use getset::Getters;
use log::{error, info};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Ensemble execution settings shared across regions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub n_samples: usize,
    pub n_years: usize,
    pub i_initial: Real,
    pub scenarios: Vec<Scenario>,
    pub percentiles: Vec<u8>,
    pub output_dir: PathBuf,
    /// Fixed sampler seed; without it ensembles are not reproducible across
    /// invocations.
    pub seed: Option<u64>,
    #[serde(skip)]
    pub overrides: OverrideSet,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            n_samples: 250,
            n_years: 2,
            i_initial: 1.0,
            scenarios: vec![
                Scenario::Suppression(0.35),
                Scenario::Suppression(0.5),
                Scenario::Suppression(0.75),
                Scenario::Suppression(1.0),
            ],
            percentiles: vec![5, 25, 32, 50, 75, 68, 95],
            output_dir: PathBuf::from("output"),
            seed: None,
            overrides: OverrideSet::default(),
        }
    }
}

/// Runs the scenario loop for one region.
#[derive(Debug, Getters)]
pub struct EnsembleRunner {
    #[getset(get = "pub")]
    fips: String,
    #[getset(get = "pub")]
    county: MergedCounty,
    #[getset(get = "pub")]
    t_list: Arc<Vec<Real>>,
    config: RunnerConfig,
}

impl EnsembleRunner {
    /// Resolve the region against the reference tables and lay out the
    /// simulation grid. A missing region aborts here, before any sampling.
    pub fn new(fips: &str, reference: &ReferenceData, config: RunnerConfig) -> Result<Self> {
        let county = reference.merged_county(fips)?;
        let days = 365 * config.n_years;
        let t_list = Arc::new(linspace(0.0, days as Real, days));
        Ok(EnsembleRunner {
            fips: fips.to_string(),
            county,
            t_list,
            config,
        })
    }

    /// Execute every scenario, persist the region summary and hand the last
    /// scenario's runs to the report sink.
    pub fn run_ensemble(
        &self,
        model: &dyn EpidemicModel,
        policies: &dyn PolicyFactory,
        report: &dyn ReportSink,
    ) -> Result<RegionSummary> {
        let aggregator = EnsembleAggregator::new(self.config.percentiles.clone());
        let mut outputs = BTreeMap::new();
        // The final scenario's runs are reused for reporting; thread them
        // out of the loop explicitly instead of leaking a loop variable.
        let mut last_runs: Vec<ModelRun> = Vec::new();

        for (index, scenario) in self.config.scenarios.iter().enumerate() {
            info!("region {}: scenario {}", self.fips, scenario.label());
            let runs = self.run_scenario(model, policies, *scenario, index as u64)?;
            outputs.insert(scenario.label(), aggregator.summarize(&runs)?);
            last_runs = runs;
        }

        let summary = RegionSummary {
            fips: self.fips.clone(),
            state: self.county.metadata.state.clone(),
            county: self.county.metadata.county.clone(),
            generated: Utc::now().to_rfc3339(),
            n_samples: self.config.n_samples,
            n_years: self.config.n_years,
            t_list: self.t_list.as_ref().clone(),
            policies: outputs,
        };

        report.render(&self.fips, &last_runs, &summary)?;
        summary.write_json(self.output_path())?;
        Ok(summary)
    }

    /// Sample and execute one scenario's ensemble. Runs are embarrassingly
    /// parallel and order-insensitive; any run failure aborts the scenario.
    fn run_scenario(
        &self,
        model: &dyn EpidemicModel,
        policies: &dyn PolicyFactory,
        scenario: Scenario,
        scenario_index: u64,
    ) -> Result<Vec<ModelRun>> {
        let policy = policies.policy(&self.t_list, &self.fips, scenario)?;
        let mut sampler = ParameterSampler::with_county(
            self.county.clone(),
            self.t_list.clone(),
            self.config.i_initial,
            policy,
        )
        .with_overrides(self.config.overrides.clone());
        if let Some(seed) = self.config.seed {
            sampler = sampler.seed(seed.wrapping_add(scenario_index));
        }

        sampler
            .sample(self.config.n_samples)
            .into_par_iter()
            .map(|params| model.run(&params))
            .collect()
    }

    /// Per-region output path: `<out>/<state>/data/<state>__<county>__<fips>
    /// __ensemble_projections.json`. Whole-document overwrite per region.
    pub fn output_path(&self) -> PathBuf {
        let meta = &self.county.metadata;
        self.config
            .output_dir
            .join(&meta.state)
            .join("data")
            .join(format!(
                "{}__{}__{}__ensemble_projections.json",
                meta.state, meta.county, self.fips
            ))
    }
}

/// Drive every county of a state as an independent parallel task. Per-region
/// failures are logged and skipped; siblings are unaffected. Results come
/// back in no particular order.
pub fn run_state(
    state: &str,
    reference: &ReferenceData,
    config: &RunnerConfig,
    model: &dyn EpidemicModel,
    policies: &dyn PolicyFactory,
    report: &dyn ReportSink,
) -> Vec<(String, Result<RegionSummary>)> {
    let counties = reference.counties_in_state(state);
    info!("running {} counties for {}", counties.len(), state);

    counties
        .par_iter()
        .map(|county| {
            let fips = county.fips.clone();
            let result = EnsembleRunner::new(&fips, reference, config.clone())
                .and_then(|runner| runner.run_ensemble(model, policies, report));
            if let Err(err) = &result {
                error!("region {} failed: {}", fips, err);
            }
            (fips, result)
        })
        .collect()
}
