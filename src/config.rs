//! TOML run configuration for the batch driver.
use crate::ensemble::RunnerConfig;
use crate::error::Result;
use crate::fit::StartTimeFitter;
use crate::impute::StartTimeImputer;
use crate::prelude::Real;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// State whose counties are fit, imputed and projected.
    pub state: String,
    pub county_metadata: PathBuf,
    pub hospital_data: PathBuf,
    pub case_data: PathBuf,
    /// Case count whose crossing defines a region's start date.
    pub t0_case_count: Real,
    pub min_days_required: usize,
    pub k_folds: usize,
    /// Calendar day (since the imputation anchor) interventions begin.
    pub intervention_day: Real,
    pub rollout_days: Real,
    pub runner: RunnerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            state: "California".to_string(),
            county_metadata: PathBuf::from("data/county_metadata.csv"),
            hospital_data: PathBuf::from("data/hospital_beds.csv"),
            case_data: PathBuf::from("data/county_cases.csv"),
            t0_case_count: 1.0,
            min_days_required: 5,
            k_folds: 4,
            intervention_day: 75.0,
            rollout_days: 14.0,
            runner: RunnerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(toml::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn fitter(&self) -> StartTimeFitter {
        StartTimeFitter {
            t0_case_count: self.t0_case_count,
            min_days_required: self.min_days_required,
            ..StartTimeFitter::default()
        }
    }

    pub fn imputer(&self) -> StartTimeImputer {
        StartTimeImputer {
            k_folds: self.k_folds,
            seed: self.runner.seed.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Scenario;

    #[test]
    fn parses_a_minimal_config() {
        let config: AppConfig = toml::from_str(
            r#"
            state = "Washington"
            t0_case_count = 5.0

            [runner]
            n_samples = 50
            scenarios = [0.35, 0.75, "no_intervention"]
            "#,
        )
        .unwrap();
        assert_eq!(config.state, "Washington");
        assert_eq!(config.t0_case_count, 5.0);
        assert_eq!(config.runner.n_samples, 50);
        assert_eq!(config.runner.scenarios[2], Scenario::NoIntervention);
        // Unset fields keep their defaults.
        assert_eq!(config.min_days_required, 5);
        assert_eq!(config.runner.n_years, 2);
    }
}
