use super::{cross_val_r2, BayesianRidge, LinearRegression, RandomForestRegression, Regressor};
use crate::data::ReferenceData;
use crate::error::{Error, Result};
use crate::fit::RegionFit;
use crate::prelude::Real;
use crate::utils::mean;
use chrono::{Duration, NaiveDate};
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Per-region predictors joined with the fit outcome, the training or
/// prediction row of the imputation regression.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeatureRow {
    pub fips: String,
    pub state: String,
    pub county: String,
    pub population_density: Real,
    pub housing_density: Real,
    pub total_population: Real,
    pub fit: Option<crate::fit::FitResult>,
}

impl RegionFeatureRow {
    /// Join fit outcomes onto region features. Regions missing from the
    /// metadata table are a hard error; the fits were produced from that
    /// same table.
    pub fn collect(reference: &ReferenceData, fits: &[RegionFit]) -> Result<Vec<Self>> {
        fits.iter()
            .map(|region| {
                let meta = reference.county(&region.fips)?;
                Ok(RegionFeatureRow {
                    fips: region.fips.clone(),
                    state: meta.state.clone(),
                    county: meta.county.clone(),
                    population_density: meta.population_density,
                    housing_density: meta.housing_density,
                    total_population: meta.total_population,
                    fit: region.fit.clone(),
                })
            })
            .collect()
    }

    fn features(&self) -> [Real; 3] {
        [
            ln_positive(self.population_density),
            ln_positive(self.housing_density),
            ln_positive(self.total_population),
        ]
    }
}

fn ln_positive(v: Real) -> Real {
    v.max(1e-9).ln()
}

/// One row of the combined per-region start-time table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputedRow {
    pub fips: String,
    pub state: String,
    pub county: String,
    pub t0_date: NaiveDate,
    pub days_from_anchor: Real,
    pub imputed: bool,
    /// ln 2 x fitted growth timescale; absent for imputed rows.
    pub doubling_time_days: Option<Real>,
    pub reduced_chi2: Option<Real>,
}

/// Imputes start dates for regions without a valid fit, from a regression
/// trained on the regions that have one.
#[derive(Debug, Clone)]
pub struct StartTimeImputer {
    pub k_folds: usize,
    pub seed: u64,
}

impl Default for StartTimeImputer {
    fn default() -> Self {
        StartTimeImputer { k_folds: 4, seed: 0 }
    }
}

impl StartTimeImputer {
    /// Reference day zero for the days-since-anchor target.
    pub fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid anchor date")
    }

    /// Produce the combined table: real fits pass through, missing regions
    /// get a predicted start date and an `imputed` flag.
    pub fn impute(&self, rows: &[RegionFeatureRow]) -> Result<Vec<ImputedRow>> {
        let anchor = Self::anchor();
        let fitted: Vec<&RegionFeatureRow> = rows.iter().filter(|r| r.fit.is_some()).collect();
        let missing: Vec<&RegionFeatureRow> = rows.iter().filter(|r| r.fit.is_none()).collect();

        if fitted.is_empty() {
            return Err(Error::Regression(
                "no regions with a valid start-time fit".to_string(),
            ));
        }

        let x = feature_matrix(&fitted);
        let y = DVector::from_iterator(
            fitted.len(),
            fitted.iter().map(|r| {
                let fit = r.fit.as_ref().expect("filtered to fitted rows");
                (fit.t0_date - anchor).num_days() as Real
            }),
        );

        self.report_cv_scores(&x, &y);

        // Fixed policy: the Bayesian ridge is always the production model,
        // regardless of the CV ranking above.
        let mut model = BayesianRidge::new();
        model.fit(&x, &y)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &fitted {
            let fit = row.fit.as_ref().expect("filtered to fitted rows");
            out.push(ImputedRow {
                fips: row.fips.clone(),
                state: row.state.clone(),
                county: row.county.clone(),
                t0_date: fit.t0_date,
                days_from_anchor: (fit.t0_date - anchor).num_days() as Real,
                imputed: false,
                doubling_time_days: Some(2.0f64.ln() * fit.scale),
                reduced_chi2: Some(fit.reduced_chi2),
            });
        }

        if !missing.is_empty() {
            let predictions = model.predict(&feature_matrix(&missing));
            for (row, days) in missing.iter().zip(predictions.iter()) {
                out.push(ImputedRow {
                    fips: row.fips.clone(),
                    state: row.state.clone(),
                    county: row.county.clone(),
                    t0_date: anchor + Duration::days(days.round() as i64),
                    days_from_anchor: *days,
                    imputed: true,
                    doubling_time_days: None,
                    reduced_chi2: None,
                });
            }
        }

        out.sort_by(|a, b| a.fips.cmp(&b.fips));
        Ok(out)
    }

    /// Cross-validate the candidate estimators for diagnostics. Too few
    /// fitted regions simply skips the report.
    fn report_cv_scores(&self, x: &DMatrix<Real>, y: &DVector<Real>) {
        if x.nrows() < self.k_folds {
            info!(
                "skipping estimator cross-validation: only {} fitted regions",
                x.nrows()
            );
            return;
        }
        let seed = self.seed;
        let candidates: Vec<(&str, Box<dyn Fn() -> Box<dyn Regressor>>)> = vec![
            ("LinearRegression", Box::new(|| Box::new(LinearRegression::new()))),
            (
                "RandomForestRegression",
                Box::new(move || Box::new(RandomForestRegression::seeded(seed))),
            ),
            ("BayesianRidge", Box::new(|| Box::new(BayesianRidge::new()))),
        ];
        for (name, make) in candidates {
            match cross_val_r2(make, x, y, self.k_folds, self.seed) {
                Ok(scores) => info!("{} CV r2: {:.4}", name, mean(&scores)),
                Err(err) => info!("{} CV failed: {}", name, err),
            }
        }
    }
}

fn feature_matrix(rows: &[&RegionFeatureRow]) -> DMatrix<Real> {
    DMatrix::from_fn(rows.len(), 3, |i, j| rows[i].features()[j])
}

/// Persist the combined table as the per-state tabular artifact:
/// `<out>/<state>/data/summary__<state>__imputed_start_times.csv`.
pub fn write_start_time_table(
    rows: &[ImputedRow],
    output_dir: &Path,
    state: &str,
) -> Result<std::path::PathBuf> {
    let dir = output_dir.join(state).join("data");
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("summary__{}__imputed_start_times.csv", state));
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FitResult;

    fn feature_row(fips: &str, density: Real, fit_day: Option<i64>) -> RegionFeatureRow {
        RegionFeatureRow {
            fips: fips.to_string(),
            state: "California".into(),
            county: format!("County {}", fips),
            population_density: density,
            housing_density: density / 2.5,
            total_population: density * 3000.0,
            fit: fit_day.map(|day| FitResult {
                norm: 1.0,
                t0_param: 0.0,
                scale: 1.5,
                reduced_chi2: 0.2,
                t0_days: day as Real,
                t0_date: StartTimeImputer::anchor() + Duration::days(day),
            }),
        }
    }

    /// Denser regions start earlier; the pattern the regression should pick
    /// up.
    fn training_rows() -> Vec<RegionFeatureRow> {
        let mut rows = Vec::new();
        for (i, density) in [4000.0, 2000.0, 1000.0, 500.0, 250.0, 125.0, 60.0, 30.0]
            .iter()
            .enumerate()
        {
            let day = 50 + 5 * i as i64;
            rows.push(feature_row(&format!("0600{}", i), *density, Some(day)));
        }
        rows
    }

    #[test]
    fn fitted_rows_pass_through_with_doubling_time() {
        let rows = training_rows();
        let table = StartTimeImputer::default().impute(&rows).unwrap();
        assert_eq!(table.len(), rows.len());
        for row in &table {
            assert!(!row.imputed);
            let doubling = row.doubling_time_days.unwrap();
            assert!((doubling - 2.0f64.ln() * 1.5).abs() < 1e-12);
        }
    }

    #[test]
    fn missing_rows_are_imputed_within_the_training_range() {
        let mut rows = training_rows();
        rows.push(feature_row("06098", 800.0, None));
        rows.push(feature_row("06099", 45.0, None));

        let table = StartTimeImputer::default().impute(&rows).unwrap();
        let imputed: Vec<&ImputedRow> = table.iter().filter(|r| r.imputed).collect();
        assert_eq!(imputed.len(), 2);
        for row in &imputed {
            assert!(row.doubling_time_days.is_none());
            assert!(row.days_from_anchor > 40.0 && row.days_from_anchor < 100.0);
            assert_eq!(
                row.t0_date,
                StartTimeImputer::anchor() + Duration::days(row.days_from_anchor.round() as i64)
            );
        }
        // Denser region should be imputed earlier.
        let dense = imputed.iter().find(|r| r.fips == "06098").unwrap();
        let sparse = imputed.iter().find(|r| r.fips == "06099").unwrap();
        assert!(dense.days_from_anchor < sparse.days_from_anchor);
    }

    #[test]
    fn no_fitted_regions_is_an_error() {
        let rows = vec![feature_row("06001", 100.0, None)];
        assert!(matches!(
            StartTimeImputer::default().impute(&rows),
            Err(Error::Regression(_))
        ));
    }

    #[test]
    fn table_round_trips_through_csv() {
        let mut rows = training_rows();
        rows.push(feature_row("06098", 800.0, None));
        let table = StartTimeImputer::default().impute(&rows).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_start_time_table(&table, dir.path(), "California").unwrap();
        let mut reader = csv::Reader::from_path(path).unwrap();
        let reloaded: Vec<ImputedRow> = reader
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(reloaded, table);
    }
}
