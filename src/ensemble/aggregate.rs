//! Reduction of a completed ensemble into percentile bands, peak statistics
//! and capacity-surge windows.
use super::{CompartmentSummary, EnsembleSummary, SummaryValue};
use crate::error::{Error, Result};
use crate::model::ModelRun;
use crate::prelude::{Real, NAN};
use crate::utils::{argmax, column_percentiles, mean, percentile};
use ndarray::prelude::*;
use std::collections::BTreeMap;

/// Per-run surge bounds for one capacity-bound compartment. A NaN entry
/// means that run never exceeded its capacity; NaN propagates into the
/// summary (as JSON null) without raising.
#[derive(Debug, Clone, PartialEq)]
pub struct SurgeWindows {
    pub start: Vec<Real>,
    pub end: Vec<Real>,
    pub capacity: Vec<Real>,
}

/// Reduces a list of completed model runs, all sharing compartments and time
/// grid, into an [`EnsembleSummary`].
#[derive(Debug, Clone)]
pub struct EnsembleAggregator {
    percentiles: Vec<u8>,
}

impl EnsembleAggregator {
    pub fn new(percentiles: impl Into<Vec<u8>>) -> Self {
        EnsembleAggregator {
            percentiles: percentiles.into(),
        }
    }

    pub fn percentiles(&self) -> &[u8] {
        &self.percentiles
    }

    /// Full reduction: percentile bands per timestep, peak statistics across
    /// runs, and surge windows for the capacity-bound compartments.
    pub fn summarize(&self, runs: &[ModelRun]) -> Result<EnsembleSummary> {
        let stacks = self.stack_compartments(runs)?;
        let t_list: &[Real] = &runs[0].t_list;

        let mut summary = EnsembleSummary::default();
        for (compartment, stack) in &stacks {
            let mut out = CompartmentSummary::default();

            // Confidence band: each timestep reduced independently across
            // runs, so the band need not match any single trajectory.
            for &p in &self.percentiles {
                out.insert(
                    format!("ci_{}", p),
                    SummaryValue::series(column_percentiles(stack, p as Real)),
                );
            }

            for (key, value) in self.peak_stats(stack, t_list) {
                out.insert(key, value);
            }

            if runs[0].params.capacity_for(compartment).is_some() {
                let windows = self.surge_windows(runs, compartment)?;
                out.insert("surge_start", SummaryValue::series(windows.start));
                out.insert("surge_end", SummaryValue::series(windows.end));
                out.insert("capacity", SummaryValue::series(windows.capacity));
            }

            summary.compartments.insert(compartment.clone(), out);
        }
        Ok(summary)
    }

    /// Stack one compartment per run into a runs x timesteps matrix,
    /// verifying that every run carries the same compartments over the same
    /// grid. A run that crashed mid-simulation shows up here as a length
    /// mismatch and aborts the scenario instead of being silently dropped.
    pub fn stack_compartments(&self, runs: &[ModelRun]) -> Result<BTreeMap<String, Array2<Real>>> {
        if runs.is_empty() {
            return Err(Error::AggregationShape("empty ensemble".to_string()));
        }
        let steps = runs[0].t_list.len();
        let keys: Vec<&String> = runs[0].results.keys().collect();

        let mut stacks = BTreeMap::new();
        for key in keys {
            let mut stack = Array2::zeros((runs.len(), steps));
            for (row, run) in runs.iter().enumerate() {
                let series = run.results.get(key).ok_or_else(|| {
                    Error::AggregationShape(format!("run {} lacks compartment {}", row, key))
                })?;
                if series.len() != steps {
                    return Err(Error::AggregationShape(format!(
                        "compartment {} has {} steps in run {}, expected {}",
                        key,
                        series.len(),
                        row,
                        steps
                    )));
                }
                stack.row_mut(row).assign(&ArrayView::from(series.as_slice()));
            }
            stacks.insert(key.clone(), stack);
        }

        for (row, run) in runs.iter().enumerate() {
            if run.results.len() != stacks.len() {
                return Err(Error::AggregationShape(format!(
                    "run {} has {} compartments, expected {}",
                    row,
                    run.results.len(),
                    stacks.len()
                )));
            }
        }
        Ok(stacks)
    }

    /// Peak statistics across runs. Peak value and peak time percentiles are
    /// computed independently; they need not come from the same run.
    fn peak_stats(&self, stack: &Array2<Real>, t_list: &[Real]) -> Vec<(String, SummaryValue)> {
        let mut peak_times = Vec::with_capacity(stack.nrows());
        let mut peak_values = Vec::with_capacity(stack.nrows());
        for row in stack.rows() {
            let series = row.to_vec();
            let idx = argmax(&series);
            peak_times.push(t_list[idx]);
            peak_values.push(series[idx]);
        }

        let mut out = Vec::new();
        for &p in &self.percentiles {
            out.push((
                format!("peak_value_ci{}", p),
                SummaryValue::scalar(percentile(&peak_values, p as Real)),
            ));
            out.push((
                format!("peak_time_ci{}", p),
                SummaryValue::scalar(percentile(&peak_times, p as Real)),
            ));
        }
        out.push((
            "peak_value_mean".to_string(),
            SummaryValue::scalar(mean(&peak_values)),
        ));
        out
    }

    /// Per-run surge windows for one capacity-bound compartment: the first
    /// and last times the run's demand exceeds that run's capacity constant.
    /// The end bound is found by scanning the reversed series for its first
    /// exceedance.
    pub fn surge_windows(&self, runs: &[ModelRun], compartment: &str) -> Result<SurgeWindows> {
        let mut windows = SurgeWindows {
            start: Vec::with_capacity(runs.len()),
            end: Vec::with_capacity(runs.len()),
            capacity: Vec::with_capacity(runs.len()),
        };
        for (row, run) in runs.iter().enumerate() {
            let capacity = run.params.capacity_for(compartment).ok_or_else(|| {
                Error::AggregationShape(format!("{} has no capacity constant", compartment))
            })?;
            let series = run.compartment(compartment).ok_or_else(|| {
                Error::AggregationShape(format!("run {} lacks compartment {}", row, compartment))
            })?;

            let start = series
                .iter()
                .position(|v| *v > capacity)
                .map(|i| run.t_list[i])
                .unwrap_or(NAN);
            let end = series
                .iter()
                .rev()
                .position(|v| *v > capacity)
                .map(|i| run.t_list[run.t_list.len() - 1 - i])
                .unwrap_or(NAN);

            windows.start.push(start);
            windows.end.push(end);
            windows.capacity.push(capacity);
        }
        Ok(windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_fixtures::stub_run;
    use assert_approx_eq::assert_approx_eq;
    use std::sync::Arc;

    fn grid(values: &[Real]) -> Arc<Vec<Real>> {
        Arc::new(values.to_vec())
    }

    fn aggregator() -> EnsembleAggregator {
        EnsembleAggregator::new([5, 25, 50, 75, 95])
    }

    #[test]
    fn median_band_is_per_timestep() {
        let t = grid(&[0.0, 1.0, 2.0]);
        let runs = vec![
            stub_run(&t, &[("I", vec![1.0, 2.0, 3.0])], 100.0),
            stub_run(&t, &[("I", vec![2.0, 3.0, 4.0])], 100.0),
            stub_run(&t, &[("I", vec![3.0, 4.0, 5.0])], 100.0),
        ];
        let summary = aggregator().summarize(&runs).unwrap();
        let band = summary.compartments["I"].band(50).unwrap();
        assert_eq!(band, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn bands_are_monotone_in_percentile() {
        let t = grid(&[0.0, 1.0, 2.0, 3.0]);
        let runs = vec![
            stub_run(&t, &[("I", vec![5.0, 1.0, 4.0, 2.0])], 100.0),
            stub_run(&t, &[("I", vec![2.0, 6.0, 1.0, 8.0])], 100.0),
            stub_run(&t, &[("I", vec![7.0, 3.0, 9.0, 4.0])], 100.0),
            stub_run(&t, &[("I", vec![1.0, 9.0, 2.0, 6.0])], 100.0),
        ];
        let agg = aggregator();
        let summary = agg.summarize(&runs).unwrap();
        let compartment = &summary.compartments["I"];
        let mut previous: Option<Vec<Real>> = None;
        for &p in agg.percentiles() {
            let band = compartment.band(p).unwrap();
            if let Some(prev) = &previous {
                for (lo, hi) in prev.iter().zip(&band) {
                    assert!(lo <= hi, "band not monotone at p={}", p);
                }
            }
            previous = Some(band);
        }
    }

    #[test]
    fn single_run_degenerates_to_that_run() {
        let t = grid(&[0.0, 1.0, 2.0]);
        let runs = vec![stub_run(&t, &[("I", vec![1.0, 5.0, 2.0])], 100.0)];
        let summary = aggregator().summarize(&runs).unwrap();
        let compartment = &summary.compartments["I"];
        for &p in &[5, 50, 95] {
            assert_eq!(compartment.band(p).unwrap(), vec![1.0, 5.0, 2.0]);
            assert_eq!(compartment.peak_value(p).unwrap(), 5.0);
            assert_eq!(compartment.peak_time(p).unwrap(), 1.0);
        }
    }

    #[test]
    fn surge_window_single_exceedance() {
        let t = grid(&[0.0, 1.0, 2.0]);
        let runs = vec![stub_run(&t, &[("HGen", vec![1.0, 3.0, 1.0])], 2.0)];
        let windows = aggregator().surge_windows(&runs, "HGen").unwrap();
        assert_eq!(windows.start, vec![1.0]);
        assert_eq!(windows.end, vec![1.0]);
        assert_eq!(windows.capacity, vec![2.0]);
    }

    #[test]
    fn surge_window_never_exceeded_is_nan() {
        let t = grid(&[0.0, 1.0, 2.0]);
        let runs = vec![stub_run(&t, &[("HGen", vec![1.0, 1.5, 1.0])], 2.0)];
        let windows = aggregator().surge_windows(&runs, "HGen").unwrap();
        assert!(windows.start[0].is_nan());
        assert!(windows.end[0].is_nan());
        assert_eq!(windows.capacity, vec![2.0]);
    }

    #[test]
    fn surge_window_spans_first_to_last_exceedance() {
        let t = grid(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let runs = vec![stub_run(
            &t,
            &[("HGen", vec![1.0, 3.0, 1.0, 3.0, 1.0])],
            2.0,
        )];
        let windows = aggregator().surge_windows(&runs, "HGen").unwrap();
        assert_eq!(windows.start, vec![1.0]);
        assert_eq!(windows.end, vec![3.0]);
    }

    #[test]
    fn surge_start_and_end_are_distinct_summary_keys() {
        let t = grid(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let runs = vec![stub_run(
            &t,
            &[("HGen", vec![1.0, 3.0, 3.0, 3.0, 1.0])],
            2.0,
        )];
        let summary = aggregator().summarize(&runs).unwrap();
        let fields = &summary.compartments["HGen"].fields;
        let start = fields["surge_start"].series_nan().unwrap();
        let end = fields["surge_end"].series_nan().unwrap();
        assert_eq!(start, vec![1.0]);
        assert_eq!(end, vec![3.0]);
    }

    #[test]
    fn peak_percentiles_are_independent_across_runs() {
        let t = grid(&[0.0, 1.0, 2.0]);
        // Highest peak occurs earliest; medians of value and time therefore
        // come from different runs.
        let runs = vec![
            stub_run(&t, &[("I", vec![9.0, 1.0, 1.0])], 100.0),
            stub_run(&t, &[("I", vec![1.0, 5.0, 1.0])], 100.0),
            stub_run(&t, &[("I", vec![1.0, 1.0, 3.0])], 100.0),
        ];
        let summary = aggregator().summarize(&runs).unwrap();
        let compartment = &summary.compartments["I"];
        assert_approx_eq!(compartment.peak_value(50).unwrap(), 5.0, 1e-12);
        assert_approx_eq!(compartment.peak_time(50).unwrap(), 1.0, 1e-12);
        assert_approx_eq!(
            compartment.fields["peak_value_mean"].as_scalar().unwrap(),
            (9.0 + 5.0 + 3.0) / 3.0,
            1e-12
        );
    }

    #[test]
    fn mismatched_lengths_abort_aggregation() {
        let t = grid(&[0.0, 1.0, 2.0]);
        let short = stub_run(&t, &[("I", vec![1.0, 2.0])], 100.0);
        let runs = vec![stub_run(&t, &[("I", vec![1.0, 2.0, 3.0])], 100.0), short];
        assert!(matches!(
            aggregator().summarize(&runs),
            Err(Error::AggregationShape(_))
        ));
    }

    #[test]
    fn mismatched_keys_abort_aggregation() {
        let t = grid(&[0.0, 1.0]);
        let runs = vec![
            stub_run(&t, &[("I", vec![1.0, 2.0])], 100.0),
            stub_run(&t, &[("E", vec![1.0, 2.0])], 100.0),
        ];
        assert!(matches!(
            aggregator().summarize(&runs),
            Err(Error::AggregationShape(_))
        ));
    }

    #[test]
    fn summarize_is_idempotent_byte_for_byte() {
        let t = grid(&[0.0, 1.0, 2.0]);
        let runs = vec![
            stub_run(&t, &[("I", vec![1.0, 2.0, 3.0]), ("HGen", vec![0.5, 2.5, 0.5])], 2.0),
            stub_run(&t, &[("I", vec![2.0, 3.0, 4.0]), ("HGen", vec![0.5, 1.0, 0.5])], 2.0),
        ];
        let agg = aggregator();
        let a = serde_json::to_string(&agg.summarize(&runs).unwrap()).unwrap();
        let b = serde_json::to_string(&agg.summarize(&runs).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
