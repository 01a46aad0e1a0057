//! Report-rendering boundary.
//!
//! Rendering itself (charts, PDF) is an external collaborator; the core only
//! hands over the last scenario's model runs and the finished region
//! summary. Sinks are write-only side effects.
use crate::ensemble::RegionSummary;
use crate::error::Result;
use crate::model::ModelRun;
use log::info;

pub trait ReportSink: Sync {
    fn render(&self, fips: &str, runs: &[ModelRun], summary: &RegionSummary) -> Result<()>;
}

/// Discards the report. Useful when only the data artifact is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReport;

impl ReportSink for NoopReport {
    fn render(&self, _fips: &str, _runs: &[ModelRun], _summary: &RegionSummary) -> Result<()> {
        Ok(())
    }
}

/// Logs headline peak statistics instead of rendering a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReport;

impl ReportSink for LogReport {
    fn render(&self, fips: &str, runs: &[ModelRun], summary: &RegionSummary) -> Result<()> {
        info!(
            "region {}: {} scenarios, {} runs in final ensemble",
            fips,
            summary.policies.len(),
            runs.len()
        );
        for (label, ensemble) in &summary.policies {
            if let Some(compartment) = ensemble.compartments.get("HGen") {
                if let (Some(value), Some(time)) =
                    (compartment.peak_value(50), compartment.peak_time(50))
                {
                    info!(
                        "  {}: median general-bed peak {:.1} at day {:.0}",
                        label, value, time
                    );
                }
            }
        }
        Ok(())
    }
}
