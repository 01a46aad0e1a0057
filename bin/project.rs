use epicast::config::AppConfig;
use epicast::ensemble::run_state;
use epicast::fit::fit_state_start_times;
use epicast::impute::{write_start_time_table, RegionFeatureRow};
use epicast::models::SeirModel;
use epicast::prelude::*;
use epicast::report::LogReport;
use log::{error, info};
use simple_logger::SimpleLogger;

pub fn main() {
    SimpleLogger::new().init().unwrap();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    if let Err(err) = run(&config_path) {
        error!("projection run failed: {}", err);
        std::process::exit(1);
    }
}

fn run(config_path: &str) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let reference = ReferenceData::load(
        &config.county_metadata,
        &config.hospital_data,
        &config.case_data,
    )?;

    info!("inferring start times for {}", config.state);
    let fits = fit_state_start_times(&config.state, &reference, &config.fitter());
    let rows = RegionFeatureRow::collect(&reference, &fits)?;
    let table = config.imputer().impute(&rows)?;
    write_start_time_table(&table, &config.runner.output_dir, &config.state)?;

    let policies = StartAlignedPolicyFactory::from_table(
        &table,
        config.intervention_day,
        config.rollout_days,
    );

    info!("running ensembles for {}", config.state);
    let results = run_state(
        &config.state,
        &reference,
        &config.runner,
        &SeirModel,
        &policies,
        &LogReport,
    );

    let failures = results.iter().filter(|(_, r)| r.is_err()).count();
    info!(
        "finished: {} regions projected, {} failed",
        results.len() - failures,
        failures
    );
    Ok(())
}
