use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};

use cyclestat::config::{load_request, load_run_info};
use cyclestat::data::loader::load_file;
use cyclestat::{plot_by_cycle, RunMetrics};

#[derive(Parser, Debug)]
#[command(author, version, about = "Per-cycle metric statistics as plot-ready JSON", long_about = None)]
struct Cli {
    /// Run description (reads, flowcell layout, channel names)
    #[arg(value_hint = ValueHint::FilePath)]
    run_info: PathBuf,

    /// Plot request: metric selector and filter options
    #[arg(value_hint = ValueHint::FilePath)]
    request: PathBuf,

    /// Metric records (.parquet, .json or .csv)
    #[arg(value_hint = ValueHint::FilePath)]
    records: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let request = load_request(&cli.request)?;
    let run = request.apply_to(load_run_info(&cli.run_info)?);
    let set = load_file(&cli.records, request.metric.family())?;

    let mut metrics = RunMetrics::new(run);
    metrics.insert(set);

    let data = plot_by_cycle(&metrics, request.metric, &request.filter)
        .with_context(|| format!("plotting {}", request.metric))?;
    if data.is_empty() {
        log::warn!("no {} values matched the filter ({})", request.metric, data.title);
    } else {
        log::info!("{}: {} series", data.title, data.len());
    }

    let json = serde_json::to_string_pretty(&data).context("serializing plot data")?;
    println!("{json}");
    Ok(())
}
