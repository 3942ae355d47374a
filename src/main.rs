//! Survival Forecast CLI
//!
//! Trains a hazard curve from historical segments and forecasts every
//! segment found in the actuals file.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;

use survival_forecast::io::{load_config, load_observations, write_curve_csv, write_forecast_csv};
use survival_forecast::segment::group_segments;
use survival_forecast::{ModelConfig, SegmentRequest, SurvivalModel};

#[derive(Parser, Debug)]
#[command(name = "survival_forecast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Historical segment performance used to train the curve (CSV)
    #[arg(long)]
    history: PathBuf,

    /// Actuals for the segments to forecast (CSV)
    #[arg(long)]
    actuals: PathBuf,

    /// Origination amount; defaults to each segment's month-0 beginning balance
    #[arg(long)]
    origination: Option<f64>,

    /// Last month on book to forecast
    #[arg(long, default_value_t = 60)]
    max_month: u32,

    /// Model config (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Forecast output (CSV)
    #[arg(long, default_value = "forecast_output.csv")]
    output: PathBuf,

    /// Also write the trained curve (CSV)
    #[arg(long)]
    curve_output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Survival Forecast v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let config = match &cli.config {
        Some(path) => load_config(path).with_context(|| format!("loading config {}", path.display()))?,
        None => ModelConfig::default(),
    };
    let model = SurvivalModel::new(config).context("invalid model config")?;

    let history = load_observations(&cli.history)
        .with_context(|| format!("reading history {}", cli.history.display()))?;
    let (curve, summary) = model.train(&history).context("training hazard curve")?;

    println!("Trained curve {}:", curve.version());
    println!("  Segments: {}", summary.segments_processed);
    println!("  Records: {}", summary.records_used);
    println!("  Max month observed: {}", summary.max_month_observed);
    println!("  Total volume: ${:.2}", summary.total_volume);
    println!("  Low-confidence ages: {}", summary.low_confidence_ages);
    println!();

    if let Some(path) = &cli.curve_output {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_curve_csv(file, &curve).context("writing curve")?;
        println!("Curve written to: {}\n", path.display());
    }

    let actuals = load_observations(&cli.actuals)
        .with_context(|| format!("reading actuals {}", cli.actuals.display()))?;

    let mut requests = Vec::new();
    for segment in group_segments(&actuals) {
        let origination = cli
            .origination
            .or_else(|| segment.origination_amount())
            .with_context(|| {
                format!(
                    "segment '{}' has no month-0 record; pass --origination",
                    segment.segment_id
                )
            })?;
        requests.push(SegmentRequest::from_segment(segment, origination, cli.max_month));
    }

    let mut forecasts = Vec::with_capacity(requests.len());
    for (request, result) in requests.iter().zip(model.forecast_batch(&curve, &requests)) {
        forecasts.push(result.with_context(|| format!("forecasting segment '{}'", request.segment_id))?);
    }

    println!(
        "{:<24} {:>6} {:>6} {:>14} {:>14} {:>14} {:>8} {:>5}",
        "Segment", "Actual", "Months", "Payments", "Charge-offs", "Final Bal", "Loss %", "Sig"
    );
    println!("{}", "-".repeat(100));
    for f in &forecasts {
        let s = f.forecast.summary();
        let v = f.variance_report.summary();
        println!(
            "{:<24} {:>6} {:>6} {:>14.2} {:>14.2} {:>14.2} {:>8.3} {:>5}",
            f.forecast.segment_id,
            s.actual_months,
            s.total_months,
            s.total_payments,
            s.total_chargeoffs,
            s.final_balance,
            s.cumulative_loss_rate * 100.0,
            v.significant_count
        );
    }

    let results: Vec<_> = forecasts.into_iter().map(|f| f.forecast).collect();
    let file = File::create(&cli.output).with_context(|| format!("creating {}", cli.output.display()))?;
    write_forecast_csv(file, &results).context("writing forecast")?;

    println!("\nFull results written to: {}", cli.output.display());

    Ok(())
}
