//! NSM Recommender: daily batch entrypoint.
//! Loads config, reads the query exports, computes recommendations, writes the
//! report artifact and posts the summary.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use nsm_recommender::source::CsvDirSource;
use nsm_recommender::{run_daily, telemetry, NotifierMux, RecommenderConfig, RunDates};

#[derive(Parser, Debug)]
#[command(name = "nsm-recommender", about = "Daily NSM recommendations per zone and time block")]
struct Args {
    /// Reference date (YYYY-MM-DD). Defaults to yesterday.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Config file (overrides $NSM_CONFIG_PATH and config/nsm.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory with `<query_id>_<date>.csv` exports.
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Parent directory for the report artifact.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Skip notifications; only write the report.
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(p) => RecommenderConfig::load_from(p)?,
        None => RecommenderConfig::load_default().context("loading config")?,
    };
    if let Some(dir) = args.input_dir {
        cfg.input_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        cfg.output_dir = dir;
    }

    let dates = match args.date {
        Some(d) => RunDates::for_reference(d),
        None => RunDates::ending_yesterday(Local::now().date_naive()),
    };
    info!(reference = %dates.reference, history = ?dates.history, "starting NSM run");

    let source = CsvDirSource::new(&cfg.input_dir);
    let notifier = if args.no_notify {
        NotifierMux::new()
    } else {
        NotifierMux::from_env()
    };

    let outcome = run_daily(&source, &dates, &cfg, &notifier).await?;
    let counts = outcome.recommendation.summary_counts();
    println!(
        "{}: {} increase, {} decrease, {} excluded → {}",
        dates.reference,
        counts.increase,
        counts.decrease,
        counts.excluded,
        outcome.artifact.display()
    );
    Ok(())
}
