// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod decision;
pub mod engine;
pub mod stats;
pub mod table;
pub mod time_block;

// Recommendation stages (baseline, scores, best bin, noise filter, pipeline)
pub mod baseline;
pub mod best_bin;
pub mod filter;
pub mod pipeline;
pub mod score;

// I/O edges: fetch, report artifact, notifications
pub mod notify;
pub mod report;
pub mod source;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::{QueryCatalog, RecommenderConfig};
pub use crate::decision::{Action, Decision, Reason};
pub use crate::notify::{NotificationEvent, NotifierMux};
pub use crate::pipeline::{run_recommendation, Recommendation, RunDates, SummaryCounts};

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::report::ReportWriter;
use crate::source::QuerySource;

/// Outcome of one full batch run.
#[derive(Debug)]
pub struct RunOutcome {
    pub recommendation: Recommendation,
    pub artifact: PathBuf,
    pub delivered: usize,
}

/// Fetch → compute → write → notify, once.
///
/// Fetch and report errors are fatal; notification failures are only logged.
pub async fn run_daily<S: QuerySource + ?Sized>(
    source: &S,
    dates: &RunDates,
    cfg: &RecommenderConfig,
    notifier: &NotifierMux,
) -> Result<RunOutcome> {
    let results = source::fetch_all(source, &cfg.queries.ids(), &dates.all()).await?;
    let recommendation = run_recommendation(&results, dates.reference, &cfg.queries)?;

    let artifact = ReportWriter::new(&cfg.output_dir).write(&recommendation).await?;

    let ev = NotificationEvent::new(
        dates.reference,
        artifact.clone(),
        recommendation.summary_counts(),
    );
    let delivered = notifier.notify(&ev).await;
    info!(artifact = %artifact.display(), delivered, "daily run finished");

    Ok(RunOutcome {
        recommendation,
        artifact,
        delivered,
    })
}
