// src/telemetry.rs
//! Logging setup and run metrics.
//!
//! Metrics go through the `metrics` facade only. Without an installed
//! recorder every call is a no-op; a host process (or a test) may install one.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::decision::Action;

const DEFAULT_FILTER: &str = "nsm_recommender=info,warn";

/// Install the global subscriber. `NSM_LOG_JSON=1` switches to JSON lines.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("NSM_LOG_JSON").ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// One-time metrics registration (so series carry descriptions).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "nsm_candidates_total",
            "Candidate (zone, time block) pairs considered."
        );
        describe_counter!("nsm_decisions_total", "Decisions by action label.");
        describe_counter!(
            "nsm_filtered_total",
            "Small score-only changes dropped by the noise filter."
        );
        describe_gauge!(
            "nsm_run_last_reference_day",
            "Reference date of the last run, as days since the Unix epoch."
        );
    });
}

pub fn record_candidates(n: usize) {
    ensure_metrics_described();
    counter!("nsm_candidates_total").increment(n as u64);
}

pub fn record_decision(action: Action) {
    ensure_metrics_described();
    counter!("nsm_decisions_total", "action" => action.as_str()).increment(1);
}

pub fn record_filtered(n: usize) {
    ensure_metrics_described();
    counter!("nsm_filtered_total").increment(n as u64);
}

pub fn record_reference_day(date: chrono::NaiveDate) {
    ensure_metrics_described();
    let epoch = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH.date_naive();
    gauge!("nsm_run_last_reference_day").set((date - epoch).num_days() as f64);
}
