//! # Recommendation Pipeline
//! Query results → candidate pool → baseline → scores → best bin →
//! decisions → noise filter → summary + details.
//!
//! Synchronous and side-effect free apart from logs and metrics. Every stage
//! returns a new table.

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::baseline::{self, BaselineRow, BaselineTable, SUFFIX_4WK, SUFFIX_4WK_STD, SUFFIX_Y};
use crate::best_bin::{self, SelectionPolicy, NSM_COLUMN};
use crate::config::queries::{BOOK_SEARCH_RATIO, FIRST_TRY_CATER_RATE, MATCH_RATE, PRICING};
use crate::config::QueryCatalog;
use crate::decision::{Action, Decision};
use crate::engine::{self, DecisionInput, DecisionPolicy};
use crate::filter::{self, FilterPolicy};
use crate::score::{self, CompositeWeights, ScoreSet};
use crate::table::{MetricRow, QueryId, QueryResults};
use crate::telemetry;
use crate::time_block::TimeBlock;

/// Auxiliary surge reference carried into the summary.
pub const SURGE_LEVEL_COLUMN: &str = "avg_dynamic_surge_level";

/// Weeks of same-weekday history.
pub const HISTORY_WEEKS: i64 = 4;

/// Reference date plus the same weekday over the previous four weeks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDates {
    pub reference: NaiveDate,
    pub history: Vec<NaiveDate>,
}

impl RunDates {
    pub fn for_reference(reference: NaiveDate) -> Self {
        let history = (1..=HISTORY_WEEKS)
            .map(|w| reference - Duration::weeks(w))
            .collect();
        Self { reference, history }
    }

    /// Reference = the day before `today`.
    pub fn ending_yesterday(today: NaiveDate) -> Self {
        Self::for_reference(today - Duration::days(1))
    }

    /// History first, reference last.
    pub fn all(&self) -> Vec<NaiveDate> {
        let mut v = self.history.clone();
        v.push(self.reference);
        v
    }
}

/// All policy knobs of one run. Compiled defaults; tests may vary them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policies {
    pub top_zones: usize,
    pub weights: CompositeWeights,
    pub selection: SelectionPolicy,
    pub decision: DecisionPolicy,
    pub filter: FilterPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            top_zones: baseline::TOP_ZONES_PER_BLOCK,
            weights: CompositeWeights::DEFAULT,
            selection: SelectionPolicy::DEFAULT,
            decision: DecisionPolicy::DEFAULT,
            filter: FilterPolicy::DEFAULT,
        }
    }
}

/// Every computed column for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub zone: String,
    pub time_block: TimeBlock,
    /// Merged `_y`, `_4wk` and `_4wk_std` columns after back-fill.
    pub metrics: BTreeMap<String, Option<f64>>,
    pub scores: ScoreSet,
    /// Historically best NSM bin before the halfway step.
    pub best_nsm: Option<f64>,
    pub decision: Decision,
    pub delta_nsm: Option<f64>,
}

impl ComparisonRow {
    pub fn metric(&self, column: &str) -> Option<f64> {
        self.metrics.get(column).copied().flatten()
    }

    pub fn volume(&self) -> Option<f64> {
        self.metric(&format!("{}{SUFFIX_Y}", baseline::VOLUME_COLUMN))
    }
}

/// One line of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub zone: String,
    pub time_block: TimeBlock,
    pub old_nsm: Option<f64>,
    pub recommended_nsm: Option<f64>,
    pub delta_nsm: Option<f64>,
    pub avg_dynamic_surge_level_y: Option<f64>,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub increase: usize,
    pub decrease: usize,
    /// Detail rows that did not make it into the summary.
    pub excluded: usize,
}

/// Output of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub reference_date: NaiveDate,
    /// Column order of the merged metric columns.
    pub metric_columns: Vec<String>,
    /// Candidates surviving the noise filter, sorted by `(zone, time_block)`.
    pub details: Vec<ComparisonRow>,
    /// Actionable rows, sorted by `(zone, time_block)`.
    pub summary: Vec<SummaryRow>,
    /// Rows removed by the noise filter.
    pub filtered_out: usize,
}

impl Recommendation {
    pub fn summary_counts(&self) -> SummaryCounts {
        let count = |a: Action| self.summary.iter().filter(|r| r.action == a).count();
        SummaryCounts {
            increase: count(Action::Increase),
            decrease: count(Action::Decrease),
            excluded: self.details.len().saturating_sub(self.summary.len()),
        }
    }
}

fn required<'a>(
    typed: &'a BTreeMap<QueryId, Vec<MetricRow>>,
    catalog: &QueryCatalog,
    label: &str,
) -> Result<&'a [MetricRow]> {
    let id = catalog
        .id_of(label)
        .ok_or_else(|| anyhow!("no query id configured for {label}"))?;
    typed
        .get(&id)
        .map(Vec::as_slice)
        .ok_or_else(|| anyhow!("missing result table for {label} (query {id})"))
}

/// Map the merged columns of one row to the decision engine's inputs.
fn decision_input(row: &BaselineRow, best: Option<f64>) -> DecisionInput {
    let col = |metric: &str, suffix: &str| row.get(&format!("{metric}{suffix}"));
    DecisionInput {
        current_nsm: col(NSM_COLUMN, SUFFIX_Y),
        recommended_nsm: best,
        volume: col(baseline::VOLUME_COLUMN, SUFFIX_Y),
        cater_y: col(FIRST_TRY_CATER_RATE, SUFFIX_Y),
        cater_4wk: col(FIRST_TRY_CATER_RATE, SUFFIX_4WK),
        cater_4wk_std: col(FIRST_TRY_CATER_RATE, SUFFIX_4WK_STD),
        bsr_y: col(BOOK_SEARCH_RATIO, SUFFIX_Y),
        bsr_4wk: col(BOOK_SEARCH_RATIO, SUFFIX_4WK),
        bsr_4wk_std: col(BOOK_SEARCH_RATIO, SUFFIX_4WK_STD),
    }
}

/// Run with the compiled policies.
pub fn run_recommendation(
    results: &QueryResults,
    reference: NaiveDate,
    catalog: &QueryCatalog,
) -> Result<Recommendation> {
    run_with_policies(results, reference, catalog, &Policies::default())
}

pub fn run_with_policies(
    results: &QueryResults,
    reference: NaiveDate,
    catalog: &QueryCatalog,
    policies: &Policies,
) -> Result<Recommendation> {
    let typed: BTreeMap<QueryId, Vec<MetricRow>> = results
        .iter()
        .map(|(id, t)| (*id, t.metric_rows()))
        .collect();

    for label in [MATCH_RATE, PRICING, FIRST_TRY_CATER_RATE, BOOK_SEARCH_RATIO] {
        required(&typed, catalog, label)?;
    }

    // 1) Candidate pool
    let pool = baseline::candidate_pool(
        required(&typed, catalog, MATCH_RATE)?,
        reference,
        policies.top_zones,
    );
    info!(%reference, candidates = pool.len(), "candidate pool built");
    telemetry::record_candidates(pool.len());

    // 2) Per-metric aggregation, merged left onto the pool
    let mut table = BaselineTable::from_pool(&pool);
    for (label, id) in catalog.iter() {
        let Some(query) = results.get(&id) else {
            warn!(label, query_id = id, "no result table; columns stay absent");
            continue;
        };
        let rows = typed.get(&id).map(Vec::as_slice).unwrap_or_default();
        let agg = baseline::aggregate_metric(
            rows,
            reference,
            &query.numeric_columns(),
            catalog.std_columns(label),
        );
        debug!(label, columns = agg.columns.len(), keys = agg.values.len(), "aggregated");
        table = table.merge(&agg);
    }

    // 3) Median back-fill, block then global
    let table = table.backfilled();

    // 4) Best historical bin
    let perf = best_bin::bin_performance(
        required(&typed, catalog, PRICING)?,
        required(&typed, catalog, FIRST_TRY_CATER_RATE)?,
        required(&typed, catalog, BOOK_SEARCH_RATIO)?,
        reference,
        &policies.selection,
        &policies.weights,
    );
    let best = best_bin::select_best(&perf);

    // 5) Scores + decisions
    let mut all: Vec<ComparisonRow> = table
        .rows
        .iter()
        .map(|row| {
            let best_nsm = best.get(&(row.zone.clone(), row.time_block)).copied();
            let scores = score::score_row(row, &policies.weights);
            let decision = engine::decide(
                &decision_input(row, best_nsm),
                &policies.decision,
                &policies.weights,
            );
            debug!(
                zone = %row.zone,
                block = %row.time_block,
                action = %decision.action,
                reason = %decision.reason,
                "decision"
            );
            telemetry::record_decision(decision.action);
            ComparisonRow {
                zone: row.zone.clone(),
                time_block: row.time_block,
                metrics: row.columns.clone(),
                scores,
                best_nsm,
                delta_nsm: decision.delta(),
                decision,
            }
        })
        .collect();

    // 6) Noise filter
    let before = all.len();
    all.retain(|r| !filter::is_noise(&r.decision, &policies.filter));
    let filtered_out = before - all.len();
    telemetry::record_filtered(filtered_out);

    all.sort_by(|a, b| (&a.zone, a.time_block).cmp(&(&b.zone, b.time_block)));

    // 7) Summary
    let summary: Vec<SummaryRow> = all
        .iter()
        .filter(|r| filter::in_summary(&r.decision, r.volume(), &policies.filter))
        .map(|r| SummaryRow {
            zone: r.zone.clone(),
            time_block: r.time_block,
            old_nsm: r.decision.old_nsm,
            recommended_nsm: r.decision.recommended_nsm,
            delta_nsm: r.delta_nsm,
            avg_dynamic_surge_level_y: r.metric(&format!("{SURGE_LEVEL_COLUMN}{SUFFIX_Y}")),
            action: r.decision.action,
        })
        .collect();

    telemetry::record_reference_day(reference);
    info!(
        %reference,
        details = all.len(),
        summary = summary.len(),
        filtered_out,
        "recommendation computed"
    );

    Ok(Recommendation {
        reference_date: reference,
        metric_columns: table.columns,
        details: all,
        summary,
        filtered_out,
    })
}
