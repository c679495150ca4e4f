//! # Best NSM Bin
//! Finds the historically best operating point per `(zone, time_block)`.
//!
//! Historical pricing rows are inner-joined with the cater-rate and
//! book-search rows on `(zone, time_block, date)`. `avg_nsm` is snapped to a
//! 0.05 grid (half-to-even rounding), the two components are averaged per
//! bin, and the bin with the highest composite score wins.
//!
//! Tie-break: candidates are listed in `(zone, time_block, bin)` ascending
//! order, then stably sorted by score descending; the first survives. Equal
//! scores therefore resolve to the lowest bin. Null scores sort last.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::queries::{BOOK_SEARCH_RATIO, FIRST_TRY_CATER_RATE};
use crate::score::CompositeWeights;
use crate::stats;
use crate::table::{MetricRow, ZoneBlock};

/// Pricing metric column in the pricing query.
pub const NSM_COLUMN: &str = "avg_nsm";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    pub bin_width: f64,
}

impl SelectionPolicy {
    pub const DEFAULT: Self = Self { bin_width: 0.05 };

    /// Integer bin index for a value (half-to-even, like numpy's `round`).
    pub fn bin_index(&self, value: f64) -> i64 {
        (value / self.bin_width).round_ties_even() as i64
    }

    pub fn bin_value(&self, index: i64) -> f64 {
        index as f64 * self.bin_width
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Mean component metrics and composite score of one bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinPerformance {
    pub zone: String,
    pub time_block: crate::time_block::TimeBlock,
    pub bin: i64,
    pub nsm_bin: f64,
    pub cater: Option<f64>,
    pub book_search: Option<f64>,
    pub score: Option<f64>,
}

type DatedKey = (String, crate::time_block::TimeBlock, NaiveDate);

fn index_by_date<'a>(rows: &'a [MetricRow]) -> BTreeMap<DatedKey, Vec<&'a MetricRow>> {
    let mut out: BTreeMap<DatedKey, Vec<&MetricRow>> = BTreeMap::new();
    for r in rows {
        if let Some(tb) = r.time_block {
            out.entry((r.zone.clone(), tb, r.date)).or_default().push(r);
        }
    }
    out
}

/// Per-bin performance for every historical `(zone, time_block)`, ordered by
/// `(zone, time_block, bin)`.
pub fn bin_performance(
    pricing: &[MetricRow],
    cater: &[MetricRow],
    book_search: &[MetricRow],
    reference: NaiveDate,
    policy: &SelectionPolicy,
    weights: &CompositeWeights,
) -> Vec<BinPerformance> {
    let cater_idx = index_by_date(cater);
    let bsr_idx = index_by_date(book_search);

    // (zone, block, bin) → joined (cater, bsr) observations
    let mut groups: BTreeMap<(ZoneBlock, i64), Vec<(Option<f64>, Option<f64>)>> = BTreeMap::new();
    for p in pricing.iter().filter(|r| r.date != reference) {
        let Some(tb) = p.time_block else { continue };
        let Some(nsm) = p.get(NSM_COLUMN) else { continue };
        let key = (p.zone.clone(), tb, p.date);
        let (Some(cs), Some(bs)) = (cater_idx.get(&key), bsr_idx.get(&key)) else {
            continue;
        };
        let bin = policy.bin_index(nsm);
        let slot = groups.entry(((p.zone.clone(), tb), bin)).or_default();
        for c in cs {
            for b in bs {
                slot.push((c.get(FIRST_TRY_CATER_RATE), b.get(BOOK_SEARCH_RATIO)));
            }
        }
    }

    groups
        .into_iter()
        .map(|(((zone, time_block), bin), obs)| {
            let cater = stats::mean(obs.iter().map(|(c, _)| *c));
            let book_search = stats::mean(obs.iter().map(|(_, b)| *b));
            BinPerformance {
                zone,
                time_block,
                bin,
                nsm_bin: policy.bin_value(bin),
                cater,
                book_search,
                score: weights.score_opt(cater, book_search),
            }
        })
        .collect()
}

/// Winning bin value per `(zone, time_block)`.
pub fn select_best(perf: &[BinPerformance]) -> BTreeMap<ZoneBlock, f64> {
    let mut ranked: Vec<&BinPerformance> = perf.iter().collect();
    ranked.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let mut best = BTreeMap::new();
    for p in ranked {
        best.entry((p.zone.clone(), p.time_block))
            .or_insert_with(|| {
                debug!(zone = %p.zone, block = %p.time_block, nsm = p.nsm_bin, score = ?p.score, "best bin");
                p.nsm_bin
            });
    }
    best
}

/// Convenience wrapper: performance table then selection.
pub fn recommended_nsm(
    pricing: &[MetricRow],
    cater: &[MetricRow],
    book_search: &[MetricRow],
    reference: NaiveDate,
) -> BTreeMap<ZoneBlock, f64> {
    let perf = bin_performance(
        pricing,
        cater,
        book_search,
        reference,
        &SelectionPolicy::DEFAULT,
        &CompositeWeights::DEFAULT,
    );
    select_best(&perf)
}
