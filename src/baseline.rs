//! # Historical Baseline
//! Builds the per-(zone, time block) comparison frame.
//!
//! 1. Candidate pool: per time block, the top zones by reference-day bookings.
//! 2. For each metric table: reference-day means (`_y`), historical means
//!    (`_4wk`) and, for the z-score metrics, historical sample std (`_4wk_std`),
//!    left-joined onto the pool.
//! 3. Median back-fill of every historical column, block median first and
//!    global median second, as two separate passes.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::stats;
use crate::table::{MetricRow, ZoneBlock};
use crate::time_block::TimeBlock;

pub const SUFFIX_Y: &str = "_y";
pub const SUFFIX_4WK: &str = "_4wk";
pub const SUFFIX_4WK_STD: &str = "_4wk_std";

/// Column used to rank zones inside a time block.
pub const VOLUME_COLUMN: &str = "unique_bookings";

/// Zones kept per time block.
pub const TOP_ZONES_PER_BLOCK: usize = 15;

/// Reference-day top zones per time block, in `(time_block asc, volume desc)`
/// order, duplicates removed. Rows without a parseable time block are ignored;
/// rows with null volume rank last.
pub fn candidate_pool(rows: &[MetricRow], reference: NaiveDate, top_n: usize) -> Vec<ZoneBlock> {
    let mut day: Vec<(&MetricRow, TimeBlock)> = rows
        .iter()
        .filter(|r| r.date == reference)
        .filter_map(|r| r.time_block.map(|tb| (r, tb)))
        .collect();

    // Stable: ties keep input order.
    day.sort_by(|(a, ta), (b, tb)| {
        ta.cmp(tb).then_with(|| {
            match (a.get(VOLUME_COLUMN), b.get(VOLUME_COLUMN)) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        })
    });

    let mut taken: BTreeMap<TimeBlock, usize> = BTreeMap::new();
    let mut seen: HashSet<ZoneBlock> = HashSet::new();
    let mut pool = Vec::new();
    for (row, tb) in day {
        let n = taken.entry(tb).or_default();
        if *n >= top_n {
            continue;
        }
        *n += 1;
        let key = (row.zone.clone(), tb);
        if seen.insert(key.clone()) {
            pool.push(key);
        }
    }
    pool
}

/// Suffixed aggregates of one metric table, keyed by `(zone, time_block)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricAggregate {
    /// Every column this aggregate contributes, in output order.
    pub columns: Vec<String>,
    pub values: BTreeMap<ZoneBlock, BTreeMap<String, Option<f64>>>,
}

/// Split rows into reference-day and historical partitions and reduce both.
///
/// `metric_columns` are the numeric columns of the table; `std_columns` is the
/// subset (possibly empty) that also gets a historical std.
pub fn aggregate_metric(
    rows: &[MetricRow],
    reference: NaiveDate,
    metric_columns: &[String],
    std_columns: &[&str],
) -> MetricAggregate {
    let mut hist: BTreeMap<ZoneBlock, Vec<&MetricRow>> = BTreeMap::new();
    let mut yday: BTreeMap<ZoneBlock, Vec<&MetricRow>> = BTreeMap::new();
    for r in rows {
        let Some(key) = r.key() else { continue };
        if r.date == reference {
            yday.entry(key).or_default().push(r);
        } else {
            hist.entry(key).or_default().push(r);
        }
    }

    let mut columns = Vec::new();
    for c in std_columns {
        columns.push(format!("{c}{SUFFIX_4WK_STD}"));
    }
    for c in metric_columns {
        columns.push(format!("{c}{SUFFIX_4WK}"));
    }
    for c in metric_columns {
        columns.push(format!("{c}{SUFFIX_Y}"));
    }

    let mut values: BTreeMap<ZoneBlock, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    for (key, group) in &hist {
        let out = values.entry(key.clone()).or_default();
        for c in std_columns {
            let v = stats::sample_std(group.iter().map(|r| r.get(c)));
            out.insert(format!("{c}{SUFFIX_4WK_STD}"), v);
        }
        for c in metric_columns {
            let v = stats::mean(group.iter().map(|r| r.get(c)));
            out.insert(format!("{c}{SUFFIX_4WK}"), v);
        }
    }
    for (key, group) in &yday {
        let out = values.entry(key.clone()).or_default();
        for c in metric_columns {
            let v = stats::mean(group.iter().map(|r| r.get(c)));
            out.insert(format!("{c}{SUFFIX_Y}"), v);
        }
    }

    MetricAggregate { columns, values }
}

/// One candidate with its merged metric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineRow {
    pub zone: String,
    pub time_block: TimeBlock,
    pub columns: BTreeMap<String, Option<f64>>,
}

impl BaselineRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns.get(column).copied().flatten()
    }
}

/// Candidate pool plus every merged column. Each operation returns a new table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineTable {
    pub columns: Vec<String>,
    pub rows: Vec<BaselineRow>,
}

impl BaselineTable {
    pub fn from_pool(pool: &[ZoneBlock]) -> Self {
        Self {
            columns: Vec::new(),
            rows: pool
                .iter()
                .map(|(zone, tb)| BaselineRow {
                    zone: zone.clone(),
                    time_block: *tb,
                    columns: BTreeMap::new(),
                })
                .collect(),
        }
    }

    /// Left join: every pool row survives, absent keys become nulls. A column
    /// name that is already present keeps its first value.
    pub fn merge(&self, agg: &MetricAggregate) -> Self {
        let existing: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        let fresh: Vec<String> = agg
            .columns
            .iter()
            .filter(|c| {
                let dup = existing.contains(c.as_str());
                if dup {
                    warn!(column = %c, "duplicate metric column across queries; keeping first");
                }
                !dup
            })
            .cloned()
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut columns = row.columns.clone();
                let found = agg.values.get(&(row.zone.clone(), row.time_block));
                for c in &fresh {
                    let v = found.and_then(|m| m.get(c).copied().flatten());
                    columns.insert(c.clone(), v);
                }
                BaselineRow {
                    zone: row.zone.clone(),
                    time_block: row.time_block,
                    columns,
                }
            })
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(fresh);
        Self { columns, rows }
    }

    /// Columns holding historical values (`_4wk` and `_4wk_std`).
    pub fn historical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.contains(SUFFIX_4WK))
            .cloned()
            .collect()
    }

    /// Pass 1: fill nulls of each historical column with the median of that
    /// column among rows of the same time block.
    pub fn fill_block_medians(&self) -> Self {
        let mut out = self.clone();
        for col in self.historical_columns() {
            let mut by_block: BTreeMap<TimeBlock, Vec<Option<f64>>> = BTreeMap::new();
            for r in &self.rows {
                by_block.entry(r.time_block).or_default().push(r.get(&col));
            }
            let medians: BTreeMap<TimeBlock, Option<f64>> = by_block
                .into_iter()
                .map(|(tb, vs)| (tb, stats::median(vs)))
                .collect();

            for r in out.rows.iter_mut() {
                if r.get(&col).is_none() {
                    let m = medians.get(&r.time_block).copied().flatten();
                    r.columns.insert(col.clone(), m);
                }
            }
        }
        out
    }

    /// Pass 2: fill what is still null with the column's global median.
    pub fn fill_global_medians(&self) -> Self {
        let mut out = self.clone();
        for col in self.historical_columns() {
            let global = stats::median(self.rows.iter().map(|r| r.get(&col)));
            if global.is_none() {
                debug!(column = %col, "no values anywhere; column stays null");
                continue;
            }
            for r in out.rows.iter_mut() {
                if r.get(&col).is_none() {
                    r.columns.insert(col.clone(), global);
                }
            }
        }
        out
    }

    /// Both back-fill passes in order.
    pub fn backfilled(&self) -> Self {
        self.fill_block_medians().fill_global_medians()
    }
}
