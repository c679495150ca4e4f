//! Raw query results and their typed view.
//!
//! The fetch layer produces untyped cells; `QueryTable::metric_rows` decides
//! which columns are numeric and turns each row into a `MetricRow` keyed by
//! `(zone, time_block, date)`.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::time_block::{self, TimeBlock};

/// Warehouse query identifier.
pub type QueryId = u32;

/// All fetched tables for one run, one per query id.
pub type QueryResults = BTreeMap<QueryId, QueryTable>;

/// Grouping key shared by every stage.
pub type ZoneBlock = (String, TimeBlock);

/// Columns that are never metrics.
pub const KEY_COLUMNS: &[&str] = &["zone", "time_block", "target_date"];

/// One untyped row as returned by a query for a given date.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub zone: String,
    pub time_raw: Option<String>,
    pub target_date: NaiveDate,
    /// Metric cells by column name. Empty string means null.
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(zone: impl Into<String>, time_raw: Option<&str>, target_date: NaiveDate) -> Self {
        Self {
            zone: zone.into(),
            time_raw: time_raw.map(str::to_string),
            target_date,
            cells: BTreeMap::new(),
        }
    }

    /// Builder helper used by sources and tests.
    pub fn cell(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.cells.insert(column.into(), value.to_string());
        self
    }
}

/// Typed row: numeric metric columns only, time normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub zone: String,
    pub time_block: Option<TimeBlock>,
    pub date: NaiveDate,
    pub values: BTreeMap<String, Option<f64>>,
}

impl MetricRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    /// `(zone, time_block)` when the time block could be parsed.
    pub fn key(&self) -> Option<ZoneBlock> {
        self.time_block.map(|tb| (self.zone.clone(), tb))
    }
}

/// Concatenated rows of one query across every run date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    pub rows: Vec<RawRow>,
}

impl QueryTable {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Metric columns whose non-null cells all parse as finite numbers.
    /// A column with no non-null cells at all counts as numeric.
    pub fn numeric_columns(&self) -> Vec<String> {
        let mut all = BTreeSet::new();
        let mut rejected = BTreeSet::new();
        for row in &self.rows {
            for (col, raw) in &row.cells {
                if KEY_COLUMNS.contains(&col.as_str()) {
                    continue;
                }
                all.insert(col.clone());
                let t = raw.trim();
                if !t.is_empty() && parse_number(t).is_none() {
                    rejected.insert(col.clone());
                }
            }
        }
        all.difference(&rejected).cloned().collect()
    }

    /// Typed view over the table with only numeric columns retained.
    pub fn metric_rows(&self) -> Vec<MetricRow> {
        let numeric = self.numeric_columns();
        self.rows
            .iter()
            .map(|row| {
                let values = numeric
                    .iter()
                    .map(|col| {
                        let v = row.cells.get(col).and_then(|s| parse_number(s.trim()));
                        (col.clone(), v)
                    })
                    .collect();
                MetricRow {
                    zone: row.zone.clone(),
                    time_block: time_block::extract(row.time_raw.as_deref()),
                    date: row.target_date,
                    values,
                }
            })
            .collect()
    }
}

/// Finite `f64` or nothing.
pub fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
