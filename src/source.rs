// src/source.rs
//! Query-result providers.
//!
//! The recommender never talks to the warehouse itself; it asks a
//! `QuerySource` for the rows of `(query_id, date)` and stamps them.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::table::{QueryId, QueryResults, QueryTable, RawRow};

#[async_trait::async_trait]
pub trait QuerySource: Send + Sync {
    /// Rows of one query for one target date. `target_date` on the returned
    /// rows is overwritten by `fetch_all`.
    async fn fetch(&self, query_id: QueryId, date: NaiveDate) -> Result<Vec<RawRow>>;
    fn name(&self) -> &'static str;
}

/// Run every `(date, query)` pair and concatenate per query id.
/// Any fetch error aborts the run.
pub async fn fetch_all<S: QuerySource + ?Sized>(
    source: &S,
    query_ids: &[QueryId],
    dates: &[NaiveDate],
) -> Result<QueryResults> {
    let mut acc: BTreeMap<QueryId, Vec<RawRow>> = BTreeMap::new();
    for &date in dates {
        for &qid in query_ids {
            let rows = source
                .fetch(qid, date)
                .await
                .with_context(|| format!("{}: query {qid} for {date}", source.name()))?;
            let slot = acc.entry(qid).or_default();
            slot.extend(rows.into_iter().map(|mut r| {
                r.target_date = date;
                r
            }));
        }
    }
    let results: QueryResults = acc
        .into_iter()
        .map(|(id, rows)| (id, QueryTable::new(rows)))
        .collect();
    info!(
        source = source.name(),
        queries = results.len(),
        rows = results.values().map(QueryTable::len).sum::<usize>(),
        "fetched query results"
    );
    Ok(results)
}

/// Reads `<dir>/<query_id>_<YYYY-MM-DD>.csv` exports.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, query_id: QueryId, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{query_id}_{}.csv", date.format("%Y-%m-%d")))
    }
}

/// Parse one export. Requires a `zone` column; `time_block` may be absent.
pub fn parse_csv(content: &str, date: NaiveDate) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers().context("reading csv header")?.clone();
    let zone_idx = headers
        .iter()
        .position(|h| h == "zone")
        .ok_or_else(|| anyhow!("csv has no `zone` column"))?;
    let time_idx = headers.iter().position(|h| h == "time_block");

    let mut rows = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let rec = rec.with_context(|| format!("csv record {}", i + 1))?;
        let zone = rec.get(zone_idx).unwrap_or_default();
        let time_raw = time_idx
            .and_then(|t| rec.get(t))
            .filter(|s| !s.is_empty());
        let mut row = RawRow::new(zone, time_raw, date);
        for (h, v) in headers.iter().zip(rec.iter()) {
            if matches!(h, "zone" | "time_block" | "target_date") {
                continue;
            }
            row.cells.insert(h.to_string(), v.to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

#[async_trait::async_trait]
impl QuerySource for CsvDirSource {
    async fn fetch(&self, query_id: QueryId, date: NaiveDate) -> Result<Vec<RawRow>> {
        let path = self.path_for(query_id, date);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "export missing; treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        parse_csv(&content, date).with_context(|| format!("parsing {}", path.display()))
    }

    fn name(&self) -> &'static str {
        "CsvDirSource"
    }
}
