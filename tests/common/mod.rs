// tests/common/mod.rs
// Synthetic query tables for end-to-end runs.
#![allow(dead_code)]

pub mod xlsx;

use chrono::{Duration, NaiveDate};
use nsm_recommender::table::{QueryId, QueryResults, QueryTable, RawRow};
use nsm_recommender::QueryCatalog;
use std::collections::BTreeMap;

pub const MATCH: QueryId = 4821;
pub const CATER: QueryId = 4824;
pub const BSR: QueryId = 4825;
pub const PRICING: QueryId = 4836;

pub fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn history() -> Vec<NaiveDate> {
    (1..=4).map(|w| reference() - Duration::weeks(w)).collect()
}

/// One historical observation: (nsm, cater, bsr).
pub type Obs = (f64, f64, f64);

/// Everything one `(zone, block)` contributes to the four required tables.
#[derive(Debug, Clone)]
pub struct ZoneSetup {
    pub zone: String,
    pub block: String,
    pub volume: f64,
    /// Leave the reference-day `unique_bookings` cell empty.
    pub blank_volume_y: bool,
    /// Reference-day NSM; `None` leaves the pricing row out entirely.
    pub nsm_y: Option<f64>,
    pub cater_y: f64,
    pub bsr_y: f64,
    pub surge_y: f64,
    /// Exactly four entries, one per historical week.
    pub hist: Vec<Obs>,
}

impl ZoneSetup {
    pub fn new(zone: &str, block: &str) -> Self {
        Self {
            zone: zone.into(),
            block: block.into(),
            volume: 80.0,
            blank_volume_y: false,
            nsm_y: Some(10.0),
            cater_y: 0.7,
            bsr_y: 0.4,
            surge_y: 1.2,
            hist: vec![(10.0, 0.7, 0.4); 4],
        }
    }
}

#[derive(Debug, Default)]
pub struct Fixture {
    tables: BTreeMap<QueryId, Vec<RawRow>>,
}

fn ts(date: NaiveDate, block: &str) -> String {
    format!("{} {}:00", date.format("%Y-%m-%d"), block)
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, qid: QueryId, row: RawRow) {
        self.tables.entry(qid).or_default().push(row);
    }

    pub fn zone(mut self, s: ZoneSetup) -> Self {
        let r = reference();
        let t = ts(r, &s.block);
        let volume_y = if s.blank_volume_y {
            String::new()
        } else {
            s.volume.to_string()
        };
        self.push(
            MATCH,
            RawRow::new(&s.zone, Some(&t), r)
                .cell("unique_bookings", volume_y)
                .cell("match_rate", 0.8),
        );
        if let Some(nsm) = s.nsm_y {
            self.push(
                PRICING,
                RawRow::new(&s.zone, Some(&t), r)
                    .cell("avg_nsm", nsm)
                    .cell("avg_dynamic_surge_level", s.surge_y),
            );
        }
        self.push(
            CATER,
            RawRow::new(&s.zone, Some(&t), r).cell("first_try_cater_rate", s.cater_y),
        );
        self.push(
            BSR,
            RawRow::new(&s.zone, Some(&t), r).cell("book_search_ratio", s.bsr_y),
        );

        for (date, (nsm, cater, bsr)) in history().into_iter().zip(s.hist.iter().copied()) {
            let t = ts(date, &s.block);
            self.push(
                MATCH,
                RawRow::new(&s.zone, Some(&t), date)
                    .cell("unique_bookings", s.volume)
                    .cell("match_rate", 0.8),
            );
            self.push(
                PRICING,
                RawRow::new(&s.zone, Some(&t), date)
                    .cell("avg_nsm", nsm)
                    .cell("avg_dynamic_surge_level", 1.0),
            );
            self.push(
                CATER,
                RawRow::new(&s.zone, Some(&t), date).cell("first_try_cater_rate", cater),
            );
            self.push(
                BSR,
                RawRow::new(&s.zone, Some(&t), date).cell("book_search_ratio", bsr),
            );
        }
        self
    }

    /// Tables for the four required queries (optional ones stay absent).
    pub fn results(&self) -> QueryResults {
        let mut out = QueryResults::new();
        for qid in [MATCH, CATER, BSR, PRICING] {
            let rows = self.tables.get(&qid).cloned().unwrap_or_default();
            out.insert(qid, QueryTable::new(rows));
        }
        out
    }

    /// Raw rows per query, for writing CSV exports.
    pub fn tables(&self) -> &BTreeMap<QueryId, Vec<RawRow>> {
        &self.tables
    }
}

pub fn catalog() -> QueryCatalog {
    QueryCatalog::default()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Underperforming on both z-scores, historically best at NSM 14.
pub fn underperforming(zone: &str, block: &str) -> ZoneSetup {
    ZoneSetup {
        nsm_y: Some(10.0),
        cater_y: 0.55,
        bsr_y: 0.30,
        hist: vec![
            (14.0, 0.8, 0.5),
            (10.0, 0.6, 0.3),
            (14.0, 0.8, 0.5),
            (10.0, 0.6, 0.3),
        ],
        ..ZoneSetup::new(zone, block)
    }
}

/// Overperforming on both z-scores, historically best at NSM 6.
pub fn overperforming(zone: &str, block: &str) -> ZoneSetup {
    ZoneSetup {
        nsm_y: Some(10.0),
        cater_y: 0.90,
        bsr_y: 0.60,
        hist: vec![
            (6.0, 0.8, 0.5),
            (10.0, 0.6, 0.3),
            (6.0, 0.8, 0.5),
            (10.0, 0.6, 0.3),
        ],
        ..ZoneSetup::new(zone, block)
    }
}

/// Flat history with a tiny wobble: z ≈ 0, score diff ≈ 0, best bin 10.5.
pub fn stable(zone: &str, block: &str) -> ZoneSetup {
    ZoneSetup {
        nsm_y: Some(10.0),
        cater_y: 0.70,
        bsr_y: 0.40,
        hist: vec![
            (10.5, 0.71, 0.41),
            (10.0, 0.69, 0.39),
            (10.5, 0.71, 0.41),
            (10.0, 0.69, 0.39),
        ],
        ..ZoneSetup::new(zone, block)
    }
}

/// Cater far above baseline, book-search flat: score-only move toward `best`.
pub fn score_only(zone: &str, block: &str, best: f64) -> ZoneSetup {
    ZoneSetup {
        nsm_y: Some(10.0),
        cater_y: 0.90,
        bsr_y: 0.40,
        hist: vec![
            (best, 0.8, 0.5),
            (10.0, 0.6, 0.3),
            (best, 0.8, 0.5),
            (10.0, 0.6, 0.3),
        ],
        ..ZoneSetup::new(zone, block)
    }
}
