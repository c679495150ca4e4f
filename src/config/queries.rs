// src/config/queries.rs
use serde::{Deserialize, Serialize};

use crate::table::QueryId;

pub const MATCH_RATE: &str = "match_rate";
pub const EXPIRY_RATE: &str = "expiry_rate";
pub const FIRST_TRY_CATER_RATE: &str = "first_try_cater_rate";
pub const BOOK_SEARCH_RATIO: &str = "book_search_ratio";
pub const MEDIAN_TIME_TO_MATCH: &str = "median_time_to_match";
pub const MEDIAN_ETA: &str = "median_eta";
pub const PRICING: &str = "pricing";

/// Metrics whose historical standard deviation is tracked (z-score inputs).
pub const STD_METRICS: [&str; 2] = [FIRST_TRY_CATER_RATE, BOOK_SEARCH_RATIO];

/// Label → warehouse query id. Built once per run and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryCatalog {
    pub match_rate: QueryId,
    pub expiry_rate: QueryId,
    pub first_try_cater_rate: QueryId,
    pub book_search_ratio: QueryId,
    pub median_time_to_match: QueryId,
    pub median_eta: QueryId,
    pub pricing: QueryId,
}

impl Default for QueryCatalog {
    fn default() -> Self {
        Self {
            match_rate: 4821,
            expiry_rate: 4823,
            first_try_cater_rate: 4824,
            book_search_ratio: 4825,
            median_time_to_match: 4826,
            median_eta: 4827,
            pricing: 4836,
        }
    }
}

impl QueryCatalog {
    /// `(label, id)` pairs in aggregation order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, QueryId)> {
        [
            (MATCH_RATE, self.match_rate),
            (EXPIRY_RATE, self.expiry_rate),
            (FIRST_TRY_CATER_RATE, self.first_try_cater_rate),
            (BOOK_SEARCH_RATIO, self.book_search_ratio),
            (MEDIAN_TIME_TO_MATCH, self.median_time_to_match),
            (MEDIAN_ETA, self.median_eta),
            (PRICING, self.pricing),
        ]
        .into_iter()
    }

    pub fn ids(&self) -> Vec<QueryId> {
        self.iter().map(|(_, id)| id).collect()
    }

    pub fn id_of(&self, label: &str) -> Option<QueryId> {
        self.iter().find(|(l, _)| *l == label).map(|(_, id)| id)
    }

    /// Metric columns of `label` that also get a `_4wk_std` column.
    pub fn std_columns(&self, label: &str) -> &'static [&'static str] {
        match label {
            FIRST_TRY_CATER_RATE => &[FIRST_TRY_CATER_RATE],
            BOOK_SEARCH_RATIO => &[BOOK_SEARCH_RATIO],
            _ => &[],
        }
    }
}
