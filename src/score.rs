//! Composite performance score.
//!
//! `score = 0.6 * first_try_cater_rate + 0.4 * book_search_ratio`, evaluated
//! for the reference day and for the 4-week baseline.

use serde::Serialize;

use crate::baseline::{BaselineRow, SUFFIX_4WK, SUFFIX_Y};
use crate::config::queries::{BOOK_SEARCH_RATIO, FIRST_TRY_CATER_RATE};

/// Fixed blend of the two component metrics. Policy, not configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeWeights {
    pub cater: f64,
    pub book_search: f64,
}

impl CompositeWeights {
    pub const DEFAULT: Self = Self {
        cater: 0.6,
        book_search: 0.4,
    };

    pub fn score(&self, cater: f64, book_search: f64) -> f64 {
        self.cater * cater + self.book_search * book_search
    }

    /// Null when either component is null.
    pub fn score_opt(&self, cater: Option<f64>, book_search: Option<f64>) -> Option<f64> {
        Some(self.score(cater?, book_search?))
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreSet {
    pub score_y: Option<f64>,
    pub score_4wk: Option<f64>,
    pub score_diff: Option<f64>,
}

/// Reference-day score, baseline score and their difference for one row.
pub fn score_row(row: &BaselineRow, w: &CompositeWeights) -> ScoreSet {
    let score_y = w.score_opt(
        row.get(&format!("{FIRST_TRY_CATER_RATE}{SUFFIX_Y}")),
        row.get(&format!("{BOOK_SEARCH_RATIO}{SUFFIX_Y}")),
    );
    let score_4wk = w.score_opt(
        row.get(&format!("{FIRST_TRY_CATER_RATE}{SUFFIX_4WK}")),
        row.get(&format!("{BOOK_SEARCH_RATIO}{SUFFIX_4WK}")),
    );
    let score_diff = match (score_y, score_4wk) {
        (Some(y), Some(h)) => Some(y - h),
        _ => None,
    };
    ScoreSet {
        score_y,
        score_4wk,
        score_diff,
    }
}
