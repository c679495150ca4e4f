//! Noise filter and summary selection.
//!
//! A change is noise when it is small (|delta| below the threshold) and was
//! not driven by a z-score rule. z-driven changes are always kept.

use crate::decision::Decision;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPolicy {
    pub delta_threshold: f64,
    /// Minimum reference-day volume for a row to reach the summary.
    pub summary_min_volume: f64,
}

impl FilterPolicy {
    pub const DEFAULT: Self = Self {
        delta_threshold: 2.0,
        summary_min_volume: 50.0,
    };
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// True when the row should be dropped from the details table.
pub fn is_noise(decision: &Decision, policy: &FilterPolicy) -> bool {
    let small = decision
        .delta()
        .is_some_and(|d| d.abs() < policy.delta_threshold);
    decision.action.is_change() && small && !decision.reason.mentions_z()
}

/// True when a kept row belongs in the summary table.
pub fn in_summary(decision: &Decision, volume: Option<f64>, policy: &FilterPolicy) -> bool {
    decision.action.is_change() && volume.is_some_and(|v| v >= policy.summary_min_volume)
}
