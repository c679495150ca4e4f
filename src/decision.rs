// src/decision.rs
//! Output shape of the per-row NSM adjustment.
//!
//! `Action` says what happens to the knob, `Reason` says which rule fired.
//! Both serialize to the snake_case labels the report uses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with the NSM for one `(zone, time_block)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Increase,
    Decrease,
    NoChange,
    NoChangeLowVolume,
    NoData,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Increase => "increase",
            Action::Decrease => "decrease",
            Action::NoChange => "no_change",
            Action::NoChangeLowVolume => "no_change_low_volume",
            Action::NoData => "no_data",
        }
    }

    /// Increase or decrease: the only actions that move the knob.
    pub fn is_change(&self) -> bool {
        matches!(self, Action::Increase | Action::Decrease)
    }

    /// Direction label from the arithmetic sign of the move. Equal values
    /// read as a decrease.
    pub fn from_move(old: f64, new: f64) -> Self {
        if new > old {
            Action::Increase
        } else {
            Action::Decrease
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    MissingNsm,
    LowVolume,
    MissingZ,
    UnderperformingZ,
    OverperformingZ,
    IncreaseScoreOnly,
    DecreaseScoreOnly,
    Stable,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::MissingNsm => "missing_nsm",
            Reason::LowVolume => "low_volume",
            Reason::MissingZ => "missing_z",
            Reason::UnderperformingZ => "underperforming_z",
            Reason::OverperformingZ => "overperforming_z",
            Reason::IncreaseScoreOnly => "increase_score_only",
            Reason::DecreaseScoreOnly => "decrease_score_only",
            Reason::Stable => "stable",
        }
    }

    /// Score-only reason matching a direction label.
    pub fn score_only(direction: Action) -> Self {
        match direction {
            Action::Increase => Reason::IncreaseScoreOnly,
            _ => Reason::DecreaseScoreOnly,
        }
    }

    /// Reasons whose label mentions `z`; the noise filter never drops these.
    pub fn mentions_z(&self) -> bool {
        self.as_str().contains('z')
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the decision engine for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub old_nsm: Option<f64>,
    pub recommended_nsm: Option<f64>,
    pub action: Action,
    #[serde(rename = "reason_for_change")]
    pub reason: Reason,
    #[serde(default)]
    pub z_cater: Option<f64>,
    #[serde(default)]
    pub z_bsr: Option<f64>,
}

impl Decision {
    pub fn missing_nsm() -> Self {
        Self {
            old_nsm: None,
            recommended_nsm: None,
            action: Action::NoData,
            reason: Reason::MissingNsm,
            z_cater: None,
            z_bsr: None,
        }
    }

    /// Hold at `current` with the given action/reason.
    pub fn hold(current: f64, action: Action, reason: Reason) -> Self {
        Self {
            old_nsm: Some(current),
            recommended_nsm: Some(current),
            action,
            reason,
            z_cater: None,
            z_bsr: None,
        }
    }

    /// Move to `new`, labelled by the sign of `new - current`.
    pub fn moved(current: f64, new: f64, reason: Reason) -> Self {
        Self {
            old_nsm: Some(current),
            recommended_nsm: Some(new),
            action: Action::from_move(current, new),
            reason,
            z_cater: None,
            z_bsr: None,
        }
    }

    /// Attach the z-scores used (builder style).
    pub fn with_z(mut self, z_cater: Option<f64>, z_bsr: Option<f64>) -> Self {
        self.z_cater = z_cater;
        self.z_bsr = z_bsr;
        self
    }

    /// `recommended − old`, null when either side is null.
    pub fn delta(&self) -> Option<f64> {
        Some(self.recommended_nsm? - self.old_nsm?)
    }
}
