// src/engine.rs
//! Decision engine: pure logic that maps one comparison row → `Decision`.
//! No I/O, suitable for unit tests and offline replays.
//!
//! Rules, first match wins:
//! 1. current or recommended NSM missing → `no_data` / `missing_nsm`
//! 2. volume present and below minimum → hold, `no_change_low_volume` / `low_volume`
//! 3. either z-score missing → hold, `no_data` / `missing_z`
//! 4. both z below −z_max → move, `underperforming_z`
//! 5. both z above +z_max → move, `overperforming_z`
//! 6. |score_diff| above threshold → move, `{direction}_score_only`
//! 7. otherwise → hold, `no_change` / `stable`
//!
//! A move is always `current + adjust_factor * (recommended − current)`. The
//! increase/decrease label comes from the sign of that move, not from the
//! rule that fired.

use crate::decision::{Action, Decision, Reason};
use crate::score::CompositeWeights;

/// Fixed thresholds of the adjustment rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    pub z_max: f64,
    pub score_diff_threshold: f64,
    pub adjust_factor: f64,
    pub min_volume: f64,
}

impl DecisionPolicy {
    pub const DEFAULT: Self = Self {
        z_max: 0.7,
        score_diff_threshold: 0.03,
        adjust_factor: 0.5,
        min_volume: 50.0,
    };

    /// Linear step from `current` toward `target`.
    pub fn step(&self, current: f64, target: f64) -> f64 {
        current + self.adjust_factor * (target - current)
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the rule looks at for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionInput {
    pub current_nsm: Option<f64>,
    pub recommended_nsm: Option<f64>,
    /// Reference-day bookings. Missing volume does not trigger the
    /// low-volume hold; the summary gate still excludes such rows.
    pub volume: Option<f64>,
    pub cater_y: Option<f64>,
    pub cater_4wk: Option<f64>,
    pub cater_4wk_std: Option<f64>,
    pub bsr_y: Option<f64>,
    pub bsr_4wk: Option<f64>,
    pub bsr_4wk_std: Option<f64>,
}

/// Standardized deviation. Zero std gives exactly 0; any null input gives null.
pub fn z_score(y: Option<f64>, mean: Option<f64>, std: Option<f64>) -> Option<f64> {
    let (y, mean, std) = (y?, mean?, std?);
    if std == 0.0 {
        return Some(0.0);
    }
    Some((y - mean) / std)
}

/// Apply the adjustment rule to one row.
pub fn decide(input: &DecisionInput, policy: &DecisionPolicy, weights: &CompositeWeights) -> Decision {
    let (Some(current), Some(best)) = (input.current_nsm, input.recommended_nsm) else {
        return Decision::missing_nsm();
    };

    if input.volume.is_some_and(|v| v < policy.min_volume) {
        return Decision::hold(current, Action::NoChangeLowVolume, Reason::LowVolume);
    }

    let z_cater = z_score(input.cater_y, input.cater_4wk, input.cater_4wk_std);
    let z_bsr = z_score(input.bsr_y, input.bsr_4wk, input.bsr_4wk_std);
    let (Some(zc), Some(zb)) = (z_cater, z_bsr) else {
        return Decision::hold(current, Action::NoData, Reason::MissingZ).with_z(z_cater, z_bsr);
    };

    // z present ⇒ every component below is present too.
    let score_diff = match (input.cater_y, input.bsr_y, input.cater_4wk, input.bsr_4wk) {
        (Some(cy), Some(by), Some(ch), Some(bh)) => weights.score(cy, by) - weights.score(ch, bh),
        _ => 0.0,
    };

    let decision = if zc < -policy.z_max && zb < -policy.z_max {
        Decision::moved(current, policy.step(current, best), Reason::UnderperformingZ)
    } else if zc > policy.z_max && zb > policy.z_max {
        Decision::moved(current, policy.step(current, best), Reason::OverperformingZ)
    } else if score_diff.abs() > policy.score_diff_threshold {
        let new = policy.step(current, best);
        let reason = Reason::score_only(Action::from_move(current, new));
        Decision::moved(current, new, reason)
    } else {
        Decision::hold(current, Action::NoChange, Reason::Stable)
    };

    decision.with_z(z_cater, z_bsr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DecisionPolicy {
        DecisionPolicy::DEFAULT
    }
    fn w() -> CompositeWeights {
        CompositeWeights::DEFAULT
    }

    /// Row whose z-scores are `zc`, `zb` (std = 1); score diff is then
    /// `0.6 * zc + 0.4 * zb`.
    fn row(current: f64, best: f64, volume: f64, zc: f64, zb: f64) -> DecisionInput {
        DecisionInput {
            current_nsm: Some(current),
            recommended_nsm: Some(best),
            volume: Some(volume),
            cater_y: Some(0.5 + zc),
            cater_4wk: Some(0.5),
            cater_4wk_std: Some(1.0),
            bsr_y: Some(0.5 + zb),
            bsr_4wk: Some(0.5),
            bsr_4wk_std: Some(1.0),
        }
    }

    #[test]
    fn underperforming_moves_halfway() {
        let d = decide(&row(10.0, 14.0, 80.0, -0.9, -0.8), &policy(), &w());
        assert_eq!(d.reason, Reason::UnderperformingZ);
        assert_eq!(d.action, Action::Increase);
        assert_eq!(d.recommended_nsm, Some(12.0));
        assert_eq!(d.delta(), Some(2.0));
    }

    #[test]
    fn overperforming_label_follows_sign() {
        let d = decide(&row(10.0, 6.0, 80.0, 0.9, 0.8), &policy(), &w());
        assert_eq!(d.reason, Reason::OverperformingZ);
        assert_eq!(d.action, Action::Decrease);
        assert_eq!(d.recommended_nsm, Some(8.0));
    }

    #[test]
    fn stable_when_nothing_fires() {
        // z in band and |score_diff| = 0.6*0.01 + 0.4*0.01 = 0.01
        let d = decide(&row(10.0, 10.5, 80.0, 0.01, 0.01), &policy(), &w());
        assert_eq!(d.action, Action::NoChange);
        assert_eq!(d.reason, Reason::Stable);
        assert_eq!(d.recommended_nsm, Some(10.0));
        assert_eq!(d.delta(), Some(0.0));
    }

    #[test]
    fn low_volume_beats_z() {
        let d = decide(&row(10.0, 12.0, 30.0, -5.0, -5.0), &policy(), &w());
        assert_eq!(d.action, Action::NoChangeLowVolume);
        assert_eq!(d.reason, Reason::LowVolume);
        assert_eq!(d.recommended_nsm, Some(10.0));
    }

    #[test]
    fn missing_volume_falls_through_to_z_rules() {
        let mut r = row(10.0, 12.0, 80.0, -1.0, -1.0);
        r.volume = None;
        let d = decide(&r, &policy(), &w());
        assert_eq!(d.reason, Reason::UnderperformingZ);
        assert_eq!(d.action, Action::Increase);
        assert_eq!(d.recommended_nsm, Some(11.0));
    }

    #[test]
    fn missing_nsm_first() {
        let mut r = row(10.0, 12.0, 10.0, 0.0, 0.0);
        r.recommended_nsm = None;
        let d = decide(&r, &policy(), &w());
        assert_eq!(d, Decision::missing_nsm());
        assert_eq!(d.old_nsm, None);
    }

    #[test]
    fn missing_z_holds() {
        let mut r = row(10.0, 12.0, 80.0, -1.0, -1.0);
        r.bsr_4wk_std = None;
        let d = decide(&r, &policy(), &w());
        assert_eq!(d.action, Action::NoData);
        assert_eq!(d.reason, Reason::MissingZ);
        assert_eq!(d.recommended_nsm, Some(10.0));
    }

    #[test]
    fn zero_std_is_zero_z_and_falls_through() {
        let r = DecisionInput {
            current_nsm: Some(10.0),
            recommended_nsm: Some(12.0),
            volume: Some(80.0),
            cater_y: Some(0.7),
            cater_4wk: Some(0.7),
            cater_4wk_std: Some(0.0),
            bsr_y: Some(0.4),
            bsr_4wk: Some(0.4),
            bsr_4wk_std: Some(0.0),
        };
        let d = decide(&r, &policy(), &w());
        assert_eq!(d.z_cater, Some(0.0));
        assert_eq!(d.z_bsr, Some(0.0));
        assert_eq!(d.reason, Reason::Stable);
    }

    #[test]
    fn zero_std_with_offset_still_finite() {
        assert_eq!(z_score(Some(1.0), Some(0.5), Some(0.0)), Some(0.0));
        assert_eq!(z_score(None, Some(0.5), Some(1.0)), None);
    }

    #[test]
    fn score_only_when_z_disagree() {
        // zc = -2, zb = +0.5 → no z rule; diff = -1.2 + 0.2 = -1.0
        let d = decide(&row(10.0, 14.0, 80.0, -2.0, 0.5), &policy(), &w());
        assert_eq!(d.reason, Reason::IncreaseScoreOnly);
        assert_eq!(d.action, Action::Increase);
        assert_eq!(d.recommended_nsm, Some(12.0));

        let d = decide(&row(10.0, 9.0, 80.0, -2.0, 0.5), &policy(), &w());
        assert_eq!(d.reason, Reason::DecreaseScoreOnly);
        assert_eq!(d.action, Action::Decrease);
    }

    #[test]
    fn equal_target_on_z_reads_decrease() {
        let d = decide(&row(10.0, 10.0, 80.0, -1.0, -1.0), &policy(), &w());
        assert_eq!(d.reason, Reason::UnderperformingZ);
        assert_eq!(d.action, Action::Decrease);
        assert_eq!(d.delta(), Some(0.0));
    }

    #[test]
    fn threshold_edges_are_strict() {
        // exactly at -z_max does not count as underperforming
        let mut r = row(10.0, 14.0, 80.0, -0.7, -0.9);
        r.cater_y = Some(0.5 - 0.7);
        let d = decide(&r, &policy(), &w());
        assert_ne!(d.reason, Reason::UnderperformingZ);

        // volume exactly at the minimum passes the gate
        let d = decide(&row(10.0, 14.0, 50.0, -0.9, -0.9), &policy(), &w());
        assert_eq!(d.reason, Reason::UnderperformingZ);
    }
}
