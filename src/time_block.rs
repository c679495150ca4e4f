//! # Time Blocks
//! Normalizes raw per-row time fields into a time-of-day bucket.
//!
//! The fetch layer hands us whatever the warehouse printed: a full timestamp
//! (`2025-06-02 08:30:00`, RFC 3339), or just the clock part (`08:30`,
//! `08:30:00`). Only the time of day survives, so the same block on two
//! different dates compares equal and groups together.
//!
//! Unparseable input is not an error: it yields `None` and the row drops out
//! of every grouping.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Canonical time-of-day bucket, totally ordered by clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBlock(NaiveTime);

impl TimeBlock {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse a raw time field. Sub-second precision is truncated.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::truncated(dt.time()));
        }
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self::truncated(dt.time()));
            }
        }
        for fmt in TIME_FORMATS {
            if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
                return Some(Self::truncated(t));
            }
        }
        None
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    fn truncated(t: NaiveTime) -> Self {
        // with_nanosecond(0) only fails for out-of-range values, never for 0
        Self(t.with_nanosecond(0).unwrap_or(t))
    }
}

/// Extract the block from an optional raw field (missing → `None`).
pub fn extract(raw: Option<&str>) -> Option<TimeBlock> {
    raw.and_then(TimeBlock::parse)
}

impl fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.second() == 0 {
            write!(f, "{}", self.0.format("%H:%M"))
        } else {
            write!(f, "{}", self.0.format("%H:%M:%S"))
        }
    }
}

impl Serialize for TimeBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
