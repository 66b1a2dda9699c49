// ── Derived statistics types ──
//
// Ephemeral aggregates recomputed from the full alert collection on every
// read. There is deliberately no incremental counter anywhere: full
// recomputation cannot drift when a poll and an acknowledge race.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Severity-bucketed alert counts.
///
/// `critical`/`warning`/`info` count open (unacknowledged) alerts only;
/// `resolved` counts every acknowledged alert regardless of severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub resolved: usize,
}

impl AlertStats {
    /// Open alerts across all buckets.
    pub fn open_total(&self) -> usize {
        self.critical + self.warning + self.info
    }
}

/// Per-day incidence counts for the trend chart.
///
/// Acknowledgment state is ignored here: this is a raw incidence trend,
/// not an open-issue trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendBucket {
    pub date: NaiveDate,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl TrendBucket {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            critical: 0,
            warning: 0,
            info: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.info
    }
}
