// ── Alert domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Display bucket derived from the 0-10 severity score.
///
/// Never stored alongside the score -- always recomputed through
/// [`SeverityBucket::from_score`], so the two cannot desync.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SeverityBucket {
    Info,
    Warning,
    Critical,
}

impl SeverityBucket {
    /// Bucket thresholds: info < 4, warning 4-6, critical >= 7.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=3 => Self::Info,
            4..=6 => Self::Warning,
            _ => Self::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Synchronization state of one locally held alert against the backend.
///
/// `PendingAcknowledge` carries the pre-mutation snapshot, so rollback is a
/// pure restore of the stored value rather than a field-by-field undo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SyncState {
    /// Mirrors the backend's last reported state.
    #[default]
    Synced,
    /// Optimistically acknowledged; the confirming request is in flight.
    PendingAcknowledge(Box<Alert>),
}

impl SyncState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingAcknowledge(_))
    }
}

/// One detected device anomaly.
///
/// Invariant: `resolution_notes` is non-empty and `resolution_timestamp` is
/// set if and only if `acknowledged` is true. The conversion layer repairs
/// backend records that violate this before they reach the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    /// Weak reference to a device: relation plus lookup, never ownership.
    pub device_id: String,
    /// Display name resolved at snapshot time from the device mirror.
    pub device_name: Option<String>,
    pub alert_type: String,
    /// Severity score, clamped to 0-10.
    pub severity: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub resolution_notes: Option<String>,
    pub resolution_timestamp: Option<DateTime<Utc>>,

    /// Local-only optimistic-update tag; never serialized to the backend.
    #[serde(skip)]
    pub sync: SyncState,
}

impl Alert {
    /// The display bucket for this alert's score.
    pub fn bucket(&self) -> SeverityBucket {
        SeverityBucket::from_score(self.severity)
    }

    /// Device name for display and search, falling back for unknown devices.
    pub fn display_device(&self) -> &str {
        self.device_name.as_deref().unwrap_or("Unknown Device")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_thresholds() {
        assert_eq!(SeverityBucket::from_score(0), SeverityBucket::Info);
        assert_eq!(SeverityBucket::from_score(3), SeverityBucket::Info);
        assert_eq!(SeverityBucket::from_score(4), SeverityBucket::Warning);
        assert_eq!(SeverityBucket::from_score(6), SeverityBucket::Warning);
        assert_eq!(SeverityBucket::from_score(7), SeverityBucket::Critical);
        assert_eq!(SeverityBucket::from_score(10), SeverityBucket::Critical);
    }

    #[test]
    fn bucket_labels_are_lowercase() {
        assert_eq!(SeverityBucket::Critical.label(), "critical");
        assert_eq!(SeverityBucket::Warning.to_string(), "warning");
    }
}
