// ── Device domain types ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device operational status as reported by the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum DeviceStatus {
    Operational,
    Warning,
    Critical,
    Maintenance,
    Unknown,
}

impl DeviceStatus {
    /// Parse a wire status string, falling back to `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unknown)
    }

    /// Statuses that usually come with open alerts.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

/// A monitored device with its latest sensor snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub location: String,
    pub device_type: String,
    pub status: DeviceStatus,
    pub last_check: Option<DateTime<Utc>>,
    /// Metric name to latest reading.
    pub sensors: BTreeMap<String, f64>,
}
