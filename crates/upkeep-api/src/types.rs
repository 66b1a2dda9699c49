// Wire types for the maintenance backend
//
// Models for the backend's plain-JSON REST responses and the realtime
// `{type, data}` envelope. Timestamps stay as raw strings here: the backend
// emits naive ISO-8601 (no UTC offset), so parsing is deferred to the
// domain conversion layer which knows how to interpret them. Unknown fields
// are ignored everywhere; a record missing a required field fails to decode
// and is dropped by the lenient list paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

// ── Device ───────────────────────────────────────────────────────────

/// Device record from `GET /devices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub status: String,
    pub last_check: String,
    /// Latest sensor snapshot, metric name to reading.
    #[serde(default)]
    pub sensors: BTreeMap<String, f64>,
}

// ── Alert ────────────────────────────────────────────────────────────

/// Alert record from `GET /alerts`.
///
/// `resolution_notes`/`resolution_timestamp` are absent until the alert is
/// acknowledged; older backends omit them entirely, so both default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub timestamp: String,
    pub device_id: String,
    pub alert_type: String,
    pub severity: i64,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub resolution_timestamp: Option<String>,
}

/// Body for `POST /alerts/{id}/acknowledge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    pub acknowledged: bool,
    pub notes: String,
    pub resolution_timestamp: String,
}

/// Server-side severity bands accepted by `GET /alerts?severity=`.
///
/// These are the backend's query bands (high > 7, medium 5–7, low ≤ 4),
/// not the client's display buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SeverityBand {
    High,
    Medium,
    Low,
}

/// Optional server-side filters for `GET /alerts`.
#[derive(Debug, Clone, Default)]
pub struct AlertListFilter {
    pub severity: Option<SeverityBand>,
    pub device_id: Option<String>,
}

// ── Settings ─────────────────────────────────────────────────────────

/// Threshold pair for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBandPayload {
    pub warning: f64,
    pub critical: f64,
}

/// Notification channel toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub email: bool,
    pub sms: bool,
}

/// Payload for `GET`/`POST /settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsPayload {
    pub thresholds: BTreeMap<String, ThresholdBandPayload>,
    pub notifications: NotificationPrefs,
}

// ── Health ───────────────────────────────────────────────────────────

/// Response from `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub device_count: Option<u64>,
    #[serde(default)]
    pub alert_count: Option<u64>,
}

impl HealthStatus {
    /// The backend reports `"healthy"` when it is up and serving.
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

// ── Realtime envelope ────────────────────────────────────────────────

/// Raw envelope delivered over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Message kinds the backend pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    DeviceStatus,
    Predictions,
    Environmental,
    SensorHealth,
}

/// Decoded payload of one realtime message.
#[derive(Debug, Clone)]
pub enum RealtimePayload {
    DeviceStatus(BTreeMap<String, DeviceStatusUpdate>),
    Predictions(Vec<PredictedFailure>),
    Environmental(Vec<EnvironmentalAlert>),
    SensorHealth(Vec<SensorHealthReport>),
}

impl RealtimePayload {
    /// Decode the `data` half of an envelope for a known kind.
    pub fn decode(kind: MessageKind, data: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            MessageKind::DeviceStatus => Self::DeviceStatus(serde_json::from_value(data)?),
            MessageKind::Predictions => Self::Predictions(serde_json::from_value(data)?),
            MessageKind::Environmental => Self::Environmental(serde_json::from_value(data)?),
            MessageKind::SensorHealth => Self::SensorHealth(serde_json::from_value(data)?),
        })
    }

    /// The kind tag this payload arrived under.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::DeviceStatus(_) => MessageKind::DeviceStatus,
            Self::Predictions(_) => MessageKind::Predictions,
            Self::Environmental(_) => MessageKind::Environmental,
            Self::SensorHealth(_) => MessageKind::SensorHealth,
        }
    }
}

/// Per-device entry in a `device_status` push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusUpdate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: String,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Entry in a `predictions` push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedFailure {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    pub prediction_time: String,
    #[serde(default)]
    pub location: Option<String>,
    pub severity: String,
    pub risk_score: f64,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub time_sensitivity: Option<f64>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub work_order_id: Option<String>,
}

/// Entry in an `environmental` push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentalAlert {
    pub id: String,
    #[serde(rename = "type")]
    pub category: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    pub severity: String,
    pub description: String,
    #[serde(default)]
    pub affected_devices: Vec<String>,
    #[serde(default)]
    pub resolution_status: Option<String>,
}

/// Entry in a `sensor_health` push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorHealthReport {
    pub device_id: String,
    pub sensor_type: String,
    pub status: String,
    #[serde(default)]
    pub last_calibration: Option<String>,
    #[serde(default)]
    pub next_calibration: Option<String>,
    #[serde(default)]
    pub data_gaps: Vec<DataGap>,
    #[serde(default)]
    pub connectivity_status: Option<String>,
    #[serde(default)]
    pub calibration_status: Option<String>,
}

/// Interval of missing sensor data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataGap {
    pub start: String,
    pub end: String,
}
