// ── Wire-to-domain conversions ──
//
// Bridges raw `upkeep_api` records into canonical `model` types. The
// backend emits naive ISO-8601 timestamps (no offset), interpreted as UTC;
// records whose required timestamp fails to parse are dropped by the
// caller. Conversions also repair the resolution invariant: notes and
// timestamp travel together with the acknowledged flag, never separately.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use upkeep_api::types::{
    AlertRecord, DeviceRecord, SettingsPayload, ThresholdBandPayload,
};

use crate::model::{Alert, Device, DeviceStatus, Settings, SyncState, ThresholdBand};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a backend timestamp: RFC 3339 when an offset is present, naive
/// ISO-8601 interpreted as UTC otherwise.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Clamp the wire severity (unbounded integer) to the 0-10 score range.
fn clamp_severity(raw: i64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        raw.clamp(0, 10) as u8
    }
}

// ── Device ─────────────────────────────────────────────────────────

impl From<DeviceRecord> for Device {
    fn from(d: DeviceRecord) -> Self {
        Device {
            status: DeviceStatus::from_wire(&d.status),
            last_check: parse_timestamp(&d.last_check),
            id: d.id,
            name: d.name,
            location: d.location,
            device_type: d.device_type,
            sensors: d.sensors,
        }
    }
}

// ── Alert ──────────────────────────────────────────────────────────

/// Convert one alert record, resolving the device display name through the
/// caller's lookup. Returns `None` (malformed, to be dropped) when the
/// creation timestamp does not parse.
pub(crate) fn alert_from_record(
    record: AlertRecord,
    device_name: Option<String>,
) -> Option<Alert> {
    let Some(timestamp) = parse_timestamp(&record.timestamp) else {
        warn!(id = %record.id, raw = %record.timestamp, "dropping alert with unparseable timestamp");
        return None;
    };

    let (acknowledged, resolution_notes, resolution_timestamp) = if record.acknowledged {
        // Repair records that arrive acknowledged with missing resolution
        // fields: the notes fall back to a placeholder, the timestamp to
        // the creation instant.
        let notes = record
            .resolution_notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "(no notes recorded)".to_owned());
        let resolved_at = record
            .resolution_timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(timestamp);
        (true, Some(notes), Some(resolved_at))
    } else {
        (false, None, None)
    };

    Some(Alert {
        id: record.id,
        device_id: record.device_id,
        device_name,
        alert_type: record.alert_type,
        severity: clamp_severity(record.severity),
        message: record.message,
        timestamp,
        acknowledged,
        resolution_notes,
        resolution_timestamp,
        sync: SyncState::Synced,
    })
}

// ── Settings ───────────────────────────────────────────────────────

impl From<SettingsPayload> for Settings {
    fn from(p: SettingsPayload) -> Self {
        Settings {
            thresholds: p
                .thresholds
                .into_iter()
                .map(|(metric, band)| {
                    (metric, ThresholdBand { warning: band.warning, critical: band.critical })
                })
                .collect(),
            notifications: crate::model::Notifications {
                email: p.notifications.email,
                sms: p.notifications.sms,
            },
        }
    }
}

impl From<&Settings> for SettingsPayload {
    fn from(s: &Settings) -> Self {
        SettingsPayload {
            thresholds: s
                .thresholds
                .iter()
                .map(|(metric, band)| {
                    (
                        metric.clone(),
                        ThresholdBandPayload { warning: band.warning, critical: band.critical },
                    )
                })
                .collect(),
            notifications: upkeep_api::types::NotificationPrefs {
                email: s.notifications.email,
                sms: s.notifications.sms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn record(id: &str) -> AlertRecord {
        AlertRecord {
            id: id.into(),
            timestamp: "2026-08-20T10:00:00".into(),
            device_id: "ups_001".into(),
            alert_type: "HIGH_TEMPERATURE".into(),
            severity: 8,
            message: "overheat".into(),
            details: serde_json::Value::Null,
            acknowledged: false,
            resolution_notes: None,
            resolution_timestamp: None,
        }
    }

    #[test]
    fn naive_timestamps_are_interpreted_as_utc() {
        let dt = parse_timestamp("2026-08-20T10:00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-08-20T10:00:00+00:00");

        let dt = parse_timestamp("2026-08-20T10:00:00.250").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);

        let dt = parse_timestamp("2026-08-20T10:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-08-20T08:00:00+00:00");

        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn unparseable_timestamp_drops_the_alert() {
        let mut rec = record("a1");
        rec.timestamp = "garbage".into();
        assert!(alert_from_record(rec, None).is_none());
    }

    #[test]
    fn unacknowledged_alert_has_no_resolution_fields() {
        let mut rec = record("a1");
        // Stale resolution data on an open alert is scrubbed.
        rec.resolution_notes = Some("leftover".into());
        rec.resolution_timestamp = Some("2026-08-19T00:00:00".into());

        let alert = alert_from_record(rec, Some("Server Room UPS".into())).unwrap();
        assert!(!alert.acknowledged);
        assert!(alert.resolution_notes.is_none());
        assert!(alert.resolution_timestamp.is_none());
        assert_eq!(alert.display_device(), "Server Room UPS");
    }

    #[test]
    fn acknowledged_alert_with_missing_fields_is_repaired() {
        let mut rec = record("a1");
        rec.acknowledged = true;
        rec.resolution_notes = Some("   ".into());

        let alert = alert_from_record(rec, None).unwrap();
        assert!(alert.acknowledged);
        assert_eq!(alert.resolution_notes.as_deref(), Some("(no notes recorded)"));
        assert_eq!(alert.resolution_timestamp, Some(alert.timestamp));
    }

    #[test]
    fn severity_is_clamped_to_score_range() {
        let mut rec = record("a1");
        rec.severity = 99;
        assert_eq!(alert_from_record(rec, None).unwrap().severity, 10);

        let mut rec = record("a2");
        rec.severity = -3;
        assert_eq!(alert_from_record(rec, None).unwrap().severity, 0);
    }
}
