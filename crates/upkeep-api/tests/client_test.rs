// Integration tests for `ApiClient` using wiremock.
#![allow(clippy::unwrap_used)]

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use upkeep_api::types::{AcknowledgeRequest, AlertListFilter, SeverityBand, SettingsPayload};
use upkeep_api::{ApiClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), url);
    (server, client)
}

fn alert_json(id: &str, severity: i64) -> serde_json::Value {
    json!({
        "id": id,
        "timestamp": "2026-08-20T10:00:00",
        "device_id": "ups_001",
        "alert_type": "HIGH_TEMPERATURE",
        "severity": severity,
        "message": "UPS temperature approaching critical threshold",
        "acknowledged": false
    })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "id": "ups_001",
            "name": "Server Room UPS",
            "location": "Room 101",
            "type": "UPS",
            "status": "operational",
            "last_check": "2026-08-20T10:00:00",
            "sensors": {"temperature": 45.2, "battery_level": 92.0}
        },
        {
            "id": "hvac_001",
            "name": "Main HVAC",
            "location": "Roof",
            "type": "HVAC",
            "status": "warning",
            "last_check": "2026-08-20T10:01:00",
            "sensors": {}
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "ups_001");
    assert_eq!(devices[0].sensors["temperature"], 45.2);
    assert_eq!(devices[1].status, "warning");
}

#[tokio::test]
async fn test_list_alerts_with_filters() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alerts"))
        .and(query_param("severity", "high"))
        .and(query_param("device_id", "ups_001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([alert_json("a1", 8)])))
        .mount(&server)
        .await;

    let filter = AlertListFilter {
        severity: Some(SeverityBand::High),
        device_id: Some("ups_001".into()),
    };
    let alerts = client.list_alerts(&filter).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, 8);
}

#[tokio::test]
async fn test_list_alerts_drops_malformed_records() {
    let (server, client) = setup().await;

    // Second record is missing `severity` and `message`, third is not
    // even an object. Both are dropped, the rest survive.
    let body = json!([
        alert_json("a1", 8),
        {"id": "a2", "timestamp": "2026-08-20T10:00:00", "device_id": "ups_001"},
        42,
        alert_json("a3", 2),
    ]);

    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let alerts = client.list_alerts(&AlertListFilter::default()).await.unwrap();
    let ids: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a3"]);
}

#[tokio::test]
async fn test_acknowledge_alert_with_confirmation_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/alerts/a1/acknowledge"))
        .and(body_partial_json(json!({
            "acknowledged": true,
            "notes": "replaced battery"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Alert acknowledged"})),
        )
        .mount(&server)
        .await;

    let request = AcknowledgeRequest {
        acknowledged: true,
        notes: "replaced battery".into(),
        resolution_timestamp: "2026-08-20T11:00:00Z".into(),
    };
    let echoed = client.acknowledge_alert("a1", &request).await.unwrap();

    // A bare confirmation body yields no authoritative record.
    assert!(echoed.is_none());
}

#[tokio::test]
async fn test_acknowledge_alert_with_authoritative_body() {
    let (server, client) = setup().await;

    let mut resolved = alert_json("a1", 8);
    resolved["acknowledged"] = json!(true);
    resolved["resolution_notes"] = json!("replaced battery");
    resolved["resolution_timestamp"] = json!("2026-08-20T11:00:00");

    Mock::given(method("POST"))
        .and(path("/alerts/a1/acknowledge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&resolved))
        .mount(&server)
        .await;

    let request = AcknowledgeRequest {
        acknowledged: true,
        notes: "replaced battery".into(),
        resolution_timestamp: "2026-08-20T11:00:00Z".into(),
    };
    let echoed = client.acknowledge_alert("a1", &request).await.unwrap().unwrap();
    assert!(echoed.acknowledged);
    assert_eq!(echoed.resolution_notes.as_deref(), Some("replaced battery"));
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (server, client) = setup().await;

    let body = json!({
        "thresholds": {
            "temperature": {"warning": 35.0, "critical": 45.0},
            "battery_level": {"warning": 40.0, "critical": 20.0}
        },
        "notifications": {"email": true, "sms": false}
    });

    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/settings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Settings updated"})),
        )
        .mount(&server)
        .await;

    let settings: SettingsPayload = client.get_settings().await.unwrap();
    assert_eq!(settings.thresholds["temperature"].critical, 45.0);
    assert!(settings.notifications.email);

    client.update_settings(&settings).await.unwrap();
}

#[tokio::test]
async fn test_health_probe() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": "2026-08-20T10:00:00",
            "device_count": 12,
            "alert_count": 3
        })))
        .mount(&server)
        .await;

    let health = client.health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.device_count, Some(12));
}

// ── Error cases ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_not_found_maps_to_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&server)
        .await;

    let err = client.get_device("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client
        .list_alerts(&AlertListFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_non_array_alert_body_is_a_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "oops"})))
        .mount(&server)
        .await;

    let err = client
        .list_alerts(&AlertListFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }));
}
