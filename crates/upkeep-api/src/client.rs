// Maintenance backend HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction and generic
// request helpers. The backend speaks plain JSON with no envelope, so the
// helpers only handle status checking and decoding. Endpoint methods
// (devices, alerts, settings) are implemented as inherent methods via
// separate files to keep this module focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::HealthStatus;

/// Raw HTTP client for the maintenance backend's REST API.
///
/// List endpoints decode element by element: a record that fails shape
/// validation is dropped with a log instead of failing the whole batch,
/// so one bad record can never blank a full snapshot.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// The `base_url` should be the backend root (e.g. `http://localhost:8000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, mut base_url: Url) -> Self {
        // Normalize so `Url::join` treats the base as a directory.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path relative to the base.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Derive the push-channel URL for a WebSocket path (`ws/device-status`).
    ///
    /// `http` bases map to `ws`, `https` to `wss`.
    pub fn realtime_url(&self, ws_path: &str) -> Result<Url, Error> {
        let mut url = self.endpoint_url(ws_path)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::ChannelConnect(format!("cannot derive ws scheme for {url}")))?;
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    /// Send a POST request with JSON body and decode the JSON response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_body(resp).await
    }

    /// Send a GET request for a JSON array, decoding leniently per element.
    ///
    /// Elements that fail to decode are dropped with a warning; the rest of
    /// the batch survives.
    pub(crate) async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, Error> {
        let raw: Vec<serde_json::Value> = self.get(url).await?;
        Ok(decode_lenient(raw))
    }

    /// Check the HTTP status and decode the body, keeping the raw text
    /// around for error reporting.
    async fn parse_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let url = resp.url().to_string();

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    // ── Health ───────────────────────────────────────────────────────

    /// Probe backend liveness.
    ///
    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        let url = self.endpoint_url("health")?;
        self.get(url).await
    }
}

/// Decode each element of a JSON array independently, dropping records that
/// fail shape validation.
fn decode_lenient<T: DeserializeOwned>(values: Vec<serde_json::Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "dropping malformed record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::AlertRecord;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_url_joins_against_base() {
        let c = client("http://localhost:8000");
        assert_eq!(
            c.endpoint_url("alerts").unwrap().as_str(),
            "http://localhost:8000/alerts"
        );

        // A base with a path prefix keeps the prefix.
        let c = client("http://gateway.local/maintenance");
        assert_eq!(
            c.endpoint_url("devices").unwrap().as_str(),
            "http://gateway.local/maintenance/devices"
        );
    }

    #[test]
    fn realtime_url_swaps_scheme() {
        let c = client("http://localhost:8000");
        assert_eq!(
            c.realtime_url("ws/device-status").unwrap().as_str(),
            "ws://localhost:8000/ws/device-status"
        );

        let c = client("https://backend.example");
        assert_eq!(
            c.realtime_url("ws/device-status").unwrap().scheme(),
            "wss"
        );
    }

    #[test]
    fn decode_lenient_drops_bad_records_only() {
        let values = vec![
            serde_json::json!({
                "id": "a1",
                "timestamp": "2026-08-20T10:00:00",
                "device_id": "ups_001",
                "alert_type": "HIGH_TEMPERATURE",
                "severity": 8,
                "message": "overheat"
            }),
            serde_json::json!({"id": "a2"}),
            serde_json::json!("not even an object"),
        ];

        let records: Vec<AlertRecord> = decode_lenient(values);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a1");
    }
}
