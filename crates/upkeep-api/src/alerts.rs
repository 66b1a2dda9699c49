// Alert endpoints
//
// Listing with optional server-side filters, and the acknowledge action.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{AcknowledgeRequest, AlertListFilter, AlertRecord};

impl ApiClient {
    /// List alerts, optionally filtered server-side.
    ///
    /// `GET /alerts[?severity=...][&device_id=...]`
    ///
    /// The severity query parameter uses the backend's bands (high/medium/low),
    /// not the client display buckets. Callers that need bucket-exact filtering
    /// should filter locally over the full list.
    pub async fn list_alerts(&self, filter: &AlertListFilter) -> Result<Vec<AlertRecord>, Error> {
        let mut url = self.endpoint_url("alerts")?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(band) = filter.severity {
                query.append_pair("severity", &band.to_string());
            }
            if let Some(ref device_id) = filter.device_id {
                query.append_pair("device_id", device_id);
            }
        }

        debug!("listing alerts");
        self.get_list(url).await
    }

    /// Acknowledge (resolve) an alert.
    ///
    /// `POST /alerts/{id}/acknowledge`
    ///
    /// Returns `Some(record)` when the backend's 2xx response body carries a
    /// full alert object (the authoritative post-acknowledge state), `None`
    /// when the body is a bare confirmation such as `{"message": ...}`.
    pub async fn acknowledge_alert(
        &self,
        id: &str,
        request: &AcknowledgeRequest,
    ) -> Result<Option<AlertRecord>, Error> {
        let url = self.endpoint_url(&format!("alerts/{id}/acknowledge"))?;
        debug!(id, "acknowledging alert");

        let body: serde_json::Value = self.post(url, request).await?;
        Ok(serde_json::from_value(body).ok())
    }
}
